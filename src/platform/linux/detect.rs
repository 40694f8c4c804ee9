//! Display server detection for Linux.
//!
//! Determines whether the current session is Wayland or X11-only by inspecting
//! the environment variables set by the session manager, then combines that
//! with the configured preference to pick an injection backend.
//!
//! Note: `DISPLAY` being set alongside `WAYLAND_DISPLAY` means XWayland is
//! running. XTest events injected there only reach X11 clients, so Wayland
//! sessions default to the portal.

use std::env;

use crate::config::InjectorBackend;
use crate::platform::PlatformError;

/// The active Linux display server protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayServer {
    /// `WAYLAND_DISPLAY` is set (with or without `DISPLAY`).
    Wayland,
    /// Only `DISPLAY` is set.
    X11,
}

/// Detects the active display server from environment variables.
///
/// Returns `None` outside of any graphical session.
pub fn detect_display_server() -> Option<DisplayServer> {
    let is_set = |name: &str| env::var_os(name).is_some_and(|v| !v.is_empty());
    classify_display(is_set("WAYLAND_DISPLAY"), is_set("DISPLAY"))
}

/// Classifies the display server from boolean presence flags.
///
/// Split out so the logic can be tested without touching the process environment.
fn classify_display(has_wayland: bool, has_display: bool) -> Option<DisplayServer> {
    match (has_wayland, has_display) {
        (true, _) => Some(DisplayServer::Wayland),
        (false, true) => Some(DisplayServer::X11),
        (false, false) => None,
    }
}

/// Resolves the configured backend against what the session provides.
///
/// A forced backend is honoured even if detection disagrees (e.g. `x11` under
/// XWayland to drive X11 clients); `auto` requires a detected session.
pub fn select_display_server(
    preference: InjectorBackend,
    detected: Option<DisplayServer>,
) -> Result<DisplayServer, PlatformError> {
    match (preference, detected) {
        (InjectorBackend::Wayland, _) => Ok(DisplayServer::Wayland),
        (InjectorBackend::X11, _) => Ok(DisplayServer::X11),
        (InjectorBackend::Auto, Some(server)) => Ok(server),
        (InjectorBackend::Auto, None) => Err(PlatformError::Unavailable(
            "No display server detected (neither WAYLAND_DISPLAY nor DISPLAY is set).".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wayland_only_detects_wayland() {
        assert_eq!(classify_display(true, false), Some(DisplayServer::Wayland));
    }

    #[test]
    fn xwayland_still_detects_wayland() {
        assert_eq!(classify_display(true, true), Some(DisplayServer::Wayland));
    }

    #[test]
    fn display_only_detects_x11() {
        assert_eq!(classify_display(false, true), Some(DisplayServer::X11));
    }

    #[test]
    fn no_vars_returns_none() {
        assert_eq!(classify_display(false, false), None);
    }

    #[test]
    fn auto_follows_detection() {
        assert_eq!(
            select_display_server(InjectorBackend::Auto, Some(DisplayServer::X11)).unwrap(),
            DisplayServer::X11
        );
        assert_eq!(
            select_display_server(InjectorBackend::Auto, Some(DisplayServer::Wayland)).unwrap(),
            DisplayServer::Wayland
        );
    }

    #[test]
    fn forced_backend_overrides_detection() {
        assert_eq!(
            select_display_server(InjectorBackend::X11, Some(DisplayServer::Wayland)).unwrap(),
            DisplayServer::X11
        );
        assert_eq!(
            select_display_server(InjectorBackend::Wayland, None).unwrap(),
            DisplayServer::Wayland
        );
    }

    #[test]
    fn auto_without_session_is_unavailable() {
        assert!(matches!(
            select_display_server(InjectorBackend::Auto, None),
            Err(PlatformError::Unavailable(_))
        ));
    }
}
