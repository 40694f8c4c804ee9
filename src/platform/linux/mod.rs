//! Linux platform backend.
//!
//! Hook: passive evdev reader (/dev/input/event*) via `LinuxEvdevHook`. The
//! devices are never grabbed, so every event still reaches the compositor.
//! Injection: xdg-desktop-portal RemoteDesktop via `LinuxWaylandInjector`, or
//! the XTest extension via `LinuxX11Injector`.
//!
//! Injector selection (capture has no compositor dependency; injection does):
//! 1. `injector = "wayland"` / `"x11"` in the config forces a backend
//! 2. `WAYLAND_DISPLAY` set  → RemoteDesktop portal
//! 3. `DISPLAY` only (X11)   → XTest
//! 4. Neither variable set   → no display, clear error

mod detect;
mod evdev;
mod keycodes;
mod wayland;
mod x11;

use self::evdev::LinuxEvdevHook;
use self::wayland::LinuxWaylandInjector;
use self::x11::LinuxX11Injector;

use crate::config::LinuxConfig;
use crate::platform::{InputHook, InputInjector, PlatformError};
use detect::{detect_display_server, select_display_server, DisplayServer};

// ---------------------------------------------------------------------------
// Factory: input hook
// ---------------------------------------------------------------------------

/// Returns the evdev-based keyboard monitor.
///
/// Requires the process user to be in the `input` group; the check happens in
/// `install()`, so construction always succeeds.
pub fn create_input_hook(config: &LinuxConfig) -> Result<Box<dyn InputHook>, PlatformError> {
    Ok(Box::new(LinuxEvdevHook::new(config.record_autorepeat)))
}

// ---------------------------------------------------------------------------
// Factory: input injector
// ---------------------------------------------------------------------------

/// Returns the injector for the configured or detected display server.
pub fn create_input_injector(
    config: &LinuxConfig,
) -> Result<Box<dyn InputInjector>, PlatformError> {
    match select_display_server(config.injector, detect_display_server())? {
        DisplayServer::Wayland => {
            log::info!("executor: using RemoteDesktop portal");
            LinuxWaylandInjector::new().map(|i| Box::new(i) as Box<dyn InputInjector>)
        }
        DisplayServer::X11 => {
            log::info!("executor: using XTest");
            LinuxX11Injector::new().map(|i| Box::new(i) as Box<dyn InputInjector>)
        }
    }
}
