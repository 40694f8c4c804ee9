//! macOS platform backend.
//!
//! Hook: listen-only CGEventTap via `MacOSHook`.
//! Injection: CGEventPost at the HID tap via `MacOSInjector`.
//!
//! Both require Accessibility permission. `MacOSHook::install()` calls
//! `AXIsProcessTrusted()` and returns `PlatformError::PermissionDenied` if
//! permission has not been granted. Guide the user to:
//!   System Settings > Privacy & Security > Accessibility

mod hook;
mod injector;
mod keycodes;

use hook::MacOSHook;
use injector::MacOSInjector;

use crate::platform::{InputHook, InputInjector, PlatformError};

/// Returns the CGEventTap-based keyboard monitor.
///
/// The permission check happens in `install()` so that construction always succeeds.
pub fn create_input_hook() -> Result<Box<dyn InputHook>, PlatformError> {
    Ok(Box::new(MacOSHook::new()))
}

/// Returns the CGEventPost-based injector.
pub fn create_input_injector() -> Result<Box<dyn InputInjector>, PlatformError> {
    Ok(Box::new(MacOSInjector::new()))
}
