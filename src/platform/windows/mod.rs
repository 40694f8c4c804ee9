//! Windows platform backend: WH_KEYBOARD_LL monitor, SendInput injection.

mod hook;
mod injector;
mod keycodes;

use hook::WindowsHook;
use injector::WindowsInjector;

use crate::platform::{InputHook, InputInjector, PlatformError};

/// Returns a `WindowsHook` backed by `WH_KEYBOARD_LL`.
pub fn create_input_hook() -> Result<Box<dyn InputHook>, PlatformError> {
    Ok(Box::new(WindowsHook::new()))
}

/// Returns a `WindowsInjector` backed by `SendInput`.
pub fn create_input_injector() -> Result<Box<dyn InputInjector>, PlatformError> {
    Ok(Box::new(WindowsInjector::new()))
}
