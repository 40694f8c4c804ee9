//! X11 input injection via the XTest extension.
//!
//! `LinuxX11Injector` implements `InputInjector`. XTest fake input is
//! processed by the server exactly like device input, so clients cannot tell
//! replayed keys from typed ones. Requests are flushed per event; the server
//! handles them in order.
//!
//! X keycodes are evdev codes offset by 8 (the xkb evdev keymap convention).

use x11rb::connection::{Connection, RequestConnection};
use x11rb::protocol::xproto::{Window, KEY_PRESS_EVENT, KEY_RELEASE_EVENT};
use x11rb::protocol::xtest::{self, ConnectionExt as _};
use x11rb::rust_connection::RustConnection;

use crate::platform::{InputEvent, InputInjector, KeyState, PlatformError};

const EVDEV_TO_X11_OFFSET: u32 = 8;

/// Injects keyboard events through XTest on the default display.
pub struct LinuxX11Injector {
    conn: RustConnection,
    root: Window,
}

impl LinuxX11Injector {
    /// Connects to `$DISPLAY` and checks that the server offers XTest.
    pub fn new() -> Result<Self, PlatformError> {
        let (conn, screen_num) = x11rb::connect(None)
            .map_err(|e| PlatformError::Unavailable(format!("cannot connect to X server: {e}")))?;

        let has_xtest = conn
            .extension_information(xtest::X11_EXTENSION_NAME)
            .map_err(|e| PlatformError::Other(format!("X11 extension query failed: {e}")))?
            .is_some();
        if !has_xtest {
            return Err(PlatformError::Unavailable(
                "X server does not support the XTEST extension".into(),
            ));
        }

        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .map(|screen| screen.root)
            .ok_or_else(|| PlatformError::Other(format!("X screen {screen_num} not found")))?;

        log::info!("executor: XTest injector ready on screen {screen_num}");
        Ok(Self { conn, root })
    }
}

impl InputInjector for LinuxX11Injector {
    fn inject(&self, event: &InputEvent) -> Result<(), PlatformError> {
        let keycode = x11_keycode(event.native.code)?;
        let event_type = match event.state {
            KeyState::Down => KEY_PRESS_EVENT,
            KeyState::Up => KEY_RELEASE_EVENT,
        };

        self.conn
            .xtest_fake_input(event_type, keycode, x11rb::CURRENT_TIME, self.root, 0, 0, 0)
            .map_err(|e| PlatformError::Other(format!("XTestFakeInput failed: {e}")))?
            .ignore_error();
        self.conn
            .flush()
            .map_err(|e| PlatformError::Other(format!("X11 flush failed: {e}")))?;

        log::debug!("executor: injected X keycode {keycode} {:?}", event.state);
        Ok(())
    }
}

/// Maps an evdev code to an X keycode; X keycodes are limited to 8..=255.
fn x11_keycode(evdev_code: u32) -> Result<u8, PlatformError> {
    evdev_code
        .checked_add(EVDEV_TO_X11_OFFSET)
        .and_then(|code| u8::try_from(code).ok())
        .ok_or_else(|| {
            PlatformError::Other(format!("evdev code {evdev_code} has no X11 keycode"))
        })
}
