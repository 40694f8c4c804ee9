//! Windows input injection via SendInput.
//!
//! `WindowsInjector` implements `InputInjector`. `SendInput` queues the event
//! before returning and serializes it with other input, so calls are delivered
//! in order without a background thread. The recorded virtual key, scan code
//! and extended flag are replayed unchanged.

use windows_sys::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYEVENTF_EXTENDEDKEY, KEYEVENTF_KEYUP,
};

use crate::platform::{InputEvent, InputInjector, KeyState, NativeKey, PlatformError};

/// Stateless: each `inject()` call builds one `INPUT` record.
pub struct WindowsInjector;

impl WindowsInjector {
    pub fn new() -> Self {
        WindowsInjector
    }
}

impl InputInjector for WindowsInjector {
    fn inject(&self, event: &InputEvent) -> Result<(), PlatformError> {
        let ki = keyboard_input(event.native, event.state)?;
        let input = INPUT {
            r#type: INPUT_KEYBOARD,
            Anonymous: INPUT_0 { ki },
        };

        let sent = unsafe { SendInput(1, &input, std::mem::size_of::<INPUT>() as i32) };
        if sent == 0 {
            // Typically UIPI: the foreground window runs at a higher integrity level.
            return Err(PlatformError::Other("SendInput returned 0".into()));
        }

        log::debug!("executor: injected {event}");
        Ok(())
    }
}

fn keyboard_input(native: NativeKey, state: KeyState) -> Result<KEYBDINPUT, PlatformError> {
    let vk = u16::try_from(native.code)
        .map_err(|_| PlatformError::Other(format!("vk code {} out of range", native.code)))?;
    let scan = u16::try_from(native.scan)
        .map_err(|_| PlatformError::Other(format!("scan code {} out of range", native.scan)))?;

    let mut flags = 0;
    if native.extended {
        flags |= KEYEVENTF_EXTENDEDKEY;
    }
    if state == KeyState::Up {
        flags |= KEYEVENTF_KEYUP;
    }

    Ok(KEYBDINPUT {
        wVk: vk,
        wScan: scan,
        dwFlags: flags,
        time: 0,
        dwExtraInfo: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_key_down_has_no_flags() {
        let ki = keyboard_input(
            NativeKey {
                code: 0x41,
                scan: 0x1E,
                extended: false,
            },
            KeyState::Down,
        )
        .unwrap();
        assert_eq!(ki.wVk, 0x41);
        assert_eq!(ki.wScan, 0x1E);
        assert_eq!(ki.dwFlags, 0);
    }

    #[test]
    fn extended_key_up_sets_both_flags() {
        let ki = keyboard_input(
            NativeKey {
                code: 0x26,
                scan: 0x48,
                extended: true,
            },
            KeyState::Up,
        )
        .unwrap();
        assert_eq!(ki.dwFlags, KEYEVENTF_EXTENDEDKEY | KEYEVENTF_KEYUP);
    }

    #[test]
    fn oversized_code_is_rejected() {
        assert!(keyboard_input(NativeKey::new(0x1_0000), KeyState::Down).is_err());
    }
}
