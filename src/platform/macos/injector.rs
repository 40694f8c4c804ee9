//! macOS input injection via CGEventPost.
//!
//! `MacOSInjector` implements `InputInjector`. `CGEventPost` delivers the event
//! before returning, so no background thread is needed. The recorded key code
//! is replayed unchanged and the recorded modifier flags are stamped onto the
//! synthesized event.

use std::ffi::c_void;
use std::time::Instant;

use super::keycodes::flags_from_modifiers;
use crate::platform::{InputEvent, InputInjector, KeyState, PlatformError};

/// kCGSessionEventTap: post downstream of the HID-level monitor tap.
const CG_SESSION_EVENT_TAP: u32 = 1;

/// kCGEventSourceStateHIDSystemState
const CG_EVENT_SOURCE_STATE_HID_SYSTEM_STATE: i32 = 1;

type CGEventRef = *mut c_void;
type CGEventSourceRef = *mut c_void;

#[link(name = "ApplicationServices", kind = "framework")]
extern "C" {
    fn CGEventSourceCreate(state_id: i32) -> CGEventSourceRef;
    fn CGEventCreateKeyboardEvent(
        source: CGEventSourceRef,
        virtual_key: u16,
        key_down: bool,
    ) -> CGEventRef;
    fn CGEventSetFlags(event: CGEventRef, flags: u64);
    fn CGEventPost(tap_location: u32, event: CGEventRef);
}

#[link(name = "CoreFoundation", kind = "framework")]
extern "C" {
    fn CFRelease(cf: *const c_void);
}

/// Stateless: each `inject()` call creates a `CGEvent`, posts it, and
/// releases it.
pub struct MacOSInjector;

impl MacOSInjector {
    pub fn new() -> Self {
        MacOSInjector
    }
}

impl InputInjector for MacOSInjector {
    fn inject(&self, event: &InputEvent) -> Result<(), PlatformError> {
        let vkcode = u16::try_from(event.native.code).map_err(|_| {
            PlatformError::Other(format!("key code {} out of range", event.native.code))
        })?;
        let key_down = event.state == KeyState::Down;
        let flags = flags_from_modifiers(event.modifiers);
        let started = Instant::now();

        unsafe {
            let source = CGEventSourceCreate(CG_EVENT_SOURCE_STATE_HID_SYSTEM_STATE);
            if source.is_null() {
                return Err(PlatformError::Other(
                    "CGEventSourceCreate returned null".into(),
                ));
            }

            let cg_event = CGEventCreateKeyboardEvent(source, vkcode, key_down);
            if cg_event.is_null() {
                CFRelease(source.cast::<c_void>());
                return Err(PlatformError::Other(
                    "CGEventCreateKeyboardEvent returned null".into(),
                ));
            }

            CGEventSetFlags(cg_event, flags);
            CGEventPost(CG_SESSION_EVENT_TAP, cg_event);
            CFRelease(cg_event.cast::<c_void>());
            CFRelease(source.cast::<c_void>());
        }

        log::debug!(
            "executor: injected {event} in {:.2}ms",
            started.elapsed().as_secs_f64() * 1000.0
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::NativeKey;

    #[test]
    fn oversized_code_is_rejected_before_any_os_call() {
        let injector = MacOSInjector::new();
        let event = InputEvent::new(KeyState::Down, NativeKey::new(0x1_0000), None);
        assert!(matches!(
            injector.inject(&event),
            Err(PlatformError::Other(_))
        ));
    }
}
