//! macOS keyboard monitor via a listen-only CGEventTap and CFRunLoop.
//!
//! `MacOSHook` implements `InputHook`. `install()` creates the event tap on the
//! calling thread so that permission errors surface immediately, then spawns a
//! background thread that adds the tap to a CFRunLoop and drives it.
//!
//! The tap is created with `kCGEventTapOptionListenOnly`: the system delivers
//! copies and the callback cannot suppress or alter the original event.
//!
//! Modifier keys arrive as `FlagsChanged` events and are recorded as presses
//! and releases like any other key. Caps Lock and Fn are not recorded.
//!
//! Memory ownership:
//!   The background thread owns the tap port (CFMachPortRef), the run loop
//!   source, and the callback state (TapState). All three are released after
//!   `CFRunLoopRun` returns (i.e. after `remove()` completes).

use std::ffi::c_void;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use super::keycodes::{modifier_transition, modifiers_from_flags, vkcode_to_keycode};
use crate::platform::{
    check_active, HookCallback, HookHandle, InputEvent, InputHook, KeyState, NativeKey,
    PlatformError, WindowContext,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const CG_EVENT_KEY_DOWN: u32 = 10;
const CG_EVENT_KEY_UP: u32 = 11;
const CG_EVENT_FLAGS_CHANGED: u32 = 12;

/// The system disabled the tap (callback too slow, or secure input).
const CG_EVENT_TAP_DISABLED_BY_TIMEOUT: u32 = 0xFFFF_FFFE;
const CG_EVENT_TAP_DISABLED_BY_USER_INPUT: u32 = 0xFFFF_FFFF;

/// Event mask: KeyDown | KeyUp | FlagsChanged.
const EVENT_MASK: u64 = (1u64 << CG_EVENT_KEY_DOWN)
    | (1u64 << CG_EVENT_KEY_UP)
    | (1u64 << CG_EVENT_FLAGS_CHANGED);

/// kCGKeyboardEventKeycode.
const CG_KEYBOARD_EVENT_KEYCODE: u32 = 9;

/// kCGEventTargetUnixProcessID.
const CG_EVENT_TARGET_UNIX_PROCESS_ID: u32 = 40;

/// kCGHIDEventTap: observe at the HID level, upstream of replayed events.
const CG_HID_EVENT_TAP: u32 = 0;

/// kCGTailAppendEventTap: a passive observer goes after active taps.
const CG_TAIL_APPEND_EVENT_TAP: u32 = 1;

/// kCGEventTapOptionListenOnly.
const CG_EVENT_TAP_OPTION_LISTEN_ONLY: u32 = 1;

// ---------------------------------------------------------------------------
// Raw FFI types and declarations
// ---------------------------------------------------------------------------

type CFMachPortRef = *mut c_void;
type CFRunLoopRef = *mut c_void;
type CFRunLoopSourceRef = *mut c_void;
type CFStringRef = *const c_void;
type CGEventRef = *mut c_void;
type CGEventTapProxy = *mut c_void;

type CGEventTapCallBack = unsafe extern "C" fn(
    proxy: CGEventTapProxy,
    event_type: u32,
    event: CGEventRef,
    user_info: *mut c_void,
) -> CGEventRef;

#[link(name = "ApplicationServices", kind = "framework")]
extern "C" {
    fn AXIsProcessTrusted() -> bool;

    fn CGEventTapCreate(
        tap: u32,
        place: u32,
        options: u32,
        events_of_interest: u64,
        callback: CGEventTapCallBack,
        user_info: *mut c_void,
    ) -> CFMachPortRef;

    fn CGEventTapEnable(tap: CFMachPortRef, enable: bool);

    fn CGEventGetIntegerValueField(event: CGEventRef, field: u32) -> i64;

    fn CGEventGetFlags(event: CGEventRef) -> u64;
}

#[link(name = "CoreFoundation", kind = "framework")]
extern "C" {
    fn CFMachPortCreateRunLoopSource(
        allocator: *mut c_void,
        port: CFMachPortRef,
        order: isize,
    ) -> CFRunLoopSourceRef;

    fn CFRunLoopGetCurrent() -> CFRunLoopRef;

    fn CFRunLoopAddSource(rl: CFRunLoopRef, source: CFRunLoopSourceRef, mode: CFStringRef);

    fn CFRunLoopRun();

    fn CFRunLoopStop(rl: CFRunLoopRef);

    fn CFRelease(cf: *const c_void);

    static kCFRunLoopDefaultMode: CFStringRef;
}

// ---------------------------------------------------------------------------
// Thread-safety wrappers for raw pointers
// ---------------------------------------------------------------------------

/// CFRunLoopStop may be called from any thread.
struct SendableRunLoop(CFRunLoopRef);
unsafe impl Send for SendableRunLoop {}

/// Handed to the run loop thread, which becomes the sole owner.
struct SendableTap {
    port: CFMachPortRef,
    state: *mut TapState,
}
unsafe impl Send for SendableTap {}

// ---------------------------------------------------------------------------
// Callback state
// ---------------------------------------------------------------------------

/// Passed to the C callback via `user_info`.
///
/// Kept alive (via `Box::into_raw`) for the lifetime of the tap and reclaimed
/// by the run loop thread after `CFRunLoopRun` returns.
struct TapState {
    callback: HookCallback,
    /// Needed to re-enable the tap after the system disables it.
    port: CFMachPortRef,
}

// ---------------------------------------------------------------------------
// Public struct
// ---------------------------------------------------------------------------

/// macOS keyboard monitor using a listen-only CGEventTap.
pub struct MacOSHook {
    active: Option<HookHandle>,
    run_loop: Option<SendableRunLoop>,
    thread: Option<JoinHandle<()>>,
}

impl MacOSHook {
    pub fn new() -> Self {
        Self {
            active: None,
            run_loop: None,
            thread: None,
        }
    }

    fn shutdown(&mut self) {
        if let Some(SendableRunLoop(rl)) = self.run_loop.take() {
            unsafe { CFRunLoopStop(rl) };
        }
        if let Some(t) = self.thread.take() {
            let _ = t.join();
        }
    }
}

impl InputHook for MacOSHook {
    fn install(&mut self, callback: HookCallback) -> Result<HookHandle, PlatformError> {
        if self.active.is_some() {
            return Err(PlatformError::AlreadyInstalled);
        }

        if !unsafe { AXIsProcessTrusted() } {
            return Err(PlatformError::PermissionDenied(
                "Accessibility permission required. \
                 Grant it in System Settings > Privacy & Security > Accessibility."
                    .into(),
            ));
        }

        let state_ptr = Box::into_raw(Box::new(TapState {
            callback,
            port: std::ptr::null_mut(),
        }));

        let tap_port = unsafe {
            CGEventTapCreate(
                CG_HID_EVENT_TAP,
                CG_TAIL_APPEND_EVENT_TAP,
                CG_EVENT_TAP_OPTION_LISTEN_ONLY,
                EVENT_MASK,
                event_tap_callback,
                state_ptr.cast::<c_void>(),
            )
        };

        if tap_port.is_null() {
            drop(unsafe { Box::from_raw(state_ptr) });
            return Err(PlatformError::PermissionDenied(
                "CGEventTapCreate returned null. \
                 Verify Accessibility permission is active."
                    .into(),
            ));
        }

        // The tap is not enabled yet, so the callback cannot be reading this.
        unsafe { (*state_ptr).port = tap_port };

        let tap = SendableTap {
            port: tap_port,
            state: state_ptr,
        };
        let (rl_tx, rl_rx) = mpsc::channel::<SendableRunLoop>();

        let thread = thread::spawn(move || {
            let SendableTap { port, state } = tap;
            unsafe {
                let source = CFMachPortCreateRunLoopSource(std::ptr::null_mut(), port, 0);
                let run_loop = CFRunLoopGetCurrent();
                CFRunLoopAddSource(run_loop, source, kCFRunLoopDefaultMode);
                CFRelease(source.cast::<c_void>());

                CGEventTapEnable(port, true);
                log::info!("capture: CGEventTap monitor active");

                let _ = rl_tx.send(SendableRunLoop(run_loop));

                // Blocks until remove() calls CFRunLoopStop.
                CFRunLoopRun();

                log::debug!("capture: CFRunLoop exited");

                CGEventTapEnable(port, false);
                CFRelease(port.cast::<c_void>());
                drop(Box::from_raw(state));
            }
        });

        match rl_rx.recv() {
            Ok(rl) => {
                let handle = HookHandle::next();
                self.active = Some(handle);
                self.run_loop = Some(rl);
                self.thread = Some(thread);
                Ok(handle)
            }
            Err(_) => {
                let _ = thread.join();
                Err(PlatformError::Other(
                    "background thread exited before run loop was ready".into(),
                ))
            }
        }
    }

    fn remove(&mut self, handle: HookHandle) -> Result<(), PlatformError> {
        check_active(self.active, handle)?;
        self.shutdown();
        self.active = None;
        log::info!("capture: CGEventTap monitor removed");
        Ok(())
    }
}

impl Drop for MacOSHook {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ---------------------------------------------------------------------------
// C callback
// ---------------------------------------------------------------------------

/// Called on the run loop thread for each keyboard event. Listen-only taps
/// ignore the return value; the event is returned unchanged regardless.
unsafe extern "C" fn event_tap_callback(
    _proxy: CGEventTapProxy,
    event_type: u32,
    event: CGEventRef,
    user_info: *mut c_void,
) -> CGEventRef {
    let state = &*(user_info as *const TapState);

    match event_type {
        CG_EVENT_KEY_DOWN | CG_EVENT_KEY_UP | CG_EVENT_FLAGS_CHANGED => {}
        CG_EVENT_TAP_DISABLED_BY_TIMEOUT | CG_EVENT_TAP_DISABLED_BY_USER_INPUT => {
            log::warn!("capture: event tap disabled by the system, re-enabling");
            CGEventTapEnable(state.port, true);
            return event;
        }
        _ => return event,
    }

    let vkcode = CGEventGetIntegerValueField(event, CG_KEYBOARD_EVENT_KEYCODE) as u16;
    let flags = CGEventGetFlags(event);

    let key_state = match event_type {
        CG_EVENT_KEY_DOWN => KeyState::Down,
        CG_EVENT_KEY_UP => KeyState::Up,
        _ => match vkcode_to_keycode(vkcode).and_then(|key| modifier_transition(key, flags)) {
            Some(key_state) => key_state,
            None => return event,
        },
    };

    let pid = CGEventGetIntegerValueField(event, CG_EVENT_TARGET_UNIX_PROCESS_ID);
    let window = WindowContext {
        id: u64::try_from(pid).ok().filter(|&pid| pid != 0),
    };

    let input = InputEvent::new(
        key_state,
        NativeKey::new(u32::from(vkcode)),
        vkcode_to_keycode(vkcode),
    )
    .with_modifiers(modifiers_from_flags(flags))
    .with_window(window);

    (state.callback)(input);
    event
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_produces_idle_state() {
        let hook = MacOSHook::new();
        assert!(hook.active.is_none());
        assert!(hook.run_loop.is_none());
        assert!(hook.thread.is_none());
    }

    #[test]
    fn remove_without_install_is_rejected() {
        let mut hook = MacOSHook::new();
        assert!(matches!(
            hook.remove(HookHandle::next()),
            Err(PlatformError::UnknownHook(_))
        ));
    }

    #[test]
    fn event_mask_covers_keys_and_modifiers() {
        assert_eq!(EVENT_MASK, (1 << 10) | (1 << 11) | (1 << 12));
    }
}
