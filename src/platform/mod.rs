//! Platform abstraction layer.
//!
//! Defines the `InputHook` and `InputInjector` traits and the platform-neutral
//! `InputEvent` model that flows between them and the recorder.
//! Platform-specific implementations live in child modules; only the module
//! for the target OS is compiled.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use thiserror::Error;

use crate::config::Config;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "windows")]
mod windows;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors reported by platform backends.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The facility does not exist in this session (no devices, no display, ...).
    #[error("unavailable: {0}")]
    Unavailable(String),
    /// The OS refused access (missing group membership or privacy permission).
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// The backend already has an active hook.
    #[error("an input hook is already installed")]
    AlreadyInstalled,
    /// `remove()` was given a handle this backend did not hand out.
    #[error("no installed input hook matches {0}")]
    UnknownHook(HookHandle),
    #[error("{0}")]
    Other(String),
}

// ---------------------------------------------------------------------------
// Key model
// ---------------------------------------------------------------------------

/// Canonical, layout-independent key name.
///
/// Left and right modifier variants are unified (`Ctrl`, `Shift`, `Alt`, `Meta`).
#[rustfmt::skip]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,
    Key0, Key1, Key2, Key3, Key4, Key5, Key6, Key7, Key8, Key9,
    F1, F2, F3, F4, F5, F6, F7, F8, F9, F10, F11, F12,
    F13, F14, F15, F16, F17, F18, F19, F20, F21, F22, F23, F24,
    Ctrl, Shift, Alt, Meta,
    Space, Enter, Tab, Escape, Backspace, Delete, Insert,
    Home, End, PageUp, PageDown, Up, Down, Left, Right,
    CapsLock, NumLock, ScrollLock, PrintScreen, Pause,
    Numpad0, Numpad1, Numpad2, Numpad3, Numpad4,
    Numpad5, Numpad6, Numpad7, Numpad8, Numpad9,
    NumpadAdd, NumpadSub, NumpadMul, NumpadDiv, NumpadEnter,
    Backtick, Minus, Equal, LeftBracket, RightBracket, Backslash,
    Semicolon, Apostrophe, Comma, Period, Slash,
}

impl KeyCode {
    pub fn is_modifier(self) -> bool {
        matches!(
            self,
            KeyCode::Ctrl | KeyCode::Shift | KeyCode::Alt | KeyCode::Meta
        )
    }
}

/// Press or release. Auto-repeat is reported as a further `Down`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyState {
    Down,
    Up,
}

/// The platform's own identification of a key, replayed verbatim on injection.
///
/// - Linux: `code` is the evdev key code; `scan` and `extended` are unused.
/// - Windows: `code` is the virtual key, `scan` the hardware scan code,
///   `extended` mirrors `LLKHF_EXTENDED`.
/// - macOS: `code` is the `CGKeyCode`; `scan` and `extended` are unused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NativeKey {
    pub code: u32,
    pub scan: u32,
    pub extended: bool,
}

impl NativeKey {
    pub fn new(code: u32) -> Self {
        Self {
            code,
            ..Self::default()
        }
    }
}

/// Modifier keys held when the event was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn is_empty(&self) -> bool {
        !(self.ctrl || self.shift || self.alt || self.meta)
    }

    /// Updates the held set from a modifier key transition. Non-modifier keys
    /// are ignored.
    pub fn apply(&mut self, key: KeyCode, state: KeyState) {
        let held = state == KeyState::Down;
        match key {
            KeyCode::Ctrl => self.ctrl = held,
            KeyCode::Shift => self.shift = held,
            KeyCode::Alt => self.alt = held,
            KeyCode::Meta => self.meta = held,
            _ => {}
        }
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (self.ctrl, "ctrl"),
            (self.shift, "shift"),
            (self.alt, "alt"),
            (self.meta, "meta"),
        ];
        let mut first = true;
        for (_, name) in names.iter().filter(|(held, _)| *held) {
            if !first {
                f.write_str("+")?;
            }
            f.write_str(name)?;
            first = false;
        }
        Ok(())
    }
}

/// Best-effort identity of the event's target.
///
/// Windows: foreground `HWND`. macOS: target process id. Linux (evdev): unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WindowContext {
    pub id: Option<u64>,
}

/// A single captured key occurrence, owned independently of the platform event
/// it was copied from.
#[derive(Debug, Clone, PartialEq)]
pub struct InputEvent {
    pub state: KeyState,
    pub native: NativeKey,
    /// `None` when the native code has no canonical name; the event is still
    /// recorded and replayed through `native`.
    pub key: Option<KeyCode>,
    pub modifiers: Modifiers,
    pub window: WindowContext,
    pub timestamp: Instant,
}

impl InputEvent {
    /// Creates an event stamped with the current instant and no modifiers.
    pub fn new(state: KeyState, native: NativeKey, key: Option<KeyCode>) -> Self {
        Self {
            state,
            native,
            key,
            modifiers: Modifiers::default(),
            window: WindowContext::default(),
            timestamp: Instant::now(),
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_window(mut self, window: WindowContext) -> Self {
        self.window = window;
        self
    }
}

impl fmt::Display for InputEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            KeyState::Down => "down",
            KeyState::Up => "up",
        };
        match self.key {
            Some(key) => write!(f, "{key:?} {state}")?,
            None => write!(f, "code {:#06x} {state}", self.native.code)?,
        }
        if !self.modifiers.is_empty() {
            write!(f, " [{}]", self.modifiers)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Hook handles
// ---------------------------------------------------------------------------

/// Opaque, process-unique identifier for an installed hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookHandle(u64);

impl HookHandle {
    /// Allocates a fresh handle. Backends call this once per successful install.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for HookHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hook#{}", self.0)
    }
}

/// Shared `remove()` precondition: `handle` must be the backend's active hook.
pub(crate) fn check_active(
    active: Option<HookHandle>,
    handle: HookHandle,
) -> Result<(), PlatformError> {
    if active == Some(handle) {
        Ok(())
    } else {
        Err(PlatformError::UnknownHook(handle))
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Observer invoked for every key event while a hook is installed.
///
/// Runs in the backend's delivery context and must return promptly.
pub type HookCallback = Box<dyn Fn(InputEvent) + Send>;

/// A global, non-consuming monitor of keyboard input.
///
/// Implementations forward every event to its target unmodified; the callback
/// only observes. At most one hook is active per backend.
pub trait InputHook {
    /// Starts delivering events to `callback`.
    ///
    /// Returns `PlatformError::AlreadyInstalled` if a hook is active.
    fn install(&mut self, callback: HookCallback) -> Result<HookHandle, PlatformError>;

    /// Stops delivery. No callback runs after this returns `Ok`.
    fn remove(&mut self, handle: HookHandle) -> Result<(), PlatformError>;
}

/// Synthesizes input events into the same dispatch path live events take.
///
/// Successive `inject` calls are delivered in call order.
pub trait InputInjector {
    /// Submits one event. `Ok` means the backend accepted it; queued backends
    /// may still fail to deliver it, which `finish` reports.
    fn inject(&self, event: &InputEvent) -> Result<(), PlatformError>;

    /// Blocks until every accepted event has been delivered or abandoned and
    /// returns how many accepted events were not delivered since the last call.
    ///
    /// Backends that deliver inside `inject` keep the default.
    fn finish(&self) -> usize {
        0
    }
}

// ---------------------------------------------------------------------------
// Factories
// ---------------------------------------------------------------------------

#[cfg(target_os = "linux")]
pub fn create_input_hook(config: &Config) -> Result<Box<dyn InputHook>, PlatformError> {
    linux::create_input_hook(&config.linux)
}

#[cfg(target_os = "linux")]
pub fn create_input_injector(config: &Config) -> Result<Box<dyn InputInjector>, PlatformError> {
    linux::create_input_injector(&config.linux)
}

#[cfg(target_os = "macos")]
pub fn create_input_hook(_config: &Config) -> Result<Box<dyn InputHook>, PlatformError> {
    macos::create_input_hook()
}

#[cfg(target_os = "macos")]
pub fn create_input_injector(_config: &Config) -> Result<Box<dyn InputInjector>, PlatformError> {
    macos::create_input_injector()
}

#[cfg(target_os = "windows")]
pub fn create_input_hook(_config: &Config) -> Result<Box<dyn InputHook>, PlatformError> {
    windows::create_input_hook()
}

#[cfg(target_os = "windows")]
pub fn create_input_injector(_config: &Config) -> Result<Box<dyn InputInjector>, PlatformError> {
    windows::create_input_injector()
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
pub fn create_input_hook(_config: &Config) -> Result<Box<dyn InputHook>, PlatformError> {
    Err(PlatformError::Unavailable(
        "no input hook backend for this OS".into(),
    ))
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
pub fn create_input_injector(_config: &Config) -> Result<Box<dyn InputInjector>, PlatformError> {
    Err(PlatformError::Unavailable(
        "no input injection backend for this OS".into(),
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hook_handles_are_unique() {
        let a = HookHandle::next();
        let b = HookHandle::next();
        assert_ne!(a, b);
    }

    #[test]
    fn check_active_rejects_stale_handle() {
        let active = HookHandle::next();
        let stale = HookHandle::next();
        assert!(check_active(Some(active), active).is_ok());
        assert!(matches!(
            check_active(Some(active), stale),
            Err(PlatformError::UnknownHook(h)) if h == stale
        ));
        assert!(check_active(None, active).is_err());
    }

    #[test]
    fn modifiers_track_press_and_release() {
        let mut mods = Modifiers::default();
        mods.apply(KeyCode::Shift, KeyState::Down);
        mods.apply(KeyCode::A, KeyState::Down);
        assert!(mods.shift);
        assert!(!mods.ctrl);
        mods.apply(KeyCode::Shift, KeyState::Up);
        assert!(mods.is_empty());
    }

    #[test]
    fn event_display_names_key_and_modifiers() {
        let event = InputEvent::new(KeyState::Down, NativeKey::new(30), Some(KeyCode::A))
            .with_modifiers(Modifiers {
                ctrl: true,
                shift: true,
                ..Modifiers::default()
            });
        assert_eq!(event.to_string(), "A down [ctrl+shift]");
    }

    #[test]
    fn event_display_falls_back_to_native_code() {
        let event = InputEvent::new(KeyState::Up, NativeKey::new(0x1d0), None);
        assert_eq!(event.to_string(), "code 0x01d0 up");
    }

    #[test]
    fn only_the_four_modifiers_are_modifiers() {
        assert!(KeyCode::Shift.is_modifier());
        assert!(KeyCode::Meta.is_modifier());
        assert!(!KeyCode::CapsLock.is_modifier());
        assert!(!KeyCode::A.is_modifier());
    }

    #[test]
    fn cloned_event_is_independent_and_equal() {
        let original = InputEvent::new(KeyState::Down, NativeKey::new(48), Some(KeyCode::B));
        let copy = original.clone();
        drop(original);
        assert_eq!(copy.key, Some(KeyCode::B));
    }
}
