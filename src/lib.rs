//! keymacro -- keyboard macro recorder and player.
//!
//! A `MacroRecorder` captures key events through a platform `InputHook` while
//! recording, and replays the captured sequence through an `InputInjector`.

pub mod buffer;
pub mod command;
pub mod config;
pub mod edit_group;
pub mod error;
pub mod platform;
pub mod recorder;

pub use buffer::MacroBuffer;
pub use config::Config;
pub use edit_group::{EditGroup, UserActionGuard};
pub use error::MacroError;
pub use platform::{
    HookCallback, HookHandle, InputEvent, InputHook, InputInjector, KeyCode, KeyState, Modifiers,
    NativeKey, PlatformError, WindowContext,
};
pub use recorder::{MacroRecorder, Operation, PlaybackReport, RecordingState};
