//! Errors surfaced by the recorder to its caller.

use thiserror::Error;

use crate::platform::PlatformError;
use crate::recorder::{Operation, RecordingState};

#[derive(Debug, Error)]
pub enum MacroError {
    /// The platform refused to install the input monitor. The recorder stays idle.
    #[error("could not install input hook: {0}")]
    HookInstallationFailed(#[source] PlatformError),

    /// The operation is not valid in the current state; nothing was changed.
    #[error("cannot {operation} while {state}")]
    InvalidStateTransition {
        operation: Operation,
        state: RecordingState,
    },

    /// Summary of a playback in which some events were rejected by the injector.
    #[error("{failed} of {total} events could not be injected")]
    InjectionFailed { failed: usize, total: usize },
}
