//! Macro recorder/player.
//!
//! `MacroRecorder` owns the recording state, the event buffer, and the hook
//! handle. While recording, the installed hook appends every observed event to
//! a buffer shared with the hook callback; `stop_recording` removes the hook
//! and moves the captured events back into recorder-owned storage, so an event
//! that arrives after stop lands in a detached buffer and is never seen.
//!
//! Start, stop and playback are each bracketed by a user action on the
//! attached `EditGroup`, so the visible effect of a replayed macro undoes as a
//! single step.

use std::fmt;
use std::mem;
use std::slice;
use std::sync::{Arc, Mutex, PoisonError};

use crate::buffer::MacroBuffer;
use crate::edit_group::{EditGroup, UserActionGuard};
use crate::error::MacroError;
use crate::platform::{HookCallback, HookHandle, InputEvent, InputHook, InputInjector, KeyCode};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Recording,
}

impl fmt::Display for RecordingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecordingState::Idle => "idle",
            RecordingState::Recording => "recording",
        })
    }
}

/// The recorder operations, named in `InvalidStateTransition` errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    StartRecording,
    StopRecording,
    Playback,
    Trim,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::StartRecording => "start recording",
            Operation::StopRecording => "stop recording",
            Operation::Playback => "play back",
            Operation::Trim => "trim the macro",
        })
    }
}

/// Outcome of one playback pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackReport {
    pub injected: usize,
    pub failed: usize,
}

impl PlaybackReport {
    pub fn total(&self) -> usize {
        self.injected + self.failed
    }

    /// Turns a partial playback into `MacroError::InjectionFailed`.
    pub fn ensure_complete(self) -> Result<Self, MacroError> {
        if self.failed == 0 {
            Ok(self)
        } else {
            Err(MacroError::InjectionFailed {
                failed: self.failed,
                total: self.total(),
            })
        }
    }
}

/// An installed hook and the buffer its callback appends to.
struct Session {
    handle: HookHandle,
    live: Arc<Mutex<MacroBuffer>>,
}

// ---------------------------------------------------------------------------
// Recorder
// ---------------------------------------------------------------------------

/// Records key events through an `InputHook` and replays them through an
/// `InputInjector`.
///
/// Methods take `&mut self`: the recorder is driven from a single thread.
pub struct MacroRecorder {
    hook: Box<dyn InputHook>,
    injector: Box<dyn InputInjector>,
    edit_group: Option<Box<dyn EditGroup>>,
    session: Option<Session>,
    buffer: MacroBuffer,
}

impl MacroRecorder {
    pub fn new(hook: Box<dyn InputHook>, injector: Box<dyn InputInjector>) -> Self {
        Self {
            hook,
            injector,
            edit_group: None,
            session: None,
            buffer: MacroBuffer::new(),
        }
    }

    /// Attaches a document model whose undo history groups each operation.
    pub fn with_edit_group(mut self, group: Box<dyn EditGroup>) -> Self {
        self.edit_group = Some(group);
        self
    }

    pub fn state(&self) -> RecordingState {
        if self.session.is_some() {
            RecordingState::Recording
        } else {
            RecordingState::Idle
        }
    }

    pub fn can_start_recording(&self) -> bool {
        self.state() == RecordingState::Idle
    }

    pub fn can_stop_recording(&self) -> bool {
        self.state() == RecordingState::Recording
    }

    pub fn can_playback(&self) -> bool {
        self.state() == RecordingState::Idle && !self.buffer.is_empty()
    }

    /// Number of captured events; the live count while recording.
    pub fn len(&self) -> usize {
        match &self.session {
            Some(session) => lock(&session.live).len(),
            None => self.buffer.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Events of the last completed recording, in capture order.
    ///
    /// Empty while a recording is in progress.
    pub fn events(&self) -> slice::Iter<'_, InputEvent> {
        self.buffer.iter()
    }

    /// Discards the previous macro and starts capturing.
    ///
    /// If the hook cannot be installed the previous macro is kept.
    pub fn start_recording(&mut self) -> Result<(), MacroError> {
        if self.session.is_some() {
            return Err(self.invalid(Operation::StartRecording));
        }

        let _action = UserActionGuard::begin(self.edit_group.as_deref());

        let live = Arc::new(Mutex::new(MacroBuffer::new()));
        let sink = Arc::clone(&live);
        let callback: HookCallback = Box::new(move |event| {
            log::trace!("recorder: captured {event}");
            lock(&sink).push(event);
        });

        let handle = match self.hook.install(callback) {
            Ok(handle) => handle,
            Err(e) => {
                log::warn!("recorder: hook installation failed: {e}");
                return Err(MacroError::HookInstallationFailed(e));
            }
        };

        if !self.buffer.is_empty() {
            log::debug!("recorder: discarding {} event(s)", self.buffer.len());
        }
        // Move the old macro's allocation under the hook, keeping anything
        // already delivered during install.
        let mut storage = mem::take(&mut self.buffer);
        storage.reset();
        {
            let mut captured = lock(&live);
            storage.append(&mut captured);
            *captured = storage;
        }

        log::info!("recorder: recording started ({handle})");
        self.session = Some(Session { handle, live });
        Ok(())
    }

    /// Removes the hook and keeps everything captured so far.
    pub fn stop_recording(&mut self) -> Result<(), MacroError> {
        let Some(session) = self.session.take() else {
            return Err(self.invalid(Operation::StopRecording));
        };

        let _action = UserActionGuard::begin(self.edit_group.as_deref());

        if let Err(e) = self.hook.remove(session.handle) {
            // The handle is consumed either way; the sealed buffer ignores stragglers.
            log::warn!("recorder: removing {} failed: {e}", session.handle);
        }
        self.buffer = seal(session.live);

        log::info!(
            "recorder: recording stopped, {} event(s) captured",
            self.buffer.len()
        );
        Ok(())
    }

    /// Injects every recorded event in capture order.
    ///
    /// Injection failures are logged and counted; the remaining events are
    /// still injected. The buffer is not modified.
    pub fn playback(&mut self) -> Result<PlaybackReport, MacroError> {
        if self.session.is_some() {
            return Err(self.invalid(Operation::Playback));
        }

        let _action = UserActionGuard::begin(self.edit_group.as_deref());

        let mut report = PlaybackReport::default();
        for (index, event) in self.buffer.iter().enumerate() {
            match self.injector.inject(event) {
                Ok(()) => report.injected += 1,
                Err(e) => {
                    log::warn!("recorder: event {index} ({event}) not injected: {e}");
                    report.failed += 1;
                }
            }
        }

        // Queued backends may still lose accepted events.
        let lost = self.injector.finish().min(report.injected);
        if lost > 0 {
            log::warn!("recorder: {lost} accepted event(s) were not delivered");
            report.injected -= lost;
            report.failed += lost;
        }

        if report.failed > 0 {
            log::warn!(
                "recorder: playback finished, {} of {} event(s) failed",
                report.failed,
                report.total()
            );
        } else {
            log::info!("recorder: played back {} event(s)", report.injected);
        }
        Ok(report)
    }

    /// Removes the keystrokes of a controlling front end from the last macro:
    /// the presses of `typed` at its end (with their releases), and releases
    /// whose press happened before recording started.
    ///
    /// The tail is only removed when the macro ends with exactly the presses
    /// of `typed`. Returns the number of events removed.
    pub fn trim(&mut self, typed: &[KeyCode]) -> Result<usize, MacroError> {
        if self.session.is_some() {
            return Err(self.invalid(Operation::Trim));
        }

        let before = self.buffer.len();
        if let Some(start) = self.buffer.typed_suffix_start(typed) {
            self.buffer.truncate(start);
        }
        self.buffer.remove_unmatched_releases();

        let removed = before - self.buffer.len();
        if removed > 0 {
            log::debug!("recorder: trimmed {removed} control event(s)");
        }
        Ok(removed)
    }

    fn invalid(&self, operation: Operation) -> MacroError {
        let state = self.state();
        log::warn!("recorder: cannot {operation} while {state}");
        MacroError::InvalidStateTransition { operation, state }
    }
}

impl Drop for MacroRecorder {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            let _ = self.hook.remove(session.handle);
        }
    }
}

/// Locks the shared buffer. A panicking callback cannot corrupt a `Vec` push,
/// so a poisoned lock is still usable.
fn lock(buffer: &Mutex<MacroBuffer>) -> std::sync::MutexGuard<'_, MacroBuffer> {
    buffer.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Takes the captured events out of the shared buffer, leaving an empty one
/// behind for any callback still holding a reference.
fn seal(live: Arc<Mutex<MacroBuffer>>) -> MacroBuffer {
    match Arc::try_unwrap(live) {
        Ok(mutex) => mutex.into_inner().unwrap_or_else(PoisonError::into_inner),
        Err(shared) => mem::take(&mut *lock(&shared)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
