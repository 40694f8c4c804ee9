//! Ordered storage for one recording session.

use std::collections::HashSet;
use std::slice;

use crate::platform::{InputEvent, KeyCode, KeyState};

/// Captured events in arrival order.
#[derive(Debug, Clone, Default)]
pub struct MacroBuffer {
    events: Vec<InputEvent>,
}

impl MacroBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: InputEvent) {
        self.events.push(event);
    }

    /// Drops all events but keeps the allocation for the next session.
    pub fn reset(&mut self) {
        self.events.clear();
    }

    /// Moves every event of `other` to the end of this buffer.
    pub fn append(&mut self, other: &mut MacroBuffer) {
        self.events.append(&mut other.events);
    }

    pub fn truncate(&mut self, len: usize) {
        self.events.truncate(len);
    }

    /// Finds where the presses of `keys` begin, if the buffer ends with
    /// exactly those presses in that order. Releases and modifier presses in
    /// between are skipped; any other press breaks the match.
    pub fn typed_suffix_start(&self, keys: &[KeyCode]) -> Option<usize> {
        let mut expected = keys.iter().rev().peekable();
        expected.peek()?;
        for (index, event) in self.events.iter().enumerate().rev() {
            if event.state != KeyState::Down {
                continue;
            }
            let key = event.key?;
            if key.is_modifier() {
                continue;
            }
            if expected.next() != Some(&key) {
                return None;
            }
            if expected.peek().is_none() {
                return Some(index);
            }
        }
        None
    }

    /// Drops releases of keys that were not pressed earlier in the buffer.
    /// Returns how many were dropped.
    pub fn remove_unmatched_releases(&mut self) -> usize {
        let before = self.events.len();
        let mut held = HashSet::new();
        self.events.retain(|event| match event.state {
            KeyState::Down => {
                held.insert(event.native);
                true
            }
            KeyState::Up => held.remove(&event.native),
        });
        before - self.events.len()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Restartable traversal: the iterator is `Clone`.
    pub fn iter(&self) -> slice::Iter<'_, InputEvent> {
        self.events.iter()
    }

    pub fn as_slice(&self) -> &[InputEvent] {
        &self.events
    }

    pub fn capacity(&self) -> usize {
        self.events.capacity()
    }
}

impl<'a> IntoIterator for &'a MacroBuffer {
    type Item = &'a InputEvent;
    type IntoIter = slice::Iter<'a, InputEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
