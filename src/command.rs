//! Line commands for the interactive front end.
//!
//! These stand in for the editor menu actions: start recording, stop
//! recording, play back, plus status and listing helpers.

use std::fmt::Write as _;
use std::str::FromStr;

use thiserror::Error;

use crate::error::MacroError;
use crate::platform::KeyCode;
use crate::recorder::MacroRecorder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Record,
    Stop,
    Play,
    Status,
    List,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown command `{0}` (try `help`)")]
pub struct UnknownCommand(pub String);

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "record" | "r" => Ok(Command::Record),
            "stop" | "s" => Ok(Command::Stop),
            // `m` mirrors the editor's <Ctrl>m playback accelerator.
            "play" | "p" | "m" => Ok(Command::Play),
            "status" => Ok(Command::Status),
            "list" | "ls" => Ok(Command::List),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            other => Err(UnknownCommand(other.to_string())),
        }
    }
}

pub const HELP: &str = "\
commands:
  record (r)     start recording; discards the previous macro
  stop (s)       stop recording
  play (p, m)    play back the recorded macro
  status         show recorder state
  list (ls)      list recorded events
  quit (q)       exit

note: keystrokes typed into this terminal while recording are part of the
macro, except the `stop` line itself.";

/// Runs `command` against `recorder` and returns the text to show the user.
///
/// `line` is the text the command was typed as. The hooks are global, so the
/// line that stops a recording was itself recorded; it is trimmed off again.
/// `Quit` and `Help` need no recorder access and are answered here too.
pub fn execute(
    recorder: &mut MacroRecorder,
    command: Command,
    line: &str,
) -> Result<String, MacroError> {
    match command {
        Command::Record => {
            recorder.start_recording()?;
            Ok("recording...".into())
        }
        Command::Stop => {
            recorder.stop_recording()?;
            let typed = typed_keys(line).unwrap_or_default();
            recorder.trim(&typed)?;
            Ok(format!("recorded {} event(s)", recorder.len()))
        }
        Command::Play => {
            let report = recorder.playback()?.ensure_complete()?;
            Ok(format!("played {} event(s)", report.injected))
        }
        Command::Status => Ok(status(recorder)),
        Command::List => Ok(list(recorder)),
        Command::Help => Ok(HELP.into()),
        Command::Quit => Ok(String::new()),
    }
}

#[rustfmt::skip]
const LETTERS: [KeyCode; 26] = [
    KeyCode::A, KeyCode::B, KeyCode::C, KeyCode::D, KeyCode::E, KeyCode::F, KeyCode::G,
    KeyCode::H, KeyCode::I, KeyCode::J, KeyCode::K, KeyCode::L, KeyCode::M, KeyCode::N,
    KeyCode::O, KeyCode::P, KeyCode::Q, KeyCode::R, KeyCode::S, KeyCode::T, KeyCode::U,
    KeyCode::V, KeyCode::W, KeyCode::X, KeyCode::Y, KeyCode::Z,
];

#[rustfmt::skip]
const DIGITS: [KeyCode; 10] = [
    KeyCode::Key0, KeyCode::Key1, KeyCode::Key2, KeyCode::Key3, KeyCode::Key4,
    KeyCode::Key5, KeyCode::Key6, KeyCode::Key7, KeyCode::Key8, KeyCode::Key9,
];

/// The key presses that type `line` followed by Enter on a US layout, or
/// `None` if a character has no known key.
fn typed_keys(line: &str) -> Option<Vec<KeyCode>> {
    let mut keys = line
        .trim_end_matches(['\r', '\n'])
        .chars()
        .map(|c| match c.to_ascii_lowercase() {
            c @ 'a'..='z' => Some(LETTERS[usize::from(c as u8 - b'a')]),
            c @ '0'..='9' => Some(DIGITS[usize::from(c as u8 - b'0')]),
            ' ' => Some(KeyCode::Space),
            '?' | '/' => Some(KeyCode::Slash),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    keys.push(KeyCode::Enter);
    Some(keys)
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

pub fn status(recorder: &MacroRecorder) -> String {
    format!(
        "state: {}, events: {}, can record: {}, can stop: {}, can play: {}",
        recorder.state(),
        recorder.len(),
        yes_no(recorder.can_start_recording()),
        yes_no(recorder.can_stop_recording()),
        yes_no(recorder.can_playback()),
    )
}

pub fn list(recorder: &MacroRecorder) -> String {
    let mut out = String::new();
    let Some(first) = recorder.events().next() else {
        return "no recorded events".into();
    };
    for (index, event) in recorder.events().enumerate() {
        let offset = event.timestamp.saturating_duration_since(first.timestamp);
        let _ = writeln!(
            out,
            "{index:>4}  +{:>8.1}ms  {event}",
            offset.as_secs_f64() * 1000.0
        );
    }
    out.pop();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{
        HookCallback, HookHandle, InputEvent, InputHook, InputInjector, KeyCode, KeyState,
        NativeKey, PlatformError,
    };

    /// Emits a fixed sequence the moment it is installed.
    struct ScriptedHook(Vec<InputEvent>);

    impl InputHook for ScriptedHook {
        fn install(&mut self, callback: HookCallback) -> Result<HookHandle, PlatformError> {
            for event in &self.0 {
                callback(event.clone());
            }
            Ok(HookHandle::next())
        }

        fn remove(&mut self, _handle: HookHandle) -> Result<(), PlatformError> {
            Ok(())
        }
    }

    struct NullInjector;

    impl InputInjector for NullInjector {
        fn inject(&self, _event: &InputEvent) -> Result<(), PlatformError> {
            Ok(())
        }
    }

    fn scripted(keys: &[KeyCode]) -> MacroRecorder {
        let events = keys
            .iter()
            .map(|&k| InputEvent::new(KeyState::Down, NativeKey::new(k as u32), Some(k)))
            .collect();
        MacroRecorder::new(Box::new(ScriptedHook(events)), Box::new(NullInjector))
    }

    #[test]
    fn parses_names_and_aliases() {
        assert_eq!("record".parse(), Ok(Command::Record));
        assert_eq!(" STOP ".parse(), Ok(Command::Stop));
        assert_eq!("m".parse(), Ok(Command::Play));
        assert_eq!("ls".parse(), Ok(Command::List));
        assert_eq!("q".parse(), Ok(Command::Quit));
    }

    #[test]
    fn rejects_unknown_command() {
        let err = "rewind".parse::<Command>().unwrap_err();
        assert_eq!(err, UnknownCommand("rewind".into()));
    }

    #[test]
    fn record_stop_play_cycle() {
        let mut recorder = scripted(&[KeyCode::H, KeyCode::I]);
        assert_eq!(
            execute(&mut recorder, Command::Record, "record\n").unwrap(),
            "recording..."
        );
        assert_eq!(
            execute(&mut recorder, Command::Stop, "stop\n").unwrap(),
            "recorded 2 event(s)"
        );
        assert_eq!(
            execute(&mut recorder, Command::Play, "play\n").unwrap(),
            "played 2 event(s)"
        );
    }

    #[test]
    fn stop_without_record_reports_error() {
        let mut recorder = scripted(&[]);
        let err = execute(&mut recorder, Command::Stop, "stop\n").unwrap_err();
        assert_eq!(err.to_string(), "cannot stop recording while idle");
    }

    fn tapped(keys: &[KeyCode]) -> Vec<InputEvent> {
        keys.iter()
            .flat_map(|&k| {
                [KeyState::Down, KeyState::Up]
                    .map(|state| InputEvent::new(state, NativeKey::new(k as u32), Some(k)))
            })
            .collect()
    }

    #[test]
    fn typed_keys_cover_command_lines() {
        assert_eq!(typed_keys("s\n"), Some(vec![KeyCode::S, KeyCode::Enter]));
        assert_eq!(
            typed_keys("Stop\r\n"),
            Some(vec![KeyCode::S, KeyCode::T, KeyCode::O, KeyCode::P, KeyCode::Enter])
        );
        assert_eq!(typed_keys("stop!"), None);
    }

    #[test]
    fn stop_line_is_not_part_of_the_macro() {
        // The release of the Enter that submitted `record`, the macro itself,
        // then the keystrokes of `stop` up to the Enter press.
        let mut events = vec![InputEvent::new(
            KeyState::Up,
            NativeKey::new(KeyCode::Enter as u32),
            Some(KeyCode::Enter),
        )];
        events.extend(tapped(&[KeyCode::H, KeyCode::I]));
        events.extend(tapped(&[KeyCode::S, KeyCode::T, KeyCode::O, KeyCode::P]));
        events.push(InputEvent::new(
            KeyState::Down,
            NativeKey::new(KeyCode::Enter as u32),
            Some(KeyCode::Enter),
        ));
        let mut recorder =
            MacroRecorder::new(Box::new(ScriptedHook(events)), Box::new(NullInjector));

        execute(&mut recorder, Command::Record, "record\n").unwrap();
        assert_eq!(
            execute(&mut recorder, Command::Stop, "stop\n").unwrap(),
            "recorded 4 event(s)"
        );
        let keys: Vec<_> = recorder.events().map(|e| e.key).collect();
        assert_eq!(
            keys,
            vec![Some(KeyCode::H), Some(KeyCode::H), Some(KeyCode::I), Some(KeyCode::I)]
        );
    }

    #[test]
    fn status_reflects_capabilities() {
        let mut recorder = scripted(&[KeyCode::A]);
        assert_eq!(
            status(&recorder),
            "state: idle, events: 0, can record: yes, can stop: no, can play: no"
        );
        execute(&mut recorder, Command::Record, "record\n").unwrap();
        assert_eq!(
            status(&recorder),
            "state: recording, events: 1, can record: no, can stop: yes, can play: no"
        );
    }

    #[test]
    fn list_shows_each_event() {
        let mut recorder = scripted(&[KeyCode::A, KeyCode::B]);
        assert_eq!(list(&recorder), "no recorded events");
        execute(&mut recorder, Command::Record, "record\n").unwrap();
        execute(&mut recorder, Command::Stop, "stop\n").unwrap();
        let listing = list(&recorder);
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("A down"));
        assert!(lines[1].ends_with("B down"));
    }
}
