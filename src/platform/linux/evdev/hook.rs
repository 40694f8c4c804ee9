//! Keyboard monitoring via the Linux evdev interface (/dev/input/event*).
//!
//! `LinuxEvdevHook` implements `InputHook`. `install()` enumerates all keyboard
//! devices under /dev/input/, then spawns a background thread with a
//! single-threaded tokio runtime that reads from all keyboards concurrently via
//! `futures::stream::SelectAll`. `install()` returns only after the event
//! streams are open, so device errors surface to the caller.
//!
//! Devices are opened without `EVIOCGRAB`: this is a pure monitor and every
//! event continues to the compositor/X server unchanged.
//!
//! Required permissions: the process user must be a member of the `input` group.
//!   sudo usermod -aG input $USER   (then log out and back in)

use std::future;
use std::io;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use evdev::{Device, InputEventKind};
use futures::stream::{LocalBoxStream, SelectAll};
use futures::{Stream, StreamExt};
use tokio::sync::oneshot;

use super::super::keycodes::evdev_to_keycode;
use crate::platform::{
    check_active, HookCallback, HookHandle, InputEvent, InputHook, KeyState, Modifiers,
    NativeKey, PlatformError,
};

/// evdev `value` for key events.
const VALUE_UP: i32 = 0;
const VALUE_DOWN: i32 = 1;
const VALUE_REPEAT: i32 = 2;

/// Linux keyboard monitor using the evdev input subsystem.
pub struct LinuxEvdevHook {
    record_autorepeat: bool,
    active: Option<HookHandle>,
    stop_tx: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl LinuxEvdevHook {
    pub fn new(record_autorepeat: bool) -> Self {
        Self {
            record_autorepeat,
            active: None,
            stop_tx: None,
            thread: None,
        }
    }

    fn shutdown(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            // The thread may already have exited if every device went away.
            let _ = tx.send(());
        }
        if let Some(t) = self.thread.take() {
            let _ = t.join();
        }
    }
}

impl InputHook for LinuxEvdevHook {
    fn install(&mut self, callback: HookCallback) -> Result<HookHandle, PlatformError> {
        if self.active.is_some() {
            return Err(PlatformError::AlreadyInstalled);
        }

        // Enumerate in the calling thread so errors surface immediately.
        let keyboards = find_keyboards()?;
        log::info!("capture: found {} keyboard device(s)", keyboards.len());
        for dev in &keyboards {
            log::debug!("capture: monitoring {:?}", dev.name().unwrap_or("unnamed"));
        }

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| PlatformError::Other(format!("failed to build tokio runtime: {e}")))?;

        let (stop_tx, stop_rx) = oneshot::channel();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), PlatformError>>();
        let record_autorepeat = self.record_autorepeat;

        let thread = thread::spawn(move || {
            rt.block_on(monitor_loop(
                keyboards,
                callback,
                record_autorepeat,
                ready_tx,
                stop_rx,
            ));
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {
                let handle = HookHandle::next();
                self.active = Some(handle);
                self.stop_tx = Some(stop_tx);
                self.thread = Some(thread);
                Ok(handle)
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(PlatformError::Other(
                    "capture thread exited before reporting status".into(),
                ))
            }
        }
    }

    fn remove(&mut self, handle: HookHandle) -> Result<(), PlatformError> {
        check_active(self.active, handle)?;
        self.shutdown();
        self.active = None;
        log::info!("capture: evdev monitor stopped");
        Ok(())
    }
}

impl Drop for LinuxEvdevHook {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ---------------------------------------------------------------------------
// Device enumeration
// ---------------------------------------------------------------------------

/// Finds all keyboard devices in /dev/input/.
///
/// A device counts as a keyboard if it reports `KEY_A`, which filters out
/// mice, joysticks, and power buttons.
fn find_keyboards() -> Result<Vec<Device>, PlatformError> {
    let keyboards: Vec<Device> = evdev::enumerate()
        .map(|(_, dev)| dev)
        .filter(|dev| {
            dev.supported_keys()
                .is_some_and(|keys| keys.contains(evdev::Key::KEY_A))
        })
        .collect();

    if keyboards.is_empty() {
        Err(PlatformError::PermissionDenied(
            "No keyboard devices readable in /dev/input/. \
             Ensure this user is in the 'input' group: \
             sudo usermod -aG input $USER (then log out and back in)."
                .into(),
        ))
    } else {
        Ok(keyboards)
    }
}

// ---------------------------------------------------------------------------
// Async event loop
// ---------------------------------------------------------------------------

type DeviceStream = LocalBoxStream<'static, io::Result<evdev::InputEvent>>;

/// Opens an event stream per device, reports readiness, then forwards key
/// events until stopped or every stream ends.
async fn monitor_loop(
    keyboards: Vec<Device>,
    callback: HookCallback,
    record_autorepeat: bool,
    ready_tx: mpsc::Sender<Result<(), PlatformError>>,
    stop_rx: oneshot::Receiver<()>,
) {
    let mut streams: SelectAll<DeviceStream> = SelectAll::new();
    for device in keyboards {
        match device.into_event_stream() {
            Ok(stream) => streams.push(until_error(stream).boxed_local()),
            Err(e) => {
                let _ = ready_tx.send(Err(PlatformError::Other(format!(
                    "cannot open event stream: {e}"
                ))));
                return;
            }
        }
    }

    let _ = ready_tx.send(Ok(()));
    log::info!("capture: evdev monitor active");

    let mut modifiers = Modifiers::default();
    tokio::select! {
        _ = stop_rx => {
            log::debug!("capture: stop signal received");
        }
        _ = forward(&mut streams, &callback, record_autorepeat, &mut modifiers) => {
            log::warn!("capture: all evdev streams ended");
        }
    }
}

/// Passes key events from every device to `callback` until no device is left.
///
/// A device that reports an error (unplugged, revoked) is dropped on its own;
/// the others keep delivering.
async fn forward<S>(
    streams: &mut S,
    callback: &HookCallback,
    record_autorepeat: bool,
    modifiers: &mut Modifiers,
) where
    S: Stream<Item = io::Result<evdev::InputEvent>> + Unpin,
{
    while let Some(item) = streams.next().await {
        match item {
            Ok(event) => {
                if let Some(event) = translate(event, record_autorepeat, modifiers) {
                    callback(event);
                }
            }
            Err(e) => log::warn!("capture: keyboard stream failed, dropping it: {e}"),
        }
    }
}

/// Ends `stream` right after its first error, so a dead device leaves the
/// `SelectAll` instead of repeating the error.
fn until_error<S, T>(stream: S) -> impl Stream<Item = io::Result<T>>
where
    S: Stream<Item = io::Result<T>>,
{
    let mut failed = false;
    stream.take_while(move |item| {
        let keep = !failed;
        failed = item.is_err();
        future::ready(keep)
    })
}

// ---------------------------------------------------------------------------
// Event translation
// ---------------------------------------------------------------------------

/// Converts a raw evdev event into an `InputEvent`.
///
/// Non-key events are skipped. Auto-repeat becomes a further `Down` unless
/// `record_autorepeat` is off. Codes without a canonical name are kept with
/// `key: None`. `modifiers` reflects the held set before this event, then is
/// updated from it.
fn translate(
    event: evdev::InputEvent,
    record_autorepeat: bool,
    modifiers: &mut Modifiers,
) -> Option<InputEvent> {
    let InputEventKind::Key(evdev_key) = event.kind() else {
        return None;
    };
    key_event(evdev_key.code(), event.value(), record_autorepeat, modifiers)
}

fn key_event(
    code: u16,
    value: i32,
    record_autorepeat: bool,
    modifiers: &mut Modifiers,
) -> Option<InputEvent> {
    let state = match value {
        VALUE_DOWN => KeyState::Down,
        VALUE_UP => KeyState::Up,
        VALUE_REPEAT if record_autorepeat => KeyState::Down,
        _ => return None,
    };

    let key = evdev_to_keycode(code);
    if key.is_none() {
        log::debug!("capture: unnamed evdev keycode {code}");
    }

    let event = InputEvent::new(state, NativeKey::new(u32::from(code)), key)
        .with_modifiers(*modifiers);
    if let Some(key) = key {
        modifiers.apply(key, state);
    }
    Some(event)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::KeyCode;

    #[test]
    fn new_produces_idle_state() {
        let hook = LinuxEvdevHook::new(true);
        assert!(hook.active.is_none());
        assert!(hook.stop_tx.is_none());
        assert!(hook.thread.is_none());
    }

    #[test]
    fn remove_without_install_is_rejected() {
        let mut hook = LinuxEvdevHook::new(true);
        let handle = HookHandle::next();
        assert!(matches!(
            hook.remove(handle),
            Err(PlatformError::UnknownHook(h)) if h == handle
        ));
    }

    #[test]
    fn press_and_release_are_translated() {
        let mut mods = Modifiers::default();
        let down = key_event(30, VALUE_DOWN, true, &mut mods).unwrap();
        assert_eq!(down.state, KeyState::Down);
        assert_eq!(down.key, Some(KeyCode::A));
        assert_eq!(down.native.code, 30);
        let up = key_event(30, VALUE_UP, true, &mut mods).unwrap();
        assert_eq!(up.state, KeyState::Up);
    }

    #[test]
    fn autorepeat_follows_config() {
        let mut mods = Modifiers::default();
        let repeat = key_event(14, VALUE_REPEAT, true, &mut mods).unwrap();
        assert_eq!(repeat.state, KeyState::Down);
        assert!(key_event(14, VALUE_REPEAT, false, &mut mods).is_none());
    }

    #[test]
    fn unnamed_codes_are_still_recorded() {
        let mut mods = Modifiers::default();
        let event = key_event(164, VALUE_DOWN, true, &mut mods).unwrap();
        assert_eq!(event.key, None);
        assert_eq!(event.native.code, 164);
    }

    fn raw_key(code: u16, value: i32) -> io::Result<evdev::InputEvent> {
        Ok(evdev::InputEvent::new(evdev::EventType::KEY, code, value))
    }

    #[test]
    fn failing_keyboard_does_not_stop_the_others() {
        let unplugged = futures::stream::iter(vec![
            raw_key(30, VALUE_DOWN),
            Err(io::Error::from_raw_os_error(19)),
            raw_key(45, VALUE_DOWN),
        ]);
        let healthy = futures::stream::iter(vec![
            raw_key(48, VALUE_DOWN),
            raw_key(48, VALUE_UP),
            raw_key(46, VALUE_DOWN),
        ]);
        let mut streams: SelectAll<DeviceStream> = SelectAll::new();
        streams.push(until_error(unplugged).boxed_local());
        streams.push(until_error(healthy).boxed_local());

        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = std::sync::Arc::clone(&seen);
        let callback: HookCallback = Box::new(move |event| sink.lock().unwrap().push(event));
        let mut mods = Modifiers::default();
        futures::executor::block_on(forward(&mut streams, &callback, true, &mut mods));

        let mut codes: Vec<(u32, KeyState)> = seen
            .lock()
            .unwrap()
            .iter()
            .map(|e| (e.native.code, e.state))
            .collect();
        codes.sort_by_key(|&(code, state)| (code, state == KeyState::Up));
        assert_eq!(
            codes,
            vec![
                (30, KeyState::Down),
                (46, KeyState::Down),
                (48, KeyState::Down),
                (48, KeyState::Up),
            ]
        );
    }

    #[test]
    fn stream_ends_after_its_first_error() {
        let stream = until_error(futures::stream::iter(vec![
            raw_key(30, VALUE_DOWN),
            Err(io::Error::from_raw_os_error(19)),
            raw_key(31, VALUE_DOWN),
        ]));
        let items = futures::executor::block_on(stream.collect::<Vec<_>>());
        assert_eq!(items.len(), 2);
        assert!(items[1].is_err());
    }

    #[test]
    fn modifier_state_is_taken_before_the_event() {
        let mut mods = Modifiers::default();
        let shift_down = key_event(42, VALUE_DOWN, true, &mut mods).unwrap();
        assert!(!shift_down.modifiers.shift);

        let a_down = key_event(30, VALUE_DOWN, true, &mut mods).unwrap();
        assert!(a_down.modifiers.shift);

        let shift_up = key_event(54, VALUE_UP, true, &mut mods).unwrap();
        assert!(shift_up.modifiers.shift);
        assert!(mods.is_empty());
    }
}
