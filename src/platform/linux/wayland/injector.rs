//! Wayland input injection via the xdg-desktop-portal RemoteDesktop portal.
//!
//! `LinuxWaylandInjector` implements `InputInjector`. `new()` spawns a
//! background thread that owns a single-threaded tokio runtime; that runtime
//! sets up the portal session and then loops waiting for session commands.
//!
//! `inject()` enqueues on an unbounded `tokio::sync::mpsc` channel: it never
//! blocks, and the single consumer preserves submission order. Commands queued
//! before the session is ready are delivered once it is. Delivery failures,
//! and keys still queued when the session dies, are counted in a shared
//! counter; `finish()` queues a flush marker behind the pending keys, waits
//! for it, and hands the count back.
//!
//! The compositor shows a permission dialog on first use; the restore token is
//! saved so later runs skip it.

use std::fmt::Display;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use ashpd::desktop::{
    remote_desktop::{DeviceType, KeyState as PortalKeyState, RemoteDesktop},
    PersistMode,
};
use tokio::sync::{mpsc, oneshot};

use crate::config::config_dir;
use crate::platform::{InputEvent, InputInjector, KeyState, PlatformError};

const TOKEN_FILE: &str = "remote-desktop-token";

/// One key transition queued for the portal session.
struct InjectionCmd {
    /// Linux evdev keycode, as recorded.
    keycode: i32,
    state: PortalKeyState,
    /// When `inject()` was called; used for the latency log line.
    queued_at: Instant,
}

enum SessionCmd {
    Key(InjectionCmd),
    /// Answered once every command queued before it has been handled.
    Flush(oneshot::Sender<()>),
}

/// Injects keyboard events via xdg-desktop-portal RemoteDesktop on Wayland.
pub struct LinuxWaylandInjector {
    cmd_tx: mpsc::UnboundedSender<SessionCmd>,
    /// Accepted keys that never reached the compositor.
    undelivered: Arc<AtomicUsize>,
}

impl LinuxWaylandInjector {
    /// Creates the injector and launches the background portal session.
    ///
    /// The session thread is detached: it ends when the injector is dropped
    /// and the channel closes, but it may first sit in the portal dialog.
    pub fn new() -> Result<Self, PlatformError> {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<SessionCmd>();
        let undelivered = Arc::new(AtomicUsize::new(0));

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| PlatformError::Other(format!("failed to build tokio runtime: {e}")))?;

        let counter = Arc::clone(&undelivered);
        thread::spawn(move || rt.block_on(run_session(cmd_rx, counter)));

        Ok(Self {
            cmd_tx,
            undelivered,
        })
    }
}

impl InputInjector for LinuxWaylandInjector {
    fn inject(&self, event: &InputEvent) -> Result<(), PlatformError> {
        let keycode = i32::try_from(event.native.code).map_err(|_| {
            PlatformError::Other(format!("keycode {} out of range", event.native.code))
        })?;
        let state = match event.state {
            KeyState::Down => PortalKeyState::Pressed,
            KeyState::Up => PortalKeyState::Released,
        };

        self.cmd_tx
            .send(SessionCmd::Key(InjectionCmd {
                keycode,
                state,
                queued_at: Instant::now(),
            }))
            .map_err(|_| PlatformError::Unavailable("RemoteDesktop session closed".into()))
    }

    fn finish(&self) -> usize {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.cmd_tx.send(SessionCmd::Flush(ack_tx)).is_ok() {
            // A dropped ack means the session thread is gone; its count is final.
            let _ = ack_rx.blocking_recv();
        }
        self.undelivered.swap(0, Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Async session task
// ---------------------------------------------------------------------------

async fn run_session(
    mut cmd_rx: mpsc::UnboundedReceiver<SessionCmd>,
    undelivered: Arc<AtomicUsize>,
) {
    if let Err(e) = session_loop(&mut cmd_rx, &undelivered).await {
        log::error!("executor: RemoteDesktop session failed: {e}");
    }
    abandon(&mut cmd_rx, &undelivered).await;
}

async fn session_loop(
    cmd_rx: &mut mpsc::UnboundedReceiver<SessionCmd>,
    undelivered: &AtomicUsize,
) -> Result<(), Box<dyn std::error::Error>> {
    let portal = RemoteDesktop::new().await?;
    let session = portal.create_session().await?;

    let saved_token = load_restore_token();
    portal
        .select_devices(
            &session,
            DeviceType::Keyboard.into(),
            saved_token.as_deref(),
            PersistMode::ExplicitlyRevoked,
        )
        .await?;

    let start_response = portal.start(&session, None).await?;
    if let Some(token) = start_response.response()?.restore_token() {
        save_restore_token(token);
    }

    log::info!("executor: RemoteDesktop session active");

    let portal = &portal;
    let session = &session;
    serve(cmd_rx, undelivered, move |keycode, state| {
        portal.notify_keyboard_keycode(session, keycode, state)
    })
    .await;

    log::info!("executor: command channel closed, exiting");
    Ok(())
}

/// Hands queued keys to `deliver` in order until the channel closes, counting
/// each delivery failure.
async fn serve<F, Fut, E>(
    cmd_rx: &mut mpsc::UnboundedReceiver<SessionCmd>,
    undelivered: &AtomicUsize,
    mut deliver: F,
) where
    F: FnMut(i32, PortalKeyState) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            SessionCmd::Key(cmd) => match deliver(cmd.keycode, cmd.state).await {
                Ok(()) => log::debug!(
                    "executor: injected keycode {} after {:.2}ms",
                    cmd.keycode,
                    cmd.queued_at.elapsed().as_secs_f64() * 1000.0
                ),
                Err(e) => {
                    log::warn!("executor: keycode {} not delivered: {e}", cmd.keycode);
                    undelivered.fetch_add(1, Ordering::SeqCst);
                }
            },
            SessionCmd::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
}

/// Closes the channel so further `inject()` calls fail, then counts every key
/// still queued as undelivered and releases any waiting `finish()`.
async fn abandon(
    cmd_rx: &mut mpsc::UnboundedReceiver<SessionCmd>,
    undelivered: &AtomicUsize,
) {
    cmd_rx.close();
    let mut dropped = 0;
    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            SessionCmd::Key(_) => {
                undelivered.fetch_add(1, Ordering::SeqCst);
                dropped += 1;
            }
            SessionCmd::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
    if dropped > 0 {
        log::warn!("executor: {dropped} queued keycode(s) dropped with the session");
    }
}

// ---------------------------------------------------------------------------
// Restore token
// ---------------------------------------------------------------------------

fn token_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(TOKEN_FILE))
}

fn load_restore_token() -> Option<String> {
    let path = token_path()?;
    let token = std::fs::read_to_string(&path).ok()?;
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    log::debug!("executor: loaded restore token from {}", path.display());
    Some(token.to_owned())
}

fn save_restore_token(token: &str) {
    let Some(path) = token_path() else { return };
    if let Some(dir) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(dir) {
            log::warn!("executor: could not create {}: {e}", dir.display());
            return;
        }
    }
    match std::fs::write(&path, token) {
        Ok(()) => log::debug!("executor: restore token saved to {}", path.display()),
        Err(e) => log::warn!("executor: could not save restore token: {e}"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{KeyCode, NativeKey};

    fn injector() -> (LinuxWaylandInjector, mpsc::UnboundedReceiver<SessionCmd>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        (
            LinuxWaylandInjector {
                cmd_tx,
                undelivered: Arc::new(AtomicUsize::new(0)),
            },
            cmd_rx,
        )
    }

    fn queued_keycodes(cmd_rx: &mut mpsc::UnboundedReceiver<SessionCmd>) -> Vec<i32> {
        std::iter::from_fn(|| cmd_rx.try_recv().ok())
            .filter_map(|cmd| match cmd {
                SessionCmd::Key(cmd) => Some(cmd.keycode),
                SessionCmd::Flush(_) => None,
            })
            .collect()
    }

    fn block_on<F: Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(future)
    }

    #[test]
    fn inject_queues_commands_in_order() {
        let (injector, mut cmd_rx) = injector();
        for (code, state) in [(30, KeyState::Down), (30, KeyState::Up), (48, KeyState::Down)] {
            let event = InputEvent::new(state, NativeKey::new(code), None);
            injector.inject(&event).unwrap();
        }
        assert_eq!(queued_keycodes(&mut cmd_rx), vec![30, 30, 48]);
    }

    #[test]
    fn key_state_maps_to_portal_state() {
        let (injector, mut cmd_rx) = injector();
        let up = InputEvent::new(KeyState::Up, NativeKey::new(30), Some(KeyCode::A));
        injector.inject(&up).unwrap();
        let Ok(SessionCmd::Key(cmd)) = cmd_rx.try_recv() else {
            panic!("expected a queued key");
        };
        assert!(matches!(cmd.state, PortalKeyState::Released));
    }

    #[test]
    fn many_events_are_never_dropped() {
        let (injector, mut cmd_rx) = injector();
        let event = InputEvent::new(KeyState::Down, NativeKey::new(57), None);
        for _ in 0..10_000 {
            injector.inject(&event).unwrap();
        }
        assert_eq!(queued_keycodes(&mut cmd_rx).len(), 10_000);
    }

    #[test]
    fn inject_on_closed_session_returns_error() {
        let (injector, cmd_rx) = injector();
        drop(cmd_rx);
        let event = InputEvent::new(KeyState::Down, NativeKey::new(30), None);
        assert!(matches!(
            injector.inject(&event),
            Err(PlatformError::Unavailable(_))
        ));
    }

    #[test]
    fn keys_queued_when_session_dies_are_reported_by_finish() {
        let (injector, mut cmd_rx) = injector();
        let event = InputEvent::new(KeyState::Down, NativeKey::new(30), None);
        for _ in 0..4 {
            injector.inject(&event).unwrap();
        }

        // The session never comes up; the backend abandons whatever is queued,
        // including the flush marker finish() is about to wait on.
        let counter = Arc::clone(&injector.undelivered);
        let session = thread::spawn(move || {
            thread::sleep(std::time::Duration::from_millis(50));
            block_on(abandon(&mut cmd_rx, &counter));
        });

        assert_eq!(injector.finish(), 4);
        session.join().unwrap();
        assert!(injector.inject(&event).is_err());
        assert_eq!(injector.finish(), 0, "count is handed out once");
    }

    #[test]
    fn finish_after_session_is_gone_still_reports_losses() {
        let (injector, mut cmd_rx) = injector();
        let event = InputEvent::new(KeyState::Up, NativeKey::new(48), None);
        injector.inject(&event).unwrap();
        injector.inject(&event).unwrap();

        block_on(abandon(&mut cmd_rx, &injector.undelivered));
        drop(cmd_rx);

        assert_eq!(injector.finish(), 2);
    }

    #[test]
    fn delivery_failures_are_counted_in_order() {
        let (injector, mut cmd_rx) = injector();
        for code in [30, 48, 46] {
            let event = InputEvent::new(KeyState::Down, NativeKey::new(code), None);
            injector.inject(&event).unwrap();
        }
        let (ack_tx, mut ack_rx) = oneshot::channel();
        injector.cmd_tx.send(SessionCmd::Flush(ack_tx)).unwrap();

        let counter = Arc::clone(&injector.undelivered);
        let delivered = std::cell::RefCell::new(Vec::new());
        let serving = serve(&mut cmd_rx, &counter, |keycode, _| {
            delivered.borrow_mut().push(keycode);
            async move {
                if keycode == 48 {
                    Err("compositor rejected the event")
                } else {
                    Ok(())
                }
            }
        });
        // serve() returns once the channel is closed.
        let LinuxWaylandInjector { cmd_tx, undelivered } = injector;
        drop(cmd_tx);
        block_on(serving);

        assert_eq!(*delivered.borrow(), vec![30, 48, 46]);
        assert!(ack_rx.try_recv().is_ok(), "flush answered after the keys");
        assert_eq!(undelivered.load(Ordering::SeqCst), 1);
    }
}
