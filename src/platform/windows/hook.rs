//! Windows keyboard monitor via WH_KEYBOARD_LL (low-level keyboard hook).
//!
//! `WindowsHook` implements `InputHook`. `install()` spawns a background
//! thread that installs the hook and runs a `GetMessageW` loop (required for
//! low-level hooks to deliver events). `remove()` uninstalls the hook and posts
//! `WM_QUIT` to exit the message loop, then joins the thread.
//!
//! The hook proc always calls `CallNextHookEx`: events are observed, never
//! suppressed or altered.
//!
//! Callback storage: `WH_KEYBOARD_LL` hook procs receive no `user_info`
//! pointer, so the callback is stored in a process-global `Mutex`.
//! Only one `WindowsHook` can be installed per process.

use std::ptr;
use std::sync::mpsc;
use std::sync::Mutex;
use std::thread::{self, JoinHandle};

use windows_sys::Win32::Foundation::{LPARAM, LRESULT, WPARAM};
use windows_sys::Win32::System::Threading::GetCurrentThreadId;
use windows_sys::Win32::UI::Input::KeyboardAndMouse::{
    GetAsyncKeyState, VK_CONTROL, VK_LWIN, VK_MENU, VK_RWIN, VK_SHIFT,
};
use windows_sys::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, GetForegroundWindow, GetMessageW, PostThreadMessageW, SetWindowsHookExW,
    UnhookWindowsHookEx, HC_ACTION, HHOOK, KBDLLHOOKSTRUCT, LLKHF_EXTENDED, MSG,
    WH_KEYBOARD_LL, WM_KEYDOWN, WM_KEYUP, WM_QUIT, WM_SYSKEYDOWN, WM_SYSKEYUP,
};

use super::keycodes::vkcode_to_keycode;
use crate::platform::{
    check_active, HookCallback, HookHandle, InputEvent, InputHook, KeyState, Modifiers,
    NativeKey, PlatformError, WindowContext,
};

/// The active hook callback. At most one `WindowsHook` is installed at a time.
static HOOK_CALLBACK: Mutex<Option<HookCallback>> = Mutex::new(None);

/// Windows keyboard monitor using `WH_KEYBOARD_LL`.
pub struct WindowsHook {
    active: Option<HookHandle>,
    /// Handle returned by `SetWindowsHookExW`. Stored as isize for Send.
    hook: Option<isize>,
    /// Thread ID of the message-loop thread; used for `PostThreadMessageW`.
    thread_id: u32,
    thread: Option<JoinHandle<()>>,
}

impl WindowsHook {
    pub fn new() -> Self {
        Self {
            active: None,
            hook: None,
            thread_id: 0,
            thread: None,
        }
    }

    fn shutdown(&mut self) {
        // Unhook first so no further callbacks fire after this returns.
        if let Some(hook) = self.hook.take() {
            unsafe { UnhookWindowsHookEx(hook as HHOOK) };
        }

        let _ = HOOK_CALLBACK.lock().map(|mut g| *g = None);

        if self.thread_id != 0 {
            unsafe { PostThreadMessageW(self.thread_id, WM_QUIT, 0, 0) };
            self.thread_id = 0;
        }

        if let Some(t) = self.thread.take() {
            let _ = t.join();
        }
    }
}

impl InputHook for WindowsHook {
    fn install(&mut self, callback: HookCallback) -> Result<HookHandle, PlatformError> {
        if self.active.is_some() {
            return Err(PlatformError::AlreadyInstalled);
        }

        {
            let mut guard = HOOK_CALLBACK
                .lock()
                .map_err(|_| PlatformError::Other("callback mutex poisoned".into()))?;
            if guard.is_some() {
                // Another WindowsHook in this process owns the global slot.
                return Err(PlatformError::AlreadyInstalled);
            }
            *guard = Some(callback);
        }

        // The thread reports (hook handle, thread id) once the hook is in place.
        let (info_tx, info_rx) = mpsc::channel::<Result<(isize, u32), PlatformError>>();

        let thread = thread::spawn(move || {
            let hook =
                unsafe { SetWindowsHookExW(WH_KEYBOARD_LL, Some(hook_proc), ptr::null_mut(), 0) };

            if hook.is_null() {
                let _ = info_tx.send(Err(PlatformError::Other(
                    "SetWindowsHookExW failed".into(),
                )));
                return;
            }

            let thread_id = unsafe { GetCurrentThreadId() };
            let _ = info_tx.send(Ok((hook as isize, thread_id)));

            log::info!("capture: WH_KEYBOARD_LL monitor active");

            // Returns 0 on WM_QUIT, -1 on error; both exit the loop.
            unsafe {
                let mut msg: MSG = std::mem::zeroed();
                while GetMessageW(&mut msg, ptr::null_mut(), 0, 0) > 0 {}
            }

            log::debug!("capture: message loop exited");
        });

        match info_rx.recv() {
            Ok(Ok((hook, thread_id))) => {
                let handle = HookHandle::next();
                self.active = Some(handle);
                self.hook = Some(hook);
                self.thread_id = thread_id;
                self.thread = Some(thread);
                Ok(handle)
            }
            Ok(Err(e)) => {
                let _ = HOOK_CALLBACK.lock().map(|mut g| *g = None);
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = HOOK_CALLBACK.lock().map(|mut g| *g = None);
                Err(PlatformError::Other(
                    "capture thread exited before reporting hook status".into(),
                ))
            }
        }
    }

    fn remove(&mut self, handle: HookHandle) -> Result<(), PlatformError> {
        check_active(self.active, handle)?;
        self.shutdown();
        self.active = None;
        log::info!("capture: WH_KEYBOARD_LL monitor removed");
        Ok(())
    }
}

impl Drop for WindowsHook {
    fn drop(&mut self) {
        if self.active.take().is_some() {
            self.shutdown();
        }
    }
}

// ---------------------------------------------------------------------------
// Hook procedure
// ---------------------------------------------------------------------------

/// Low-level keyboard hook proc, called on the message-loop thread.
///
/// Copies the event into an `InputEvent`, hands it to the callback, and always
/// forwards the original via `CallNextHookEx`.
unsafe extern "system" fn hook_proc(n_code: i32, w_param: WPARAM, l_param: LPARAM) -> LRESULT {
    if n_code == HC_ACTION as i32 {
        let kb = &*(l_param as *const KBDLLHOOKSTRUCT);
        if let Some(state) = key_state(w_param as u32) {
            observe(kb, state);
        }
    }
    CallNextHookEx(ptr::null_mut(), n_code, w_param, l_param)
}

fn key_state(message: u32) -> Option<KeyState> {
    match message {
        WM_KEYDOWN | WM_SYSKEYDOWN => Some(KeyState::Down),
        WM_KEYUP | WM_SYSKEYUP => Some(KeyState::Up),
        _ => None,
    }
}

unsafe fn observe(kb: &KBDLLHOOKSTRUCT, state: KeyState) {
    let extended = kb.flags & LLKHF_EXTENDED != 0;
    let native = NativeKey {
        code: kb.vkCode,
        scan: kb.scanCode,
        extended,
    };
    let key = vkcode_to_keycode(kb.vkCode as u16, extended);
    let window = WindowContext {
        id: Some(GetForegroundWindow() as usize as u64),
    };
    let event = InputEvent::new(state, native, key)
        .with_modifiers(held_modifiers())
        .with_window(window);

    if let Ok(guard) = HOOK_CALLBACK.lock() {
        if let Some(cb) = guard.as_ref() {
            cb(event);
        }
    }
}

/// Reads the physical modifier state. Inside a low-level hook this still
/// reflects the state before the event being processed.
unsafe fn held_modifiers() -> Modifiers {
    let down = |vk: u16| GetAsyncKeyState(i32::from(vk)) < 0;
    Modifiers {
        ctrl: down(VK_CONTROL),
        shift: down(VK_SHIFT),
        alt: down(VK_MENU),
        meta: down(VK_LWIN) || down(VK_RWIN),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
