//! Windows low-level keyboard hook using SetWindowsHookEx.

use crate::error::{Error, Result};
use crate::event::{HookDecision, KeyEvent};
use crate::hook::KeyHandler;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, PoisonError};
use windows::Win32::Foundation::{LPARAM, LRESULT, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, GetMessageW, HC_ACTION, HHOOK, KBDLLHOOKSTRUCT, LLKHF_INJECTED, MSG,
    PM_NOREMOVE, PeekMessageW, PostThreadMessageW, SetWindowsHookExW, UnhookWindowsHookEx,
    WH_KEYBOARD_LL, WM_KEYDOWN, WM_KEYUP, WM_QUIT, WM_SYSKEYDOWN, WM_SYSKEYUP,
};

use super::keycodes::vk_to_key;

// Wrapper for HHOOK to make it Send + Sync
#[derive(Clone, Copy)]
struct SendableHHOOK(HHOOK);

// SAFETY: HHOOK is an opaque handle owned by the OS; it carries no
// thread affinity for unhooking.
unsafe impl Send for SendableHHOOK {}
unsafe impl Sync for SendableHHOOK {}

/// Handler the callback consults.
static HANDLER: Mutex<Option<Arc<dyn KeyHandler>>> = Mutex::new(None);

static KEYBOARD_HOOK: Mutex<Option<SendableHHOOK>> = Mutex::new(None);

/// Message-loop thread, for posting WM_QUIT.
static THREAD_ID: AtomicU32 = AtomicU32::new(0);

/// Convert a hook message to a KeyEvent.
unsafe fn convert_event(wparam: WPARAM, lparam: LPARAM) -> Option<KeyEvent> {
    let kb = unsafe { *(lparam.0 as *const KBDLLHOOKSTRUCT) };
    let key = vk_to_key(kb.vkCode);

    let event = match wparam.0 as u32 {
        WM_KEYDOWN | WM_SYSKEYDOWN => KeyEvent::down(key, kb.vkCode),
        WM_KEYUP | WM_SYSKEYUP => KeyEvent::up(key, kb.vkCode),
        _ => return None,
    };

    if (kb.flags & LLKHF_INJECTED).0 != 0 {
        Some(event.as_injected())
    } else {
        Some(event)
    }
}

/// Keyboard hook callback. Runs on the message-loop thread and must return
/// quickly or Windows silently removes the hook.
unsafe extern "system" fn keyboard_callback(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code == HC_ACTION as i32 {
        if let Some(event) = unsafe { convert_event(wparam, lparam) } {
            let handler = HANDLER.lock().ok().and_then(|guard| guard.clone());
            if let Some(handler) = handler
                && handler.handle_key(&event) == HookDecision::Swallow
            {
                return LRESULT(1);
            }
        }
    }

    let hook = KEYBOARD_HOOK.lock().ok().and_then(|g| g.map(|h| h.0));
    unsafe { CallNextHookEx(hook, code, wparam, lparam) }
}

fn clear_statics() {
    *HANDLER.lock().unwrap_or_else(PoisonError::into_inner) = None;
    THREAD_ID.store(0, Ordering::SeqCst);
}

/// Install the hook and pump messages until [`stop_key_hook`] (blocking).
///
/// `ready` receives `Ok(())` once the hook is live, or the install error.
pub fn run_key_hook(handler: Arc<dyn KeyHandler>, ready: Sender<Result<()>>) -> Result<()> {
    *HANDLER.lock()? = Some(handler);

    // Force the thread's message queue to exist so WM_QUIT can be posted.
    let mut msg = MSG::default();
    unsafe {
        let _ = PeekMessageW(&mut msg, None, 0, 0, PM_NOREMOVE);
    }
    THREAD_ID.store(unsafe { GetCurrentThreadId() }, Ordering::SeqCst);

    let keyboard_hook =
        match unsafe { SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_callback), None, 0) } {
            Ok(hook) => hook,
            Err(e) => {
                clear_statics();
                let detail = format!("failed to set keyboard hook: {e}");
                let _ = ready.send(Err(Error::HookInstallFailed(detail.clone())));
                return Err(Error::HookInstallFailed(detail));
            }
        };
    *KEYBOARD_HOOK.lock()? = Some(SendableHHOOK(keyboard_hook));
    log::debug!("WH_KEYBOARD_LL hook installed");
    let _ = ready.send(Ok(()));

    unsafe { while GetMessageW(&mut msg, None, 0, 0).as_bool() {} }

    let unhooked = match KEYBOARD_HOOK
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take()
    {
        Some(hook) => unsafe { UnhookWindowsHookEx(hook.0) }
            .map_err(|e| Error::HookUninstallFailed(e.to_string())),
        None => Ok(()),
    };
    clear_statics();
    unhooked
}

/// Ask the message loop to exit.
pub fn stop_key_hook() -> Result<()> {
    let thread_id = THREAD_ID.load(Ordering::SeqCst);
    if thread_id == 0 {
        return Ok(());
    }
    unsafe { PostThreadMessageW(thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) }
        .map_err(|e| Error::HookUninstallFailed(format!("failed to post WM_QUIT: {e}")))
}
