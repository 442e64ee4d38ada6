//! X11 keyboard listening using XRecord.
//!
//! XRecord observes the event stream but cannot modify it, so a
//! [`HookDecision::Swallow`] is logged once and otherwise ignored: the
//! activation key's auto-repeat still reaches applications.

use crate::error::{Error, Result};
use crate::event::{HookDecision, KeyEvent};
use crate::hook::KeyHandler;
use std::os::raw::{c_char, c_int, c_uchar, c_ulong};
use std::ptr::{null, null_mut};
use std::sync::mpsc::Sender;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Once, PoisonError};
use std::thread;
use std::time::Duration;
use x11::xlib;
use x11::xrecord;

use super::state::keycode_down;
use crate::platform::linux::keycodes::keycode_to_key;

/// Handler the callback consults.
static HANDLER: Mutex<Option<Arc<dyn KeyHandler>>> = Mutex::new(None);

/// Set by `stop_key_hook`; the reply loop exits when it sees it.
static STOP: AtomicBool = AtomicBool::new(false);

/// How often the reply loop drains recorded data.
const REPLY_POLL: Duration = Duration::from_millis(2);

static SWALLOW_WARNING: Once = Once::new();

const FALSE: c_int = 0;

/// Leading bytes of a recorded core protocol event.
#[repr(C)]
struct XRecordDatum {
    type_: u8,
    code: u8,
}

fn convert_event(type_: c_int, code: u8) -> Option<KeyEvent> {
    let code = u32::from(code);
    let key = keycode_to_key(code);
    match type_ {
        t if t == xlib::KeyPress => Some(KeyEvent::down(key, code)),
        t if t == xlib::KeyRelease => {
            // Server auto-repeat emits release/press pairs while the key
            // is still physically down; only a real release counts.
            if keycode_down(code).unwrap_or(false) {
                None
            } else {
                Some(KeyEvent::up(key, code))
            }
        }
        _ => None,
    }
}

/// XRecord callback
unsafe extern "C" fn record_callback(
    _closure: *mut c_char,
    raw_data: *mut xrecord::XRecordInterceptData,
) {
    unsafe {
        let Some(data) = raw_data.as_ref() else {
            return;
        };

        if data.category == xrecord::XRecordFromServer
            && let Some(datum) = (data.data as *const XRecordDatum).as_ref()
            && let Some(event) = convert_event(datum.type_ as c_int, datum.code)
        {
            let handler = HANDLER.lock().ok().and_then(|guard| guard.clone());
            if let Some(handler) = handler
                && handler.handle_key(&event) == HookDecision::Swallow
            {
                SWALLOW_WARNING.call_once(|| {
                    log::warn!("XRecord cannot swallow events; auto-repeat will pass through");
                });
            }
        }

        xrecord::XRecordFreeData(raw_data);
    }
}

fn install_failed(ready: &Sender<Result<()>>, detail: &str) -> Result<()> {
    let _ = ready.send(Err(Error::HookInstallFailed(detail.into())));
    Err(Error::HookInstallFailed(detail.into()))
}

/// Run `process` until `stop_key_hook` is called. A stop requested before
/// the first pass is still honoured.
fn pump_until_stopped(mut process: impl FnMut()) {
    while !STOP.load(Ordering::SeqCst) {
        process();
        thread::sleep(REPLY_POLL);
    }
}

fn record(ready: &Sender<Result<()>>) -> Result<()> {
    unsafe {
        let dpy_data = xlib::XOpenDisplay(null());
        if dpy_data.is_null() {
            return install_failed(ready, "failed to open X display");
        }

        let extension_name = c"RECORD";
        let extension = xlib::XInitExtension(dpy_data, extension_name.as_ptr());
        if extension.is_null() {
            xlib::XCloseDisplay(dpy_data);
            return install_failed(ready, "XRecord extension not available");
        }

        let range = xrecord::XRecordAllocRange();
        if range.is_null() {
            xlib::XCloseDisplay(dpy_data);
            return install_failed(ready, "failed to allocate XRecord range");
        }
        (*range).device_events.first = xlib::KeyPress as c_uchar;
        (*range).device_events.last = xlib::KeyRelease as c_uchar;

        let mut clients: c_ulong = xrecord::XRecordAllClients;
        let mut ranges = [range];
        let context =
            xrecord::XRecordCreateContext(dpy_data, 0, &mut clients, 1, ranges.as_mut_ptr(), 1);
        xlib::XFree(range.cast());

        if context == 0 {
            xlib::XCloseDisplay(dpy_data);
            return install_failed(ready, "failed to create XRecord context");
        }

        let enabled = xrecord::XRecordEnableContextAsync(
            dpy_data,
            context,
            Some(record_callback),
            null_mut(),
        );
        if enabled == 0 {
            xrecord::XRecordFreeContext(dpy_data, context);
            xlib::XCloseDisplay(dpy_data);
            return install_failed(ready, "failed to enable XRecord context");
        }
        xlib::XSync(dpy_data, FALSE);
        log::debug!("XRecord context enabled");
        let _ = ready.send(Ok(()));

        pump_until_stopped(|| {
            xrecord::XRecordProcessReplies(dpy_data);
        });

        xrecord::XRecordDisableContext(dpy_data, context);
        xlib::XSync(dpy_data, FALSE);
        xrecord::XRecordFreeContext(dpy_data, context);
        xlib::XCloseDisplay(dpy_data);
        log::debug!("XRecord context disabled");
    }
    Ok(())
}

/// Record keyboard events until [`stop_key_hook`] (blocking).
///
/// `ready` receives `Ok(())` once the context is enabled, or the install
/// error.
pub fn run_key_hook(handler: Arc<dyn KeyHandler>, ready: Sender<Result<()>>) -> Result<()> {
    STOP.store(false, Ordering::SeqCst);
    *HANDLER.lock()? = Some(handler);
    let result = record(&ready);
    *HANDLER.lock().unwrap_or_else(PoisonError::into_inner) = None;
    result
}

/// Ask [`run_key_hook`] to disable its context and return.
pub fn stop_key_hook() -> Result<()> {
    STOP.store(true, Ordering::SeqCst);
    Ok(())
}
