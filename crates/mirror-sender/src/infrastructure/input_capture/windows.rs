//! Windows low-level keyboard and mouse hook implementation.
//!
//! This module installs WH_KEYBOARD_LL and WH_MOUSE_LL hooks using the
//! Windows API.  Both hooks share a dedicated Win32 message-loop thread.
//!
//! Hook procedures are plain `extern "system"` functions with no user data
//! pointer, so they reach the active source through a process-wide registry.
//! Only one capture source can be active per process.
//!
//! # Safety
//!
//! This module uses `unsafe` code exclusively for Windows API FFI calls.
//! All `unsafe` blocks are annotated with `// SAFETY:` comments.

#![cfg(target_os = "windows")]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex, OnceLock};
use std::thread::{self, JoinHandle};

use mirror_core::{InputEvent, MouseButton};
use windows::Win32::Foundation::{LPARAM, LRESULT, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, DispatchMessageW, GetMessageW, PeekMessageW, PostThreadMessageW,
    SetWindowsHookExW, UnhookWindowsHookEx, HC_ACTION, KBDLLHOOKSTRUCT, MSG, MSLLHOOKSTRUCT,
    PM_NOREMOVE, WH_KEYBOARD_LL, WH_MOUSE_LL, WM_KEYDOWN, WM_KEYUP, WM_LBUTTONDOWN,
    WM_LBUTTONUP, WM_MBUTTONDOWN, WM_MBUTTONUP, WM_MOUSEMOVE, WM_MOUSEWHEEL, WM_QUIT,
    WM_RBUTTONDOWN, WM_RBUTTONUP, WM_SYSKEYDOWN, WM_SYSKEYUP, WM_USER,
};

use super::{CaptureCallback, CaptureError, CaptureSource};

/// State the hook procedures need while a source is running.
struct HookShared {
    callback: CaptureCallback,
    paused: Arc<AtomicBool>,
}

static ACTIVE: OnceLock<Mutex<Option<Arc<HookShared>>>> = OnceLock::new();

fn registry() -> &'static Mutex<Option<Arc<HookShared>>> {
    ACTIVE.get_or_init(|| Mutex::new(None))
}

fn dispatch(event: InputEvent) {
    let shared = registry().lock().ok().and_then(|guard| guard.clone());
    if let Some(shared) = shared {
        if !shared.paused.load(Ordering::SeqCst) {
            (shared.callback)(event);
        }
    }
}

struct HookThread {
    thread_id: u32,
    join: JoinHandle<()>,
}

/// Windows low-level input capture source.
pub struct WindowsCaptureSource {
    worker: Mutex<Option<HookThread>>,
    paused: Arc<AtomicBool>,
}

impl WindowsCaptureSource {
    /// Creates a new (unstarted) source.
    pub fn new() -> Self {
        Self {
            worker: Mutex::new(None),
            paused: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Default for WindowsCaptureSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSource for WindowsCaptureSource {
    fn start(&self, callback: CaptureCallback) -> Result<(), CaptureError> {
        let mut worker = self
            .worker
            .lock()
            .map_err(|_| CaptureError::HookInstallFailed("capture state poisoned".to_string()))?;
        if worker.is_some() {
            return Err(CaptureError::AlreadyRunning);
        }

        {
            let mut active = registry()
                .lock()
                .map_err(|_| CaptureError::HookInstallFailed("hook registry poisoned".to_string()))?;
            if active.is_some() {
                return Err(CaptureError::AlreadyRunning);
            }
            self.paused.store(false, Ordering::SeqCst);
            *active = Some(Arc::new(HookShared {
                callback,
                paused: Arc::clone(&self.paused),
            }));
        }

        let (ready_tx, ready_rx) = mpsc::channel::<Result<u32, String>>();
        let join = thread::Builder::new()
            .name("mirror-hook-loop".to_string())
            .spawn(move || run_hook_message_loop(ready_tx))
            .map_err(|e| {
                clear_registry();
                CaptureError::HookInstallFailed(e.to_string())
            })?;

        match ready_rx.recv() {
            Ok(Ok(thread_id)) => {
                tracing::info!("Input hooks installed");
                *worker = Some(HookThread { thread_id, join });
                Ok(())
            }
            Ok(Err(reason)) => {
                let _ = join.join();
                clear_registry();
                Err(CaptureError::HookInstallFailed(reason))
            }
            Err(_) => {
                let _ = join.join();
                clear_registry();
                Err(CaptureError::HookInstallFailed(
                    "hook thread exited during start-up".to_string(),
                ))
            }
        }
    }

    fn stop(&self) {
        let hook_thread = match self.worker.lock() {
            Ok(mut worker) => worker.take(),
            Err(_) => None,
        };
        let Some(hook_thread) = hook_thread else {
            return;
        };

        // SAFETY: posting WM_QUIT to a thread id we obtained from that thread.
        let posted = unsafe {
            PostThreadMessageW(hook_thread.thread_id, WM_QUIT, WPARAM(0), LPARAM(0))
        };
        if let Err(e) = posted {
            tracing::warn!("Failed to post WM_QUIT to hook thread: {e}");
        }
        if hook_thread.join.join().is_err() {
            tracing::warn!("Hook thread panicked");
        }
        clear_registry();
        tracing::info!("Input hooks removed");
    }

    fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.worker.lock().map(|w| w.is_some()).unwrap_or(false)
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

impl Drop for WindowsCaptureSource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn clear_registry() {
    if let Ok(mut active) = registry().lock() {
        *active = None;
    }
}

/// Entry point for the dedicated Win32 message loop thread.
fn run_hook_message_loop(ready: mpsc::Sender<Result<u32, String>>) {
    let mut msg = MSG::default();

    // SAFETY: PeekMessageW forces creation of this thread's message queue so
    // that PostThreadMessageW(WM_QUIT) from `stop()` cannot be lost.
    unsafe {
        let _ = PeekMessageW(&mut msg, None, WM_USER, WM_USER, PM_NOREMOVE);
    }

    // SAFETY: SetWindowsHookExW requires the calling thread to run a message
    // loop, which it does below.
    let kbd_hook = match unsafe { SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_hook_proc), None, 0) } {
        Ok(h) => h,
        Err(e) => {
            let _ = ready.send(Err(format!("WH_KEYBOARD_LL: {e}")));
            return;
        }
    };
    let mouse_hook = match unsafe { SetWindowsHookExW(WH_MOUSE_LL, Some(mouse_hook_proc), None, 0) } {
        Ok(h) => h,
        Err(e) => {
            // SAFETY: kbd_hook was installed by this thread.
            unsafe {
                let _ = UnhookWindowsHookEx(kbd_hook);
            }
            let _ = ready.send(Err(format!("WH_MOUSE_LL: {e}")));
            return;
        }
    };

    // SAFETY: trivial FFI call with no arguments.
    let thread_id = unsafe { GetCurrentThreadId() };
    let _ = ready.send(Ok(thread_id));

    // SAFETY: Standard Win32 GetMessage/DispatchMessage loop pattern.  The
    // loop ends when WM_QUIT arrives (GetMessageW returns 0) or on error (-1).
    unsafe {
        while GetMessageW(&mut msg, None, 0, 0).0 > 0 {
            DispatchMessageW(&msg);
        }
        let _ = UnhookWindowsHookEx(kbd_hook);
        let _ = UnhookWindowsHookEx(mouse_hook);
    }
}

/// Low-level keyboard hook callback.
///
/// # Safety
///
/// Called by Windows from the hook message loop thread; must return quickly.
unsafe extern "system" fn keyboard_hook_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    if n_code == HC_ACTION as i32 {
        // SAFETY: l_param points to a KBDLLHOOKSTRUCT when n_code == HC_ACTION.
        let kbs = &*(l_param.0 as *const KBDLLHOOKSTRUCT);
        let ts = u64::from(kbs.time);

        let event = match w_param.0 as u32 {
            WM_KEYDOWN | WM_SYSKEYDOWN => Some(InputEvent::key_down(kbs.vkCode, kbs.scanCode, ts)),
            WM_KEYUP | WM_SYSKEYUP => Some(InputEvent::key_up(kbs.vkCode, kbs.scanCode, ts)),
            _ => None,
        };
        if let Some(event) = event {
            dispatch(event);
        }
    }

    // SAFETY: Forward the event to the next hook in the chain.
    CallNextHookEx(None, n_code, w_param, l_param)
}

/// Low-level mouse hook callback.
///
/// # Safety
///
/// Called by Windows from the hook message loop thread; must return quickly.
unsafe extern "system" fn mouse_hook_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    if n_code == HC_ACTION as i32 {
        // SAFETY: l_param points to a MSLLHOOKSTRUCT when n_code == HC_ACTION.
        let mhs = &*(l_param.0 as *const MSLLHOOKSTRUCT);
        let (x, y) = (mhs.pt.x, mhs.pt.y);
        let ts = u64::from(mhs.time);

        let event = match w_param.0 as u32 {
            WM_MOUSEMOVE => Some(InputEvent::mouse_move(x, y, ts)),
            WM_LBUTTONDOWN => Some(InputEvent::mouse_button(MouseButton::Left, true, x, y, ts)),
            WM_LBUTTONUP => Some(InputEvent::mouse_button(MouseButton::Left, false, x, y, ts)),
            WM_RBUTTONDOWN => Some(InputEvent::mouse_button(MouseButton::Right, true, x, y, ts)),
            WM_RBUTTONUP => Some(InputEvent::mouse_button(MouseButton::Right, false, x, y, ts)),
            WM_MBUTTONDOWN => Some(InputEvent::mouse_button(MouseButton::Middle, true, x, y, ts)),
            WM_MBUTTONUP => Some(InputEvent::mouse_button(MouseButton::Middle, false, x, y, ts)),
            WM_MOUSEWHEEL => {
                // The high word of mouseData is the signed wheel delta.
                let delta = i32::from((mhs.mouseData >> 16) as u16 as i16);
                Some(InputEvent::mouse_wheel(delta, x, y, ts))
            }
            _ => None,
        };
        if let Some(event) = event {
            dispatch(event);
        }
    }

    // SAFETY: Forward to the next hook in the chain.
    CallNextHookEx(None, n_code, w_param, l_param)
}
