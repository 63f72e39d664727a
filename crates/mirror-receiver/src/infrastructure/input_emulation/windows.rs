//! Windows input emulation via the SendInput API.
//!
//! Keys are injected by scan code (with the virtual-key code alongside) so
//! layout-dependent keys land on the same physical key as on the sender.
//! Mouse moves arrive already normalized to the absolute `0..=65536` grid and
//! are injected with `MOUSEEVENTF_VIRTUALDESK` so they span every monitor.

#![cfg(target_os = "windows")]

use mirror_core::MouseButton;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE, KEYBDINPUT, KEYBD_EVENT_FLAGS,
    KEYEVENTF_EXTENDEDKEY, KEYEVENTF_KEYUP, KEYEVENTF_SCANCODE, MOUSEEVENTF_ABSOLUTE,
    MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP, MOUSEEVENTF_MIDDLEDOWN, MOUSEEVENTF_MIDDLEUP,
    MOUSEEVENTF_MOVE, MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP, MOUSEEVENTF_VIRTUALDESK,
    MOUSEEVENTF_WHEEL, MOUSEINPUT, MOUSE_EVENT_FLAGS, VIRTUAL_KEY,
};

use crate::application::replay_input::{EmulationError, PlatformInputEmulator};

/// Scan codes with this prefix belong to the extended key set
/// (arrows, Insert/Delete, Home/End, PageUp/PageDown, numpad Enter).
const EXTENDED_SCAN_PREFIX: u32 = 0xE000;

/// Windows implementation of [`PlatformInputEmulator`] using SendInput.
pub struct WindowsInputEmulator;

impl WindowsInputEmulator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WindowsInputEmulator {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformInputEmulator for WindowsInputEmulator {
    fn emit_key_down(&self, vk_code: u32, scan_code: u32) -> Result<(), EmulationError> {
        send_key(vk_code, scan_code, false)
    }

    fn emit_key_up(&self, vk_code: u32, scan_code: u32) -> Result<(), EmulationError> {
        send_key(vk_code, scan_code, true)
    }

    fn emit_mouse_move(&self, nx: i32, ny: i32) -> Result<(), EmulationError> {
        send_mouse(
            nx,
            ny,
            0,
            MOUSEEVENTF_MOVE | MOUSEEVENTF_ABSOLUTE | MOUSEEVENTF_VIRTUALDESK,
        )
    }

    fn emit_mouse_button(&self, button: MouseButton, pressed: bool) -> Result<(), EmulationError> {
        let flags = match (button, pressed) {
            (MouseButton::Left, true) => MOUSEEVENTF_LEFTDOWN,
            (MouseButton::Left, false) => MOUSEEVENTF_LEFTUP,
            (MouseButton::Right, true) => MOUSEEVENTF_RIGHTDOWN,
            (MouseButton::Right, false) => MOUSEEVENTF_RIGHTUP,
            (MouseButton::Middle, true) => MOUSEEVENTF_MIDDLEDOWN,
            (MouseButton::Middle, false) => MOUSEEVENTF_MIDDLEUP,
        };
        send_mouse(0, 0, 0, flags)
    }

    fn emit_mouse_wheel(&self, delta: i32) -> Result<(), EmulationError> {
        // mouseData carries the signed delta reinterpreted as a DWORD.
        send_mouse(0, 0, delta as u32, MOUSEEVENTF_WHEEL)
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn key_flags(scan_code: u32, key_up: bool) -> KEYBD_EVENT_FLAGS {
    let mut flags = KEYEVENTF_SCANCODE;
    if key_up {
        flags |= KEYEVENTF_KEYUP;
    }
    if scan_code & EXTENDED_SCAN_PREFIX != 0 {
        flags |= KEYEVENTF_EXTENDEDKEY;
    }
    flags
}

fn send_key(vk_code: u32, scan_code: u32, key_up: bool) -> Result<(), EmulationError> {
    let input = INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: VIRTUAL_KEY(vk_code as u16),
                wScan: scan_code as u16,
                dwFlags: key_flags(scan_code, key_up),
                time: 0,
                dwExtraInfo: 0,
            },
        },
    };
    dispatch(input)
}

fn send_mouse(
    dx: i32,
    dy: i32,
    mouse_data: u32,
    flags: MOUSE_EVENT_FLAGS,
) -> Result<(), EmulationError> {
    let input = INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: INPUT_0 {
            mi: MOUSEINPUT {
                dx,
                dy,
                mouseData: mouse_data,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    };
    dispatch(input)
}

fn dispatch(input: INPUT) -> Result<(), EmulationError> {
    // SAFETY: `input` is a fully initialised INPUT structure on the stack and
    // the size argument matches its type.
    let injected = unsafe { SendInput(&[input], std::mem::size_of::<INPUT>() as i32) };
    if injected == 1 {
        Ok(())
    } else {
        Err(EmulationError::Platform(
            "SendInput injected no events (blocked by UIPI or a secure desktop?)".to_string(),
        ))
    }
}
