//! Input-event record carried inside `key` and `mouse` envelopes.
//!
//! # Wire shape
//!
//! ```json
//! {"t":2,"vk":0,"sc":0,"x":960,"y":540,"btn":0,"wd":0,"ts":123456}
//! ```
//!
//! | key  | field          | notes                                       |
//! |------|----------------|---------------------------------------------|
//! | `t`  | kind           | required, see [`InputEventKind`]            |
//! | `vk` | virtual key    | key events                                  |
//! | `sc` | scan code      | key events                                  |
//! | `x`  | pointer x      | mouse events, sender's screen pixels        |
//! | `y`  | pointer y      | mouse events, sender's screen pixels        |
//! | `btn`| button id      | 0 left, 1 right, 2 middle                   |
//! | `wd` | wheel delta    | multiples of 120 per notch                  |
//! | `ts` | timestamp (ms) | sender clock, informational only            |
//!
//! Every field except `t` may be omitted and then defaults to zero.

use serde::{Deserialize, Serialize};

/// The kind of an input event and its numeric wire code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum InputEventKind {
    #[default]
    KeyDown = 0,
    KeyUp = 1,
    MouseMove = 2,
    MouseButtonDown = 3,
    MouseButtonUp = 4,
    MouseWheel = 5,
}

impl InputEventKind {
    /// Returns `true` for keyboard kinds, which travel in `key` frames.
    /// Every other kind travels in `mouse` frames.
    pub fn is_key(self) -> bool {
        matches!(self, InputEventKind::KeyDown | InputEventKind::KeyUp)
    }
}

impl TryFrom<u8> for InputEventKind {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(InputEventKind::KeyDown),
            1 => Ok(InputEventKind::KeyUp),
            2 => Ok(InputEventKind::MouseMove),
            3 => Ok(InputEventKind::MouseButtonDown),
            4 => Ok(InputEventKind::MouseButtonUp),
            5 => Ok(InputEventKind::MouseWheel),
            _ => Err(()),
        }
    }
}

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MouseButton {
    Left = 0,
    Right = 1,
    Middle = 2,
}

impl TryFrom<u8> for MouseButton {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MouseButton::Left),
            1 => Ok(MouseButton::Right),
            2 => Ok(MouseButton::Middle),
            _ => Err(()),
        }
    }
}

/// One captured keyboard or mouse event.
///
/// Fields that do not apply to `kind` are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputEvent {
    pub kind: InputEventKind,
    pub vk_code: u32,
    pub scan_code: u32,
    pub x: i32,
    pub y: i32,
    pub button: u8,
    pub wheel_delta: i32,
    pub timestamp_ms: u64,
}

impl InputEvent {
    pub fn key_down(vk_code: u32, scan_code: u32, timestamp_ms: u64) -> Self {
        Self {
            kind: InputEventKind::KeyDown,
            vk_code,
            scan_code,
            timestamp_ms,
            ..Self::default()
        }
    }

    pub fn key_up(vk_code: u32, scan_code: u32, timestamp_ms: u64) -> Self {
        Self {
            kind: InputEventKind::KeyUp,
            ..Self::key_down(vk_code, scan_code, timestamp_ms)
        }
    }

    pub fn mouse_move(x: i32, y: i32, timestamp_ms: u64) -> Self {
        Self {
            kind: InputEventKind::MouseMove,
            x,
            y,
            timestamp_ms,
            ..Self::default()
        }
    }

    pub fn mouse_button(
        button: MouseButton,
        pressed: bool,
        x: i32,
        y: i32,
        timestamp_ms: u64,
    ) -> Self {
        Self {
            kind: if pressed {
                InputEventKind::MouseButtonDown
            } else {
                InputEventKind::MouseButtonUp
            },
            x,
            y,
            button: button as u8,
            timestamp_ms,
            ..Self::default()
        }
    }

    pub fn mouse_wheel(wheel_delta: i32, x: i32, y: i32, timestamp_ms: u64) -> Self {
        Self {
            kind: InputEventKind::MouseWheel,
            x,
            y,
            wheel_delta,
            timestamp_ms,
            ..Self::default()
        }
    }
}

/// Result of [`deserialize_event`].
///
/// When `valid` is `false`, `event` is the zero-valued default and must not be
/// replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedEvent {
    pub event: InputEvent,
    pub valid: bool,
}

impl DecodedEvent {
    fn invalid() -> Self {
        Self {
            event: InputEvent::default(),
            valid: false,
        }
    }

    /// Returns the event if it decoded successfully.
    pub fn into_valid(self) -> Option<InputEvent> {
        self.valid.then_some(self.event)
    }
}

// Integer-only wire record.  Out-of-range numbers fail deserialization.
#[derive(Serialize, Deserialize)]
struct EventRecord {
    t: u8,
    #[serde(default)]
    vk: u32,
    #[serde(default)]
    sc: u32,
    #[serde(default)]
    x: i32,
    #[serde(default)]
    y: i32,
    #[serde(default)]
    btn: u8,
    #[serde(default)]
    wd: i32,
    #[serde(default)]
    ts: u64,
}

/// Serializes `event` into its compact JSON record.
pub fn serialize_event(event: &InputEvent) -> String {
    let record = EventRecord {
        t: event.kind as u8,
        vk: event.vk_code,
        sc: event.scan_code,
        x: event.x,
        y: event.y,
        btn: event.button,
        wd: event.wheel_delta,
        ts: event.timestamp_ms,
    };
    // A struct of plain integers always serializes.
    serde_json::to_string(&record).unwrap_or_default()
}

/// Parses a JSON record produced by [`serialize_event`].
///
/// Never fails: bad JSON, a missing or unknown `t`, an out-of-range value or
/// an unknown button id all yield an invalid [`DecodedEvent`].
pub fn deserialize_event(bytes: &[u8]) -> DecodedEvent {
    let record: EventRecord = match serde_json::from_slice(bytes) {
        Ok(record) => record,
        Err(e) => {
            tracing::debug!("Dropping unparseable event record: {e}");
            return DecodedEvent::invalid();
        }
    };

    let Ok(kind) = InputEventKind::try_from(record.t) else {
        tracing::debug!("Dropping event record with unknown kind {}", record.t);
        return DecodedEvent::invalid();
    };

    if MouseButton::try_from(record.btn).is_err() {
        tracing::debug!("Dropping event record with unknown button {}", record.btn);
        return DecodedEvent::invalid();
    }

    DecodedEvent {
        event: InputEvent {
            kind,
            vk_code: record.vk,
            scan_code: record.sc,
            x: record.x,
            y: record.y,
            button: record.btn,
            wheel_delta: record.wd,
            timestamp_ms: record.ts,
        },
        valid: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_uses_short_keys() {
        // Arrange
        let event = InputEvent::mouse_move(960, 540, 42);

        // Act
        let json = serialize_event(&event);

        // Assert
        assert_eq!(
            json,
            r#"{"t":2,"vk":0,"sc":0,"x":960,"y":540,"btn":0,"wd":0,"ts":42}"#
        );
    }

    #[test]
    fn test_round_trip_of_each_kind() {
        let events = [
            InputEvent::key_down(0x41, 0x1E, 1),
            InputEvent::key_up(0x41, 0x1E, 2),
            InputEvent::mouse_move(-1200, 300, 3),
            InputEvent::mouse_button(MouseButton::Right, true, 10, 20, 4),
            InputEvent::mouse_button(MouseButton::Middle, false, 10, 20, 5),
            InputEvent::mouse_wheel(-120, 0, 0, 6),
        ];

        for event in events {
            let decoded = deserialize_event(serialize_event(&event).as_bytes());
            assert_eq!(decoded.into_valid(), Some(event));
        }
    }

    #[test]
    fn test_missing_optional_fields_default_to_zero() {
        let decoded = deserialize_event(br#"{"t":1,"vk":13}"#);
        assert!(decoded.valid);
        assert_eq!(decoded.event, InputEvent::key_up(13, 0, 0));
    }

    #[test]
    fn test_missing_kind_is_invalid() {
        let decoded = deserialize_event(br#"{"vk":13}"#);
        assert!(!decoded.valid);
        assert_eq!(decoded.event, InputEvent::default());
    }

    #[test]
    fn test_unknown_kind_is_invalid() {
        assert!(!deserialize_event(br#"{"t":9}"#).valid);
    }

    #[test]
    fn test_out_of_range_values_are_invalid() {
        // Arrange – x does not fit in i32, vk is negative
        let too_wide = br#"{"t":2,"x":4294967296}"#;
        let negative_vk = br#"{"t":0,"vk":-1}"#;

        // Act / Assert
        assert!(!deserialize_event(too_wide).valid);
        assert!(!deserialize_event(negative_vk).valid);
    }

    #[test]
    fn test_unknown_button_is_invalid() {
        assert!(!deserialize_event(br#"{"t":3,"btn":7}"#).valid);
    }

    #[test]
    fn test_garbage_is_invalid() {
        assert!(!deserialize_event(b"\xff\x00garbage").valid);
        assert!(!deserialize_event(b"").valid);
    }

    #[test]
    fn test_only_key_kinds_are_key() {
        assert!(InputEventKind::KeyDown.is_key());
        assert!(InputEventKind::KeyUp.is_key());
        assert!(!InputEventKind::MouseWheel.is_key());
        assert!(!InputEventKind::MouseButtonDown.is_key());
    }
}
