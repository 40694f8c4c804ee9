//! macOS virtual key code (CGKeyCode) naming and modifier flag conversion.
//!
//! Key codes are physical key positions per Apple HIToolbox/Events.h and are
//! layout-independent; names assume an ANSI keyboard. Left and right modifier
//! variants both name the canonical `KeyCode`.

use crate::platform::{KeyCode, KeyState, Modifiers};

// CGEventFlags device-independent modifier masks.
const FLAG_SHIFT: u64 = 0x0002_0000;
const FLAG_CONTROL: u64 = 0x0004_0000;
const FLAG_ALTERNATE: u64 = 0x0008_0000;
const FLAG_COMMAND: u64 = 0x0010_0000;

#[rustfmt::skip]
const CG_KEYS: &[(u16, KeyCode)] = &[
    (0x00, KeyCode::A), (0x0B, KeyCode::B), (0x08, KeyCode::C), (0x02, KeyCode::D),
    (0x0E, KeyCode::E), (0x03, KeyCode::F), (0x05, KeyCode::G), (0x04, KeyCode::H),
    (0x22, KeyCode::I), (0x26, KeyCode::J), (0x28, KeyCode::K), (0x25, KeyCode::L),
    (0x2E, KeyCode::M), (0x2D, KeyCode::N), (0x1F, KeyCode::O), (0x23, KeyCode::P),
    (0x0C, KeyCode::Q), (0x0F, KeyCode::R), (0x01, KeyCode::S), (0x11, KeyCode::T),
    (0x20, KeyCode::U), (0x09, KeyCode::V), (0x0D, KeyCode::W), (0x07, KeyCode::X),
    (0x10, KeyCode::Y), (0x06, KeyCode::Z),
    (0x1D, KeyCode::Key0), (0x12, KeyCode::Key1), (0x13, KeyCode::Key2), (0x14, KeyCode::Key3),
    (0x15, KeyCode::Key4), (0x17, KeyCode::Key5), (0x16, KeyCode::Key6), (0x1A, KeyCode::Key7),
    (0x1C, KeyCode::Key8), (0x19, KeyCode::Key9),
    (0x7A, KeyCode::F1), (0x78, KeyCode::F2), (0x63, KeyCode::F3), (0x76, KeyCode::F4),
    (0x60, KeyCode::F5), (0x61, KeyCode::F6), (0x62, KeyCode::F7), (0x64, KeyCode::F8),
    (0x65, KeyCode::F9), (0x6D, KeyCode::F10), (0x67, KeyCode::F11), (0x6F, KeyCode::F12),
    (0x69, KeyCode::F13), (0x6B, KeyCode::F14), (0x71, KeyCode::F15), (0x6A, KeyCode::F16),
    (0x40, KeyCode::F17), (0x4F, KeyCode::F18), (0x50, KeyCode::F19), (0x5A, KeyCode::F20),
    (0x3B, KeyCode::Ctrl), (0x3E, KeyCode::Ctrl),
    (0x38, KeyCode::Shift), (0x3C, KeyCode::Shift),
    (0x3A, KeyCode::Alt), (0x3D, KeyCode::Alt),
    (0x37, KeyCode::Meta), (0x36, KeyCode::Meta),
    (0x31, KeyCode::Space), (0x24, KeyCode::Enter), (0x30, KeyCode::Tab), (0x35, KeyCode::Escape),
    // kVK_Delete is Backspace; kVK_ForwardDelete is Delete; kVK_Help sits where Insert does
    (0x33, KeyCode::Backspace), (0x75, KeyCode::Delete), (0x72, KeyCode::Insert),
    (0x73, KeyCode::Home), (0x77, KeyCode::End), (0x74, KeyCode::PageUp), (0x79, KeyCode::PageDown),
    (0x7E, KeyCode::Up), (0x7D, KeyCode::Down), (0x7B, KeyCode::Left), (0x7C, KeyCode::Right),
    (0x39, KeyCode::CapsLock),
    // kVK_ANSI_KeypadClear
    (0x47, KeyCode::NumLock),
    (0x52, KeyCode::Numpad0), (0x53, KeyCode::Numpad1), (0x54, KeyCode::Numpad2),
    (0x55, KeyCode::Numpad3), (0x56, KeyCode::Numpad4), (0x57, KeyCode::Numpad5),
    (0x58, KeyCode::Numpad6), (0x59, KeyCode::Numpad7), (0x5B, KeyCode::Numpad8),
    (0x5C, KeyCode::Numpad9), (0x45, KeyCode::NumpadAdd), (0x4E, KeyCode::NumpadSub),
    (0x43, KeyCode::NumpadMul), (0x4B, KeyCode::NumpadDiv), (0x4C, KeyCode::NumpadEnter),
    (0x32, KeyCode::Backtick), (0x1B, KeyCode::Minus), (0x18, KeyCode::Equal),
    (0x21, KeyCode::LeftBracket), (0x1E, KeyCode::RightBracket), (0x2A, KeyCode::Backslash),
    (0x29, KeyCode::Semicolon), (0x27, KeyCode::Apostrophe), (0x2B, KeyCode::Comma),
    (0x2F, KeyCode::Period), (0x2C, KeyCode::Slash),
];

/// Names a CGKeyCode. `None` for media keys, keypad decimal and the like.
pub fn vkcode_to_keycode(vk: u16) -> Option<KeyCode> {
    CG_KEYS
        .iter()
        .find(|(code, _)| *code == vk)
        .map(|(_, key)| *key)
}

pub fn modifiers_from_flags(flags: u64) -> Modifiers {
    Modifiers {
        ctrl: flags & FLAG_CONTROL != 0,
        shift: flags & FLAG_SHIFT != 0,
        alt: flags & FLAG_ALTERNATE != 0,
        meta: flags & FLAG_COMMAND != 0,
    }
}

/// Inverse of `modifiers_from_flags`. Device-dependent bits are not restored.
pub fn flags_from_modifiers(modifiers: Modifiers) -> u64 {
    let mut flags = 0;
    if modifiers.ctrl {
        flags |= FLAG_CONTROL;
    }
    if modifiers.shift {
        flags |= FLAG_SHIFT;
    }
    if modifiers.alt {
        flags |= FLAG_ALTERNATE;
    }
    if modifiers.meta {
        flags |= FLAG_COMMAND;
    }
    flags
}

/// Whether a `FlagsChanged` event for `key` was a press or a release, judged
/// by its flag in the new `flags`. `None` for keys that are not modifiers.
pub fn modifier_transition(key: KeyCode, flags: u64) -> Option<KeyState> {
    let mask = match key {
        KeyCode::Ctrl => FLAG_CONTROL,
        KeyCode::Shift => FLAG_SHIFT,
        KeyCode::Alt => FLAG_ALTERNATE,
        KeyCode::Meta => FLAG_COMMAND,
        _ => return None,
    };
    Some(if flags & mask != 0 {
        KeyState::Down
    } else {
        KeyState::Up
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn table_has_no_duplicate_codes() {
        let mut seen = HashSet::new();
        for (code, key) in CG_KEYS {
            assert!(seen.insert(*code), "key code {code:#04x} listed twice ({key:?})");
        }
    }

    #[test]
    fn both_modifier_sides_map_to_canonical() {
        assert_eq!(vkcode_to_keycode(0x3B), Some(KeyCode::Ctrl));
        assert_eq!(vkcode_to_keycode(0x3E), Some(KeyCode::Ctrl));
        assert_eq!(vkcode_to_keycode(0x37), Some(KeyCode::Meta));
        assert_eq!(vkcode_to_keycode(0x36), Some(KeyCode::Meta));
    }

    #[test]
    fn letter_a_is_code_zero() {
        assert_eq!(vkcode_to_keycode(0x00), Some(KeyCode::A));
    }

    #[test]
    fn keypad_decimal_is_unnamed() {
        assert_eq!(vkcode_to_keycode(0x41), None);
    }

    #[test]
    fn modifier_transition_reads_the_new_flags() {
        assert_eq!(
            modifier_transition(KeyCode::Shift, FLAG_SHIFT),
            Some(KeyState::Down)
        );
        assert_eq!(
            modifier_transition(KeyCode::Shift, FLAG_COMMAND),
            Some(KeyState::Up)
        );
        assert_eq!(modifier_transition(KeyCode::CapsLock, 0x0001_0000), None);
    }

    #[test]
    fn flags_decode_each_modifier() {
        let m = modifiers_from_flags(FLAG_CONTROL | FLAG_COMMAND | 0x100);
        assert!(m.ctrl && m.meta);
        assert!(!m.shift && !m.alt);
        assert!(modifiers_from_flags(0).is_empty());
    }

    #[test]
    fn flags_encode_back_to_the_same_modifiers() {
        let m = Modifiers {
            ctrl: false,
            shift: true,
            alt: true,
            meta: false,
        };
        assert_eq!(flags_from_modifiers(m), FLAG_SHIFT | FLAG_ALTERNATE);
        assert_eq!(modifiers_from_flags(flags_from_modifiers(m)), m);
    }
}
