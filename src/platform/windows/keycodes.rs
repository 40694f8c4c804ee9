//! Windows virtual key code naming.
//!
//! VK codes are from the Windows SDK (winuser.h). The recorder replays the raw
//! VK/scan pair; this table only attaches a canonical `KeyCode` for display.
//! `WH_KEYBOARD_LL` reports sided modifiers (VK_LSHIFT, VK_RSHIFT, ...); both
//! sides name the unified variant.

use crate::platform::KeyCode;

/// VK_RETURN; NumpadEnter shares it and differs only by the extended bit.
const VK_RETURN: u16 = 0x0D;

#[rustfmt::skip]
const VK_KEYS: &[(u16, KeyCode)] = &[
    // VK_A .. VK_Z match ASCII uppercase
    (0x41, KeyCode::A), (0x42, KeyCode::B), (0x43, KeyCode::C), (0x44, KeyCode::D),
    (0x45, KeyCode::E), (0x46, KeyCode::F), (0x47, KeyCode::G), (0x48, KeyCode::H),
    (0x49, KeyCode::I), (0x4A, KeyCode::J), (0x4B, KeyCode::K), (0x4C, KeyCode::L),
    (0x4D, KeyCode::M), (0x4E, KeyCode::N), (0x4F, KeyCode::O), (0x50, KeyCode::P),
    (0x51, KeyCode::Q), (0x52, KeyCode::R), (0x53, KeyCode::S), (0x54, KeyCode::T),
    (0x55, KeyCode::U), (0x56, KeyCode::V), (0x57, KeyCode::W), (0x58, KeyCode::X),
    (0x59, KeyCode::Y), (0x5A, KeyCode::Z),
    // VK_0 .. VK_9 match ASCII digits
    (0x30, KeyCode::Key0), (0x31, KeyCode::Key1), (0x32, KeyCode::Key2), (0x33, KeyCode::Key3),
    (0x34, KeyCode::Key4), (0x35, KeyCode::Key5), (0x36, KeyCode::Key6), (0x37, KeyCode::Key7),
    (0x38, KeyCode::Key8), (0x39, KeyCode::Key9),
    (0x70, KeyCode::F1), (0x71, KeyCode::F2), (0x72, KeyCode::F3), (0x73, KeyCode::F4),
    (0x74, KeyCode::F5), (0x75, KeyCode::F6), (0x76, KeyCode::F7), (0x77, KeyCode::F8),
    (0x78, KeyCode::F9), (0x79, KeyCode::F10), (0x7A, KeyCode::F11), (0x7B, KeyCode::F12),
    (0x7C, KeyCode::F13), (0x7D, KeyCode::F14), (0x7E, KeyCode::F15), (0x7F, KeyCode::F16),
    (0x80, KeyCode::F17), (0x81, KeyCode::F18), (0x82, KeyCode::F19), (0x83, KeyCode::F20),
    (0x84, KeyCode::F21), (0x85, KeyCode::F22), (0x86, KeyCode::F23), (0x87, KeyCode::F24),
    (0x10, KeyCode::Shift), (0xA0, KeyCode::Shift), (0xA1, KeyCode::Shift),
    (0x11, KeyCode::Ctrl), (0xA2, KeyCode::Ctrl), (0xA3, KeyCode::Ctrl),
    (0x12, KeyCode::Alt), (0xA4, KeyCode::Alt), (0xA5, KeyCode::Alt),
    (0x5B, KeyCode::Meta), (0x5C, KeyCode::Meta),
    (0x20, KeyCode::Space), (0x09, KeyCode::Tab), (0x1B, KeyCode::Escape),
    (0x08, KeyCode::Backspace), (0x2E, KeyCode::Delete), (0x2D, KeyCode::Insert),
    (0x24, KeyCode::Home), (0x23, KeyCode::End), (0x21, KeyCode::PageUp), (0x22, KeyCode::PageDown),
    (0x26, KeyCode::Up), (0x28, KeyCode::Down), (0x25, KeyCode::Left), (0x27, KeyCode::Right),
    (0x14, KeyCode::CapsLock), (0x90, KeyCode::NumLock), (0x91, KeyCode::ScrollLock),
    (0x2C, KeyCode::PrintScreen), (0x13, KeyCode::Pause),
    (0x60, KeyCode::Numpad0), (0x61, KeyCode::Numpad1), (0x62, KeyCode::Numpad2),
    (0x63, KeyCode::Numpad3), (0x64, KeyCode::Numpad4), (0x65, KeyCode::Numpad5),
    (0x66, KeyCode::Numpad6), (0x67, KeyCode::Numpad7), (0x68, KeyCode::Numpad8),
    (0x69, KeyCode::Numpad9), (0x6B, KeyCode::NumpadAdd), (0x6D, KeyCode::NumpadSub),
    (0x6A, KeyCode::NumpadMul), (0x6F, KeyCode::NumpadDiv),
    // OEM codes, ANSI layout assumed
    (0xC0, KeyCode::Backtick), (0xBD, KeyCode::Minus), (0xBB, KeyCode::Equal),
    (0xDB, KeyCode::LeftBracket), (0xDD, KeyCode::RightBracket), (0xDC, KeyCode::Backslash),
    (0xBA, KeyCode::Semicolon), (0xDE, KeyCode::Apostrophe), (0xBC, KeyCode::Comma),
    (0xBE, KeyCode::Period), (0xBF, KeyCode::Slash),
];

/// Names a virtual key code. `extended` is the `LLKHF_EXTENDED` bit.
pub fn vkcode_to_keycode(vk: u16, extended: bool) -> Option<KeyCode> {
    if vk == VK_RETURN {
        return Some(if extended {
            KeyCode::NumpadEnter
        } else {
            KeyCode::Enter
        });
    }
    VK_KEYS
        .iter()
        .find(|(code, _)| *code == vk)
        .map(|(_, key)| *key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn table_has_no_duplicate_codes() {
        let mut seen = HashSet::new();
        for (code, key) in VK_KEYS {
            assert!(seen.insert(*code), "vk {code:#04x} listed twice ({key:?})");
        }
        assert!(!seen.contains(&VK_RETURN));
    }

    #[test]
    fn numpad_enter_requires_extended_bit() {
        assert_eq!(vkcode_to_keycode(0x0D, false), Some(KeyCode::Enter));
        assert_eq!(vkcode_to_keycode(0x0D, true), Some(KeyCode::NumpadEnter));
    }

    #[test]
    fn sided_modifiers_map_to_canonical() {
        assert_eq!(vkcode_to_keycode(0xA1, false), Some(KeyCode::Shift));
        assert_eq!(vkcode_to_keycode(0xA3, false), Some(KeyCode::Ctrl));
        assert_eq!(vkcode_to_keycode(0xA5, false), Some(KeyCode::Alt));
        assert_eq!(vkcode_to_keycode(0x5C, false), Some(KeyCode::Meta));
    }

    #[test]
    fn unknown_vkcode_returns_none() {
        assert_eq!(vkcode_to_keycode(0xFF, false), None);
    }
}
