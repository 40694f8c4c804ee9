//! Linux evdev key code naming.
//!
//! Codes are from `linux/input-event-codes.h`. Recorded events keep the raw
//! evdev code for replay; this table only attaches a canonical `KeyCode` for
//! display. Left and right modifiers both name the unified variant.

use crate::platform::KeyCode;

#[rustfmt::skip]
const EVDEV_KEYS: &[(u16, KeyCode)] = &[
    (30, KeyCode::A), (48, KeyCode::B), (46, KeyCode::C), (32, KeyCode::D),
    (18, KeyCode::E), (33, KeyCode::F), (34, KeyCode::G), (35, KeyCode::H),
    (23, KeyCode::I), (36, KeyCode::J), (37, KeyCode::K), (38, KeyCode::L),
    (50, KeyCode::M), (49, KeyCode::N), (24, KeyCode::O), (25, KeyCode::P),
    (16, KeyCode::Q), (19, KeyCode::R), (31, KeyCode::S), (20, KeyCode::T),
    (22, KeyCode::U), (47, KeyCode::V), (17, KeyCode::W), (45, KeyCode::X),
    (21, KeyCode::Y), (44, KeyCode::Z),
    // KEY_1 = 2 .. KEY_0 = 11
    (2, KeyCode::Key1), (3, KeyCode::Key2), (4, KeyCode::Key3), (5, KeyCode::Key4),
    (6, KeyCode::Key5), (7, KeyCode::Key6), (8, KeyCode::Key7), (9, KeyCode::Key8),
    (10, KeyCode::Key9), (11, KeyCode::Key0),
    (59, KeyCode::F1), (60, KeyCode::F2), (61, KeyCode::F3), (62, KeyCode::F4),
    (63, KeyCode::F5), (64, KeyCode::F6), (65, KeyCode::F7), (66, KeyCode::F8),
    (67, KeyCode::F9), (68, KeyCode::F10), (87, KeyCode::F11), (88, KeyCode::F12),
    (183, KeyCode::F13), (184, KeyCode::F14), (185, KeyCode::F15), (186, KeyCode::F16),
    (187, KeyCode::F17), (188, KeyCode::F18), (189, KeyCode::F19), (190, KeyCode::F20),
    (191, KeyCode::F21), (192, KeyCode::F22), (193, KeyCode::F23), (194, KeyCode::F24),
    (29, KeyCode::Ctrl), (97, KeyCode::Ctrl),
    (42, KeyCode::Shift), (54, KeyCode::Shift),
    (56, KeyCode::Alt), (100, KeyCode::Alt),
    (125, KeyCode::Meta), (126, KeyCode::Meta),
    (57, KeyCode::Space), (28, KeyCode::Enter), (15, KeyCode::Tab), (1, KeyCode::Escape),
    (14, KeyCode::Backspace), (111, KeyCode::Delete), (110, KeyCode::Insert),
    (102, KeyCode::Home), (107, KeyCode::End), (104, KeyCode::PageUp), (109, KeyCode::PageDown),
    (103, KeyCode::Up), (108, KeyCode::Down), (105, KeyCode::Left), (106, KeyCode::Right),
    (58, KeyCode::CapsLock), (69, KeyCode::NumLock), (70, KeyCode::ScrollLock),
    (99, KeyCode::PrintScreen), (119, KeyCode::Pause),
    (82, KeyCode::Numpad0), (79, KeyCode::Numpad1), (80, KeyCode::Numpad2),
    (81, KeyCode::Numpad3), (75, KeyCode::Numpad4), (76, KeyCode::Numpad5),
    (77, KeyCode::Numpad6), (71, KeyCode::Numpad7), (72, KeyCode::Numpad8),
    (73, KeyCode::Numpad9), (78, KeyCode::NumpadAdd), (74, KeyCode::NumpadSub),
    (55, KeyCode::NumpadMul), (98, KeyCode::NumpadDiv), (96, KeyCode::NumpadEnter),
    (41, KeyCode::Backtick), (12, KeyCode::Minus), (13, KeyCode::Equal),
    (26, KeyCode::LeftBracket), (27, KeyCode::RightBracket), (43, KeyCode::Backslash),
    (39, KeyCode::Semicolon), (40, KeyCode::Apostrophe), (51, KeyCode::Comma),
    (52, KeyCode::Period), (53, KeyCode::Slash),
];

/// Names an evdev key code, or `None` for keys without a `KeyCode` variant
/// (media keys, browser buttons, vendor keys).
pub fn evdev_to_keycode(code: u16) -> Option<KeyCode> {
    EVDEV_KEYS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, key)| *key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn table_has_no_duplicate_codes() {
        let mut seen = HashSet::new();
        for (code, key) in EVDEV_KEYS {
            assert!(seen.insert(*code), "code {code} listed twice ({key:?})");
        }
    }

    #[test]
    fn right_modifiers_map_to_unified_variant() {
        assert_eq!(evdev_to_keycode(97), Some(KeyCode::Ctrl));
        assert_eq!(evdev_to_keycode(54), Some(KeyCode::Shift));
        assert_eq!(evdev_to_keycode(100), Some(KeyCode::Alt));
        assert_eq!(evdev_to_keycode(126), Some(KeyCode::Meta));
    }

    #[test]
    fn unknown_codes_return_none() {
        // 0 is KEY_RESERVED; 164 is KEY_PLAYPAUSE.
        assert_eq!(evdev_to_keycode(0), None);
        assert_eq!(evdev_to_keycode(164), None);
    }

    #[test]
    fn spot_check_codes() {
        assert_eq!(evdev_to_keycode(30), Some(KeyCode::A));
        assert_eq!(evdev_to_keycode(44), Some(KeyCode::Z));
        assert_eq!(evdev_to_keycode(11), Some(KeyCode::Key0));
        assert_eq!(evdev_to_keycode(88), Some(KeyCode::F12));
        assert_eq!(evdev_to_keycode(194), Some(KeyCode::F24));
    }
}
