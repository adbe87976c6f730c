// src/keys.rs

//! Abstract key codes and the translation from native key identifiers.
//!
//! Backends report keys as X11-style keysyms (`keysym` below). The headless
//! backend uses the same numbering so scripted input goes through the exact
//! table real windows use.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Native keysym values understood by `translate`.
pub mod keysym {
    pub const BACKSPACE: u32 = 0xff08;
    pub const TAB: u32 = 0xff09;
    pub const RETURN: u32 = 0xff0d;
    pub const PAUSE: u32 = 0xff13;
    pub const ESCAPE: u32 = 0xff1b;
    pub const SPACE: u32 = 0x0020;
    pub const PLUS: u32 = 0x002b;
    pub const MINUS: u32 = 0x002d;
    pub const KP_ADD: u32 = 0xffab;
    pub const KP_SUBTRACT: u32 = 0xffad;
    /// `0`..`9` are contiguous from here.
    pub const KEY_0: u32 = 0x0030;
    /// Lowercase latin letters are contiguous from here.
    pub const KEY_A: u32 = 0x0061;
    /// `F1`..`F12` are contiguous from here.
    pub const F1: u32 = 0xffbe;
}

/// Platform-independent key identifier.
///
/// Digits and lowercase letters are `Char`. Keys missing from the table keep
/// their native value in `Raw`, so consumers must tolerate codes outside the
/// named set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    Backspace,
    Tab,
    Enter,
    Pause,
    Escape,
    Space,
    Plus,
    Minus,
    Char(char),
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    Raw(u32),
}

const FUNCTION_KEYS: [KeyCode; 12] = [
    KeyCode::F1,
    KeyCode::F2,
    KeyCode::F3,
    KeyCode::F4,
    KeyCode::F5,
    KeyCode::F6,
    KeyCode::F7,
    KeyCode::F8,
    KeyCode::F9,
    KeyCode::F10,
    KeyCode::F11,
    KeyCode::F12,
];

/// First numeric code of the function-key block.
const FUNCTION_KEY_BASE: u32 = 282;

impl KeyCode {
    /// Stable numeric value of the key.
    ///
    /// Control and printable keys use their ASCII value, function keys start
    /// at 282, and `Raw` returns the native value untouched.
    pub fn code(&self) -> u32 {
        match *self {
            KeyCode::Backspace => 8,
            KeyCode::Tab => 9,
            KeyCode::Enter => 13,
            KeyCode::Pause => 19,
            KeyCode::Escape => 27,
            KeyCode::Space => 32,
            KeyCode::Plus => 43,
            KeyCode::Minus => 45,
            KeyCode::Char(c) => c as u32,
            KeyCode::Raw(value) => value,
            f => {
                let index = FUNCTION_KEYS
                    .iter()
                    .position(|k| *k == f)
                    .unwrap_or_default();
                FUNCTION_KEY_BASE + index as u32
            }
        }
    }

    /// Returns true for keys the translation table does not know.
    pub fn is_raw(&self) -> bool {
        matches!(self, KeyCode::Raw(_))
    }
}

static KEYSYM_TO_KEY: Lazy<HashMap<u32, KeyCode>> = Lazy::new(|| {
    let mut map = HashMap::with_capacity(56);
    map.insert(keysym::BACKSPACE, KeyCode::Backspace);
    map.insert(keysym::TAB, KeyCode::Tab);
    map.insert(keysym::RETURN, KeyCode::Enter);
    map.insert(keysym::PAUSE, KeyCode::Pause);
    map.insert(keysym::ESCAPE, KeyCode::Escape);
    map.insert(keysym::SPACE, KeyCode::Space);
    map.insert(keysym::PLUS, KeyCode::Plus);
    map.insert(keysym::MINUS, KeyCode::Minus);
    map.insert(keysym::KP_ADD, KeyCode::Plus);
    map.insert(keysym::KP_SUBTRACT, KeyCode::Minus);
    for (offset, c) in ('0'..='9').enumerate() {
        map.insert(keysym::KEY_0 + offset as u32, KeyCode::Char(c));
    }
    for (offset, c) in ('a'..='z').enumerate() {
        map.insert(keysym::KEY_A + offset as u32, KeyCode::Char(c));
    }
    for (offset, key) in FUNCTION_KEYS.iter().enumerate() {
        map.insert(keysym::F1 + offset as u32, *key);
    }
    map
});

/// Translates a native keysym into a `KeyCode`.
pub fn translate(native: u32) -> KeyCode {
    KEYSYM_TO_KEY
        .get(&native)
        .copied()
        .unwrap_or(KeyCode::Raw(native))
}

/// Picks the keysym to report for a key that has an unshifted and a shifted
/// symbol.
///
/// With Shift held the shifted symbol wins only if it names a mapped key, so
/// Shift+`=` reports `+` while Shift+`a` still reports `a`.
pub fn select_keysym(unshifted: u32, shifted: u32, shift_held: bool) -> u32 {
    if shift_held && KEYSYM_TO_KEY.contains_key(&shifted) {
        shifted
    } else {
        unshifted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn all_mapped_keysyms() -> Vec<u32> {
        let mut syms = vec![
            keysym::BACKSPACE,
            keysym::TAB,
            keysym::RETURN,
            keysym::PAUSE,
            keysym::ESCAPE,
            keysym::SPACE,
            keysym::PLUS,
            keysym::MINUS,
        ];
        syms.extend((0..10).map(|i| keysym::KEY_0 + i));
        syms.extend((0..26).map(|i| keysym::KEY_A + i));
        syms.extend((0..12).map(|i| keysym::F1 + i));
        syms
    }

    #[test]
    fn every_named_key_has_a_distinct_code() {
        let syms = all_mapped_keysyms();
        let codes: HashSet<u32> = syms.iter().map(|s| translate(*s).code()).collect();
        assert_eq!(codes.len(), syms.len());
        assert!(syms.iter().all(|s| !translate(*s).is_raw()));
    }

    #[test]
    fn control_keys_map_to_named_codes() {
        assert_eq!(translate(keysym::ESCAPE), KeyCode::Escape);
        assert_eq!(translate(keysym::RETURN), KeyCode::Enter);
        assert_eq!(translate(keysym::TAB), KeyCode::Tab);
        assert_eq!(translate(keysym::PAUSE), KeyCode::Pause);
        assert_eq!(translate(keysym::ESCAPE).code(), 27);
        assert_eq!(translate(keysym::SPACE).code(), 32);
    }

    #[test]
    fn digits_and_letters_map_to_chars() {
        assert_eq!(translate(keysym::KEY_0), KeyCode::Char('0'));
        assert_eq!(translate(keysym::KEY_0 + 9), KeyCode::Char('9'));
        assert_eq!(translate(keysym::KEY_A), KeyCode::Char('a'));
        assert_eq!(translate(keysym::KEY_A + 25), KeyCode::Char('z'));
        assert_eq!(KeyCode::Char('q').code(), 'q' as u32);
    }

    #[test]
    fn function_keys_include_f12() {
        assert_eq!(translate(keysym::F1), KeyCode::F1);
        assert_eq!(translate(keysym::F1 + 10), KeyCode::F11);
        assert_eq!(translate(keysym::F1 + 11), KeyCode::F12);
        assert_eq!(KeyCode::F1.code(), 282);
        assert_eq!(KeyCode::F12.code(), 293);
    }

    #[test]
    fn unmapped_keysyms_pass_through_raw() {
        // XK_Left and an arbitrary vendor keysym.
        for native in [0xff51, 0x1008_ff13] {
            let key = translate(native);
            assert_eq!(key, KeyCode::Raw(native));
            assert_eq!(key.code(), native);
        }
    }

    #[test]
    fn keypad_plus_and_minus_map_to_named_keys() {
        assert_eq!(translate(keysym::KP_ADD), KeyCode::Plus);
        assert_eq!(translate(keysym::KP_SUBTRACT), KeyCode::Minus);
    }

    #[test]
    fn shift_selects_mapped_shifted_symbol_only() {
        const EQUAL: u32 = 0x003d;
        const UPPER_A: u32 = 0x0041;
        const EXCLAM: u32 = 0x0021;

        assert_eq!(select_keysym(EQUAL, keysym::PLUS, true), keysym::PLUS);
        assert_eq!(select_keysym(EQUAL, keysym::PLUS, false), EQUAL);
        assert_eq!(select_keysym(keysym::KEY_A, UPPER_A, true), keysym::KEY_A);
        assert_eq!(select_keysym(keysym::KEY_0 + 1, EXCLAM, true), keysym::KEY_0 + 1);
        assert_eq!(translate(select_keysym(EQUAL, keysym::PLUS, true)), KeyCode::Plus);
    }

    #[test]
    fn translation_is_stable_across_calls() {
        for sym in all_mapped_keysyms() {
            assert_eq!(translate(sym), translate(sym));
        }
    }
}
