//! Modifier and key definitions for global hotkeys
//!
//! Provides the modifier flag set used by the OS hotkey API, a virtual-key
//! code newtype, and the `CombinationKey` value used to look up callbacks.

use std::fmt;
use std::hash::{Hash, Hasher};

use bitflags::bitflags;

bitflags! {
    /// Modifier keys that must be held for a hotkey to fire
    ///
    /// Bit values match the host hotkey API so the set can be passed through
    /// unchanged. The empty set means "no modifier".
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Modifiers: u32 {
        /// Alt key
        const ALT = 0x0001;
        /// Control key
        const CONTROL = 0x0002;
        /// Shift key
        const SHIFT = 0x0004;
        /// Windows / Super / Meta key
        const META = 0x0008;
    }
}

/// A virtual-key code from the host's key space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyCode(pub u32);

impl KeyCode {
    pub const BACKSPACE: KeyCode = KeyCode(0x08);
    pub const TAB: KeyCode = KeyCode(0x09);
    pub const ENTER: KeyCode = KeyCode(0x0D);
    pub const ESCAPE: KeyCode = KeyCode(0x1B);
    pub const SPACE: KeyCode = KeyCode(0x20);
    pub const PAGE_UP: KeyCode = KeyCode(0x21);
    pub const PAGE_DOWN: KeyCode = KeyCode(0x22);
    pub const END: KeyCode = KeyCode(0x23);
    pub const HOME: KeyCode = KeyCode(0x24);
    pub const LEFT: KeyCode = KeyCode(0x25);
    pub const UP: KeyCode = KeyCode(0x26);
    pub const RIGHT: KeyCode = KeyCode(0x27);
    pub const DOWN: KeyCode = KeyCode(0x28);
    pub const INSERT: KeyCode = KeyCode(0x2D);
    pub const DELETE: KeyCode = KeyCode(0x2E);
    pub const LEFT_WIN: KeyCode = KeyCode(0x5B);
    pub const RIGHT_WIN: KeyCode = KeyCode(0x5C);
    pub const F1: KeyCode = KeyCode(0x70);
    pub const F24: KeyCode = KeyCode(0x87);
    pub const SEMICOLON: KeyCode = KeyCode(0xBA);
    pub const EQUALS: KeyCode = KeyCode(0xBB);
    pub const COMMA: KeyCode = KeyCode(0xBC);
    pub const MINUS: KeyCode = KeyCode(0xBD);
    pub const PERIOD: KeyCode = KeyCode(0xBE);
    pub const SLASH: KeyCode = KeyCode(0xBF);
    pub const BACKQUOTE: KeyCode = KeyCode(0xC0);
    pub const BRACKET_LEFT: KeyCode = KeyCode(0xDB);
    pub const BACKSLASH: KeyCode = KeyCode(0xDC);
    pub const BRACKET_RIGHT: KeyCode = KeyCode(0xDD);
    pub const QUOTE: KeyCode = KeyCode(0xDE);

    /// Key code for an ASCII letter or digit, e.g. `KeyCode::from_char('h')`
    pub fn from_char(c: char) -> Option<Self> {
        let c = c.to_ascii_uppercase();
        if c.is_ascii_uppercase() || c.is_ascii_digit() {
            Some(KeyCode(c as u32))
        } else {
            None
        }
    }

    /// Function key `F<n>` for `n` in 1..=24
    pub fn function(n: u32) -> Option<Self> {
        (1..=24).contains(&n).then(|| KeyCode(Self::F1.0 + n - 1))
    }

    fn name(self) -> Option<&'static str> {
        NAMED_KEYS
            .iter()
            .find(|(_, code)| *code == self)
            .map(|(name, _)| *name)
    }
}

/// Canonical names, first entry per code wins when formatting
const NAMED_KEYS: &[(&str, KeyCode)] = &[
    ("Backspace", KeyCode::BACKSPACE),
    ("Tab", KeyCode::TAB),
    ("Enter", KeyCode::ENTER),
    ("Return", KeyCode::ENTER),
    ("Escape", KeyCode::ESCAPE),
    ("Esc", KeyCode::ESCAPE),
    ("Space", KeyCode::SPACE),
    ("PageUp", KeyCode::PAGE_UP),
    ("PageDown", KeyCode::PAGE_DOWN),
    ("End", KeyCode::END),
    ("Home", KeyCode::HOME),
    ("Left", KeyCode::LEFT),
    ("Up", KeyCode::UP),
    ("Right", KeyCode::RIGHT),
    ("Down", KeyCode::DOWN),
    ("Insert", KeyCode::INSERT),
    ("Delete", KeyCode::DELETE),
    ("LWin", KeyCode::LEFT_WIN),
    ("RWin", KeyCode::RIGHT_WIN),
    ("Semicolon", KeyCode::SEMICOLON),
    ("Equals", KeyCode::EQUALS),
    ("Plus", KeyCode::EQUALS),
    ("Comma", KeyCode::COMMA),
    ("Minus", KeyCode::MINUS),
    ("Period", KeyCode::PERIOD),
    ("Slash", KeyCode::SLASH),
    ("Backquote", KeyCode::BACKQUOTE),
    ("BracketLeft", KeyCode::BRACKET_LEFT),
    ("Backslash", KeyCode::BACKSLASH),
    ("BracketRight", KeyCode::BRACKET_RIGHT),
    ("Quote", KeyCode::QUOTE),
];

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.name() {
            return f.write_str(name);
        }
        match self.0 {
            0x30..=0x39 | 0x41..=0x5A => write!(f, "{}", self.0 as u8 as char),
            0x70..=0x87 => write!(f, "F{}", self.0 - Self::F1.0 + 1),
            other => write!(f, "0x{:02X}", other),
        }
    }
}

/// A modifier set plus primary key, used as the callback lookup key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombinationKey {
    pub modifiers: Modifiers,
    pub key: KeyCode,
}

impl CombinationKey {
    /// Bits outside the four known modifiers are dropped, as the host
    /// never reports them back
    pub fn new(modifiers: Modifiers, key: KeyCode) -> Self {
        Self {
            modifiers: modifiers.intersection(Modifiers::all()),
            key,
        }
    }

    /// Key code in the low 16 bits, modifier bits above it
    pub fn packed(&self) -> u32 {
        (self.key.0 & 0xFFFF) | (self.modifiers.bits() << 16)
    }
}

impl Hash for CombinationKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.packed());
    }
}

impl fmt::Display for CombinationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (flag, name) in [
            (Modifiers::CONTROL, "Ctrl"),
            (Modifiers::ALT, "Alt"),
            (Modifiers::SHIFT, "Shift"),
            (Modifiers::META, "Win"),
        ] {
            if self.modifiers.contains(flag) {
                write!(f, "{}+", name)?;
            }
        }
        write!(f, "{}", self.key)
    }
}

/// Parse a key name such as `"H"`, `"7"`, `"F5"` or `"Right"`
pub fn parse_key(name: &str) -> Option<KeyCode> {
    let name = name.trim();
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return KeyCode::from_char(c).or(match c {
            '-' => Some(KeyCode::MINUS),
            '=' => Some(KeyCode::EQUALS),
            ',' => Some(KeyCode::COMMA),
            '.' => Some(KeyCode::PERIOD),
            '`' => Some(KeyCode::BACKQUOTE),
            _ => None,
        });
    }

    if let Some(n) = name.strip_prefix(['F', 'f']) {
        if let Ok(n) = n.parse::<u32>() {
            return KeyCode::function(n);
        }
    }

    NAMED_KEYS
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(name))
        .map(|(_, code)| *code)
}

/// Parse a combination string like `"Alt+Win+Right"` or `"ctrl+shift+h"`
///
/// The last `+`-separated token is the key, all earlier tokens must be
/// modifiers.
pub fn parse_combination(s: &str) -> Option<CombinationKey> {
    let parts: Vec<&str> = s.split('+').map(str::trim).collect();
    let (key, modifier_names) = parts.split_last()?;

    let mut modifiers = Modifiers::empty();
    for part in modifier_names {
        modifiers |= match part.to_ascii_uppercase().as_str() {
            "CTRL" | "CONTROL" => Modifiers::CONTROL,
            "ALT" => Modifiers::ALT,
            "SHIFT" => Modifiers::SHIFT,
            "WIN" | "SUPER" | "META" => Modifiers::META,
            _ => return None,
        };
    }

    Some(CombinationKey::new(modifiers, parse_key(key)?))
}
