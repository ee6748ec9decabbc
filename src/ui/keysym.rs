//! Key symbols and their X11 names.
//!
//! Key symbols use the X11 numbering the windowing layer reports: Latin-1 characters
//! are their own code point, function keys live in `0xff00..`, and arbitrary Unicode
//! characters are `0x0100_0000 + code point`.

use std::fmt;

/// A key symbol
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Keysym(pub u32);

/// Offset of the direct Unicode keysym range
const UNICODE_OFFSET: u32 = 0x0100_0000;

/// Names for keys that are not a single letter or digit
static NAMED_KEYS: &[(&str, u32)] = &[
    ("space", 0x0020),
    ("exclam", 0x0021),
    ("quotedbl", 0x0022),
    ("numbersign", 0x0023),
    ("dollar", 0x0024),
    ("percent", 0x0025),
    ("ampersand", 0x0026),
    ("apostrophe", 0x0027),
    ("parenleft", 0x0028),
    ("parenright", 0x0029),
    ("asterisk", 0x002a),
    ("plus", 0x002b),
    ("comma", 0x002c),
    ("minus", 0x002d),
    ("period", 0x002e),
    ("slash", 0x002f),
    ("colon", 0x003a),
    ("semicolon", 0x003b),
    ("less", 0x003c),
    ("equal", 0x003d),
    ("greater", 0x003e),
    ("question", 0x003f),
    ("at", 0x0040),
    ("bracketleft", 0x005b),
    ("backslash", 0x005c),
    ("bracketright", 0x005d),
    ("asciicircum", 0x005e),
    ("underscore", 0x005f),
    ("grave", 0x0060),
    ("braceleft", 0x007b),
    ("bar", 0x007c),
    ("braceright", 0x007d),
    ("asciitilde", 0x007e),
    ("BackSpace", 0xff08),
    ("Tab", 0xff09),
    ("Return", 0xff0d),
    ("Pause", 0xff13),
    ("Escape", 0xff1b),
    ("Home", 0xff50),
    ("Left", 0xff51),
    ("Up", 0xff52),
    ("Right", 0xff53),
    ("Down", 0xff54),
    ("Page_Up", 0xff55),
    ("Page_Down", 0xff56),
    ("End", 0xff57),
    ("Insert", 0xff63),
    ("Menu", 0xff67),
    ("KP_Add", 0xffab),
    ("KP_Subtract", 0xffad),
    ("F1", 0xffbe),
    ("F2", 0xffbf),
    ("F3", 0xffc0),
    ("F4", 0xffc1),
    ("F5", 0xffc2),
    ("F6", 0xffc3),
    ("F7", 0xffc4),
    ("F8", 0xffc5),
    ("F9", 0xffc6),
    ("F10", 0xffc7),
    ("F11", 0xffc8),
    ("F12", 0xffc9),
    ("Delete", 0xffff),
    ("VoidSymbol", 0x00ff_ffff),
];

impl Keysym {
    /// The "no binding" sentinel
    pub const VOID: Keysym = Keysym(0x00ff_ffff);
    pub const PLUS: Keysym = Keysym(0x002b);
    pub const MINUS: Keysym = Keysym(0x002d);

    /// Keysym for an ASCII letter, digit or punctuation character
    pub const fn from_ascii(ch: u8) -> Keysym {
        Keysym(ch as u32)
    }

    /// Resolve an X11 key name. Accepts table names, single letters and digits,
    /// `0x`-prefixed hex codes and `U+XXXX` / `UXXXX` Unicode names.
    pub fn from_name(name: &str) -> Option<Keysym> {
        if let Some(&(_, code)) = NAMED_KEYS.iter().find(|(n, _)| *n == name) {
            return Some(Keysym(code));
        }

        let mut chars = name.chars();
        if let (Some(ch), None) = (chars.next(), chars.next()) {
            if ch.is_ascii_alphanumeric() {
                return Some(Keysym(ch as u32));
            }
            return None;
        }

        if let Some(hex) = name.strip_prefix("0x") {
            return u32::from_str_radix(hex, 16).ok().map(Keysym);
        }

        let unicode = name.strip_prefix("U+").or_else(|| name.strip_prefix('U'))?;
        let cp = u32::from_str_radix(unicode, 16).ok()?;
        char::from_u32(cp)?;
        if cp < 0x100 {
            Some(Keysym(cp))
        } else {
            Some(Keysym(UNICODE_OFFSET + cp))
        }
    }

    /// X11 name of this keysym
    pub fn name(self) -> String {
        if let Some(&(name, _)) = NAMED_KEYS.iter().find(|(_, code)| *code == self.0) {
            return name.to_string();
        }

        if let Some(ch) = char::from_u32(self.0).filter(|c| c.is_ascii_alphanumeric()) {
            return ch.to_string();
        }

        // `U+00XX` reads back as the Latin-1 keysym, so those stay in hex
        if let Some(cp) = self.0.checked_sub(UNICODE_OFFSET) {
            if cp >= 0x100 && char::from_u32(cp).is_some() {
                return format!("U+{:04X}", cp);
            }
        }

        format!("{:#x}", self.0)
    }

    /// Upper-case variant for letter keysyms, unchanged otherwise
    pub fn to_upper(self) -> Keysym {
        match self.0 {
            0x61..=0x7a => Keysym(self.0 - 0x20),
            // Latin-1 lower-case letters, except the division sign
            0xe0..=0xfe if self.0 != 0xf7 => Keysym(self.0 - 0x20),
            _ => self,
        }
    }

    pub fn is_void(self) -> bool {
        self == Keysym::VOID || self.0 == 0
    }
}

impl fmt::Debug for Keysym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keysym({})", self.name())
    }
}
