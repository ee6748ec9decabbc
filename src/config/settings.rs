//! Typed view of the persisted keys.
//!
//! [`Settings::load`] writes the default of every absent key before reading it. A
//! value that is present but unusable is logged, replaced in the store by its
//! default and used as the default for this session.

use std::path::PathBuf;

use tracing::warn;

use super::store::ConfigStore;
use super::Color;
use crate::font::{FontDescription, DEFAULT_FONT};
use crate::ui::accelerator::{self, Accelerator, ModifierMask};
use crate::ui::keysym::Keysym;

pub const FORECOLOR: &str = "forecolor";
pub const BACKCOLOR: &str = "backcolor";
pub const OPACITY_LEVEL: &str = "opacity_level";
pub const BACKGROUND: &str = "background";
pub const FONT: &str = "font";
pub const CURSOR_TYPE: &str = "cursor_type";
pub const WORD_CHARS: &str = "word_chars";
pub const COPY_ACCELERATOR: &str = "copy_accelerator";
pub const SCROLLBAR_ACCELERATOR: &str = "scrollbar_accelerator";
pub const OPEN_URL_ACCELERATOR: &str = "open_url_accelerator";
pub const FONT_SIZE_ACCELERATOR: &str = "font_size_accelerator";
pub const COPY_KEY: &str = "copy_key";
pub const PASTE_KEY: &str = "paste_key";
pub const ICON_FILE: &str = "icon_file";

pub const DEFAULT_FORECOLOR: Color = Color::new(0xc0, 0xc0, 0xc0);
pub const DEFAULT_BACKCOLOR: Color = Color::new(0x00, 0x00, 0x00);
pub const DEFAULT_WORD_CHARS: &str = "-A-Za-z0-9,./?%&#_~";
pub const DEFAULT_ICON_FILE: &str = "terminal-tango.svg";

/// Stored value of `background` when no image is set
pub const NO_BACKGROUND: &str = "none";

/// Cursor shape, stored as its integer value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorShape {
    #[default]
    Block = 0,
    Underline = 1,
    IBeam = 2,
}

impl CursorShape {
    pub fn from_config(value: i64) -> Option<Self> {
        match value {
            0 => Some(CursorShape::Block),
            1 => Some(CursorShape::Underline),
            2 => Some(CursorShape::IBeam),
            _ => None,
        }
    }

    pub fn to_config(self) -> i64 {
        self as i64
    }
}

/// Background opacity level, 0 (transparent) to 99 (opaque)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opacity(u8);

impl Opacity {
    pub const MAX: u8 = 99;
    pub const OPAQUE: Opacity = Opacity(Self::MAX);

    /// Level clamped into `0..=99`
    pub fn new(level: i64) -> Self {
        Opacity(level.clamp(0, i64::from(Self::MAX)) as u8)
    }

    pub fn level(self) -> u8 {
        self.0
    }

    /// 16-bit alpha: `round(level * 65535 / 99)`
    pub fn alpha(self) -> u16 {
        ((f64::from(self.0) * 65535.0 / f64::from(Self::MAX)).round()) as u16
    }

    /// Level for a 16-bit alpha: `round(alpha * 99 / 65535)`
    pub fn from_alpha(alpha: u16) -> Self {
        Opacity(((f64::from(alpha) * f64::from(Self::MAX) / 65535.0).round()) as u8)
    }
}

impl Default for Opacity {
    fn default() -> Self {
        Self::OPAQUE
    }
}

/// Accelerator assignments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bindings {
    pub copy: ModifierMask,
    pub scrollbar: ModifierMask,
    pub open_url: ModifierMask,
    pub font_size: ModifierMask,
    pub copy_key: Keysym,
    pub paste_key: Keysym,
}

impl Default for Bindings {
    fn default() -> Self {
        let ctrl_shift = ModifierMask::CONTROL | ModifierMask::SHIFT;
        Self {
            copy: ctrl_shift,
            scrollbar: ctrl_shift,
            open_url: ctrl_shift,
            font_size: ModifierMask::CONTROL,
            copy_key: Keysym::from_ascii(b'C'),
            paste_key: Keysym::from_ascii(b'V'),
        }
    }
}

impl Bindings {
    pub fn load(store: &mut ConfigStore) -> Self {
        let defaults = Self::default();
        let copy = accelerator::load_accelerator(
            store,
            COPY_ACCELERATOR,
            COPY_KEY,
            Accelerator::new(defaults.copy, defaults.copy_key),
        );
        Self {
            copy: copy.mask,
            scrollbar: accelerator::load_mask(store, SCROLLBAR_ACCELERATOR, defaults.scrollbar),
            open_url: accelerator::load_mask(store, OPEN_URL_ACCELERATOR, defaults.open_url),
            font_size: accelerator::load_mask(store, FONT_SIZE_ACCELERATOR, defaults.font_size),
            copy_key: copy.key,
            paste_key: accelerator::load_key(store, PASTE_KEY, defaults.paste_key),
        }
    }
}

/// Everything the controller applies to the terminal at startup
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub forecolor: Color,
    pub backcolor: Color,
    pub opacity: Opacity,
    pub background: Option<PathBuf>,
    pub font: FontDescription,
    pub cursor: CursorShape,
    pub word_chars: String,
    pub bindings: Bindings,
    pub icon_file: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            forecolor: DEFAULT_FORECOLOR,
            backcolor: DEFAULT_BACKCOLOR,
            opacity: Opacity::default(),
            background: None,
            font: FontDescription::default(),
            cursor: CursorShape::default(),
            word_chars: DEFAULT_WORD_CHARS.to_string(),
            bindings: Bindings::default(),
            icon_file: DEFAULT_ICON_FILE.to_string(),
        }
    }
}

impl Settings {
    /// Read every key, writing defaults for absent ones
    pub fn load(store: &mut ConfigStore) -> Self {
        let forecolor = load_color(store, FORECOLOR, DEFAULT_FORECOLOR);
        let backcolor = load_color(store, BACKCOLOR, DEFAULT_BACKCOLOR);

        store.set_default_if_absent(OPACITY_LEVEL, i64::from(Opacity::MAX));
        let opacity = match store.get_integer(OPACITY_LEVEL) {
            Ok(level) => Opacity::new(level),
            Err(e) => {
                warn!("{}, using default", e);
                store.set(OPACITY_LEVEL, i64::from(Opacity::MAX));
                Opacity::default()
            }
        };

        let background = load_string(store, BACKGROUND, NO_BACKGROUND);
        let background = (background != NO_BACKGROUND && !background.is_empty())
            .then(|| PathBuf::from(background));

        let raw_font = load_string(store, FONT, DEFAULT_FONT);
        let font = FontDescription::try_parse(&raw_font).unwrap_or_else(|| {
            warn!("'{}' is not a valid font for '{}', using {}", raw_font, FONT, DEFAULT_FONT);
            store.set(FONT, DEFAULT_FONT);
            FontDescription::default()
        });

        store.set_default_if_absent(CURSOR_TYPE, CursorShape::Block.to_config());
        let cursor = match store.get_integer(CURSOR_TYPE).ok().and_then(CursorShape::from_config) {
            Some(shape) => shape,
            None => {
                warn!("Invalid value for '{}', using block cursor", CURSOR_TYPE);
                store.set(CURSOR_TYPE, CursorShape::Block.to_config());
                CursorShape::Block
            }
        };

        let word_chars = load_string(store, WORD_CHARS, DEFAULT_WORD_CHARS);
        let bindings = Bindings::load(store);
        let icon_file = load_string(store, ICON_FILE, DEFAULT_ICON_FILE);

        Self {
            forecolor,
            backcolor,
            opacity,
            background,
            font,
            cursor,
            word_chars,
            bindings,
            icon_file,
        }
    }
}

fn load_string(store: &mut ConfigStore, key: &str, default: &str) -> String {
    store.set_default_if_absent(key, default);
    store.get_string(key).unwrap_or_else(|e| {
        warn!("{}, using default", e);
        store.set(key, default);
        default.to_string()
    })
}

fn load_color(store: &mut ConfigStore, key: &str, default: Color) -> Color {
    let raw = load_string(store, key, &default.to_hex());
    Color::parse(&raw).unwrap_or_else(|| {
        warn!("'{}' is not a valid color for '{}', using {}", raw, key, default);
        store.set(key, default.to_hex());
        default
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_written_on_first_load() {
        let mut store = ConfigStore::new();
        let settings = Settings::load(&mut store);

        assert_eq!(settings, Settings::default());
        assert!(store.is_dirty());
        assert_eq!(store.get_string(FORECOLOR).unwrap(), "#c0c0c0");
        assert_eq!(store.get_integer(OPACITY_LEVEL).unwrap(), 99);
        assert_eq!(store.get_string(BACKGROUND).unwrap(), "none");
        assert_eq!(store.get_string(FONT).unwrap(), "Monospace 8");
        assert_eq!(store.get_integer(CURSOR_TYPE).unwrap(), 0);
        assert_eq!(store.get_string(WORD_CHARS).unwrap(), DEFAULT_WORD_CHARS);
        assert_eq!(store.get_integer(FONT_SIZE_ACCELERATOR).unwrap(), 4);
        assert_eq!(store.get_string(PASTE_KEY).unwrap(), "V");
        assert_eq!(store.get_string(ICON_FILE).unwrap(), "terminal-tango.svg");
    }

    #[test]
    fn test_existing_values_are_kept() {
        let mut store = ConfigStore::new();
        store.set(FORECOLOR, "#00ff00");
        store.set(OPACITY_LEVEL, 50_i64);
        store.set(BACKGROUND, "/tmp/wall.png");
        store.set(CURSOR_TYPE, 2_i64);
        store.set(COPY_KEY, "Y");

        let settings = Settings::load(&mut store);
        assert_eq!(settings.forecolor, Color::new(0, 0xff, 0));
        assert_eq!(settings.opacity.level(), 50);
        assert_eq!(settings.background, Some(PathBuf::from("/tmp/wall.png")));
        assert_eq!(settings.cursor, CursorShape::IBeam);
        assert_eq!(settings.bindings.copy_key, Keysym::from_ascii(b'Y'));
    }

    #[test]
    fn test_malformed_values_fall_back_to_defaults() {
        let mut store = ConfigStore::new();
        store.set(FORECOLOR, "greenish");
        store.set(OPACITY_LEVEL, "lots");
        store.set(CURSOR_TYPE, "VTE_CURSOR_SHAPE_BLOCK");
        store.set(FONT, "Monospace inf");

        let settings = Settings::load(&mut store);
        assert_eq!(settings.forecolor, DEFAULT_FORECOLOR);
        assert_eq!(settings.opacity, Opacity::OPAQUE);
        assert_eq!(settings.cursor, CursorShape::Block);
        assert_eq!(store.get_string(FORECOLOR).unwrap(), "#c0c0c0");
        assert_eq!(store.get_integer(CURSOR_TYPE).unwrap(), 0);
        assert_eq!(settings.font, FontDescription::default());
        assert_eq!(store.get_string(FONT).unwrap(), DEFAULT_FONT);
    }

    #[test]
    fn test_opacity_scale() {
        assert_eq!(Opacity::new(99).alpha(), 65535);
        assert_eq!(Opacity::new(0).alpha(), 0);
        assert_eq!(Opacity::new(50).alpha(), 33098);
        assert_eq!(Opacity::new(150).level(), 99);
        assert_eq!(Opacity::new(-3).level(), 0);

        for level in 0..=99 {
            let opacity = Opacity::new(level);
            assert_eq!(Opacity::from_alpha(opacity.alpha()), opacity);
        }
    }
}
