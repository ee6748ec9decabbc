//! Configuration for kestrel.
//!
//! This module provides:
//! - [`ConfigStore`]: the `[kestrel]` key/value group, persisted as TOML
//! - [`ConfigWatcher`]: detection of edits made by other processes
//! - [`Settings`]: the typed view the controller applies to the terminal
//!
//! # Configuration File
//!
//! The file lives at `<user config dir>/kestrel/kestrel.conf`:
//!
//! ```toml
//! [kestrel]
//! forecolor = "#c0c0c0"
//! backcolor = "#000000"
//! opacity_level = 99
//! background = "none"
//! font = "Monospace 8"
//! cursor_type = 0
//! copy_accelerator = 5
//! copy_key = "C"
//! ```
//!
//! Every key is written with its default the first time it is read, so a fresh
//! install ends up with a complete, editable file after the first session.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

pub mod settings;
pub mod store;
pub mod watcher;

pub use settings::{Bindings, CursorShape, Opacity, Settings};
pub use store::{ConfigStore, PersistenceError};

/// Directory and file stem used for everything kestrel writes
pub const APP_NAME: &str = "kestrel";

const CONFIG_FILE: &str = "kestrel.conf";
const LOG_FILE: &str = "kestrel.log";

/// `<user config dir>/kestrel`, falling back to `~/.config/kestrel`
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Config file path. A user-supplied name is resolved relative to the config directory.
pub fn config_path(dir: &Path, custom: Option<&Path>) -> PathBuf {
    match custom {
        Some(file) => dir.join(file),
        None => dir.join(CONFIG_FILE),
    }
}

pub fn log_path(dir: &Path) -> PathBuf {
    dir.join(LOG_FILE)
}

/// Create the directory that will hold `path`
pub fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Color definition (RGB)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` or `#rgb`
    pub fn parse(s: &str) -> Option<Self> {
        let hex = s.trim().strip_prefix('#')?;
        if !hex.is_ascii() {
            return None;
        }
        let channel =
            |i: usize, len: usize| u8::from_str_radix(&hex[i * len..(i + 1) * len], 16).ok();

        match hex.len() {
            6 => Some(Self::new(channel(0, 2)?, channel(1, 2)?, channel(2, 2)?)),
            3 => {
                let (r, g, b) = (channel(0, 1)?, channel(1, 1)?, channel(2, 1)?);
                Some(Self::new(r * 0x11, g * 0x11, b * 0x11))
            }
            _ => None,
        }
    }

    /// `#rrggbb`
    pub fn to_hex(&self) -> String {
        self.to_string()
    }

    /// X11 color spec (`rgb:rr/gg/bb`) for OSC color sequences
    pub fn to_x11_spec(&self) -> String {
        format!("rgb:{:02x}/{:02x}/{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// The xterm 16-color palette
pub const XTERM_PALETTE: [Color; 16] = [
    Color::new(0x00, 0x00, 0x00),
    Color::new(0xcd, 0x00, 0x00),
    Color::new(0x00, 0xcd, 0x00),
    Color::new(0xcd, 0xcd, 0x00),
    Color::new(0x1e, 0x90, 0xff),
    Color::new(0xcd, 0x00, 0xcd),
    Color::new(0x00, 0xcd, 0xcd),
    Color::new(0xe5, 0xe5, 0xe5),
    Color::new(0x4c, 0x4c, 0x4c),
    Color::new(0xff, 0x00, 0x00),
    Color::new(0x00, 0xff, 0x00),
    Color::new(0xff, 0xff, 0x00),
    Color::new(0x46, 0x82, 0xb4),
    Color::new(0xff, 0x00, 0xff),
    Color::new(0x00, 0xff, 0xff),
    Color::new(0xff, 0xff, 0xff),
];
