//! Interfaces to the terminal widget and its host window.
//!
//! The terminal engine (grid, VT parsing, PTY I/O, rendering) and the windowing
//! toolkit are external. The controller drives them only through these traits.

use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;

use super::geometry::{CellMetrics, Padding, PixelSize, Position};
use crate::config::{Color, CursorShape, Opacity};
use crate::font::FontDescription;
use crate::ui::context_menu::{MenuAction, PopupMenu};

/// Identifies a pattern registered with [`TerminalWidget::match_add`]
pub type MatchTag = i32;

/// Everything needed to start the child
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnSpec {
    /// Program to execute
    pub program: PathBuf,
    /// Full argv, `argv[0]` included. For login shells `argv[0]` differs from `program`.
    pub argv: Vec<String>,
    /// Working directory, or the current directory if `None`
    pub cwd: Option<PathBuf>,
}

/// The terminal emulator widget
pub trait TerminalWidget {
    fn set_font(&mut self, font: &FontDescription);
    fn set_colors(&mut self, foreground: Color, background: Color, palette: &[Color; 16]);
    /// 16-bit background alpha
    fn set_opacity(&mut self, alpha: u16);
    fn set_cursor_shape(&mut self, shape: CursorShape);
    fn set_word_chars(&mut self, word_chars: &str);

    /// Cell size for the current font
    fn cell_metrics(&self) -> CellMetrics;
    /// Inner border around the grid
    fn inner_padding(&self) -> Padding;

    /// Start the child on the terminal's PTY. Returns its pid.
    fn spawn(&mut self, spec: &SpawnSpec) -> io::Result<u32>;

    fn copy_clipboard(&mut self);
    fn paste_clipboard(&mut self);

    /// Highlight text matching `pattern`
    fn match_add(&mut self, pattern: &Regex) -> MatchTag;
    /// Matched text under the cell at `column`, `row`
    fn match_check(&self, column: u32, row: u32) -> Option<(String, MatchTag)>;

    fn set_background_image(&mut self, path: &Path) -> io::Result<()>;
    fn clear_background_image(&mut self);
    fn set_scrollbar_visible(&mut self, visible: bool);
}

/// Values edited by the color dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorChoice {
    pub foreground: Color,
    pub background: Color,
    /// Background alpha, only offered when the display supports transparency
    pub alpha: Option<u16>,
}

/// The top-level window and its modal dialogs. Dialogs return `None` on cancel.
pub trait HostWindow {
    fn resize(&mut self, size: PixelSize);
    fn move_to(&mut self, position: Position);
    fn set_title(&mut self, title: &str);
    fn title(&self) -> String;
    fn close(&mut self);

    fn set_clipboard_text(&mut self, text: &str);
    fn show_error(&mut self, message: &str);
    fn show_popup(&mut self, menu: &PopupMenu) -> Option<MenuAction>;

    /// The display can draw a translucent background
    fn has_rgba(&self) -> bool;

    fn choose_font(&mut self, current: &FontDescription) -> Option<FontDescription>;
    fn choose_colors(&mut self, current: ColorChoice) -> Option<ColorChoice>;
    fn choose_opacity(&mut self, current: Opacity) -> Option<Opacity>;
    fn choose_title(&mut self, current: &str) -> Option<String>;
    fn choose_background(&mut self) -> Option<PathBuf>;

    /// Start a detached helper program such as the web browser
    fn launch(&mut self, argv: &[String]) -> io::Result<()>;
}
