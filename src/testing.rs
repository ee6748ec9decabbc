//! In-memory widget and window used by unit tests

use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::config::{Color, CursorShape, Opacity};
use crate::core::geometry::{CellMetrics, Padding, PixelSize, Position};
use crate::core::widget::{ColorChoice, HostWindow, MatchTag, SpawnSpec, TerminalWidget};
use crate::font::FontDescription;
use crate::ui::context_menu::{MenuAction, PopupMenu};

/// Records every call. Cells are `size` x `2 * size` pixels for the current font.
#[derive(Debug, Default)]
pub struct FakeWidget {
    pub font: Option<FontDescription>,
    pub colors: Option<(Color, Color)>,
    pub alpha: Option<u16>,
    pub cursor: Option<CursorShape>,
    pub word_chars: Option<String>,
    /// `(column, row, text)` reported by `match_check`
    pub matches: Vec<(u32, u32, String)>,
    pub patterns: Vec<String>,
    pub spawned: Vec<SpawnSpec>,
    pub fail_spawn: bool,
    pub copies: usize,
    pub pastes: usize,
    pub background: Option<PathBuf>,
    pub scrollbar: bool,
}

impl TerminalWidget for FakeWidget {
    fn set_font(&mut self, font: &FontDescription) {
        self.font = Some(font.clone());
    }

    fn set_colors(&mut self, foreground: Color, background: Color, _palette: &[Color; 16]) {
        self.colors = Some((foreground, background));
    }

    fn set_opacity(&mut self, alpha: u16) {
        self.alpha = Some(alpha);
    }

    fn set_cursor_shape(&mut self, shape: CursorShape) {
        self.cursor = Some(shape);
    }

    fn set_word_chars(&mut self, word_chars: &str) {
        self.word_chars = Some(word_chars.to_string());
    }

    fn cell_metrics(&self) -> CellMetrics {
        let size = self.font.as_ref().map_or(8.0, |f| f.size).round() as u32;
        CellMetrics::new(size, size * 2)
    }

    fn inner_padding(&self) -> Padding {
        Padding::new(2, 2)
    }

    fn spawn(&mut self, spec: &SpawnSpec) -> io::Result<u32> {
        if self.fail_spawn {
            return Err(io::Error::new(io::ErrorKind::Other, "fork failed"));
        }
        self.spawned.push(spec.clone());
        Ok(1_000_000 + self.spawned.len() as u32)
    }

    fn copy_clipboard(&mut self) {
        self.copies += 1;
    }

    fn paste_clipboard(&mut self) {
        self.pastes += 1;
    }

    fn match_add(&mut self, pattern: &Regex) -> MatchTag {
        self.patterns.push(pattern.as_str().to_string());
        self.patterns.len() as MatchTag - 1
    }

    fn match_check(&self, column: u32, row: u32) -> Option<(String, MatchTag)> {
        self.matches
            .iter()
            .find(|(c, r, _)| *c == column && *r == row)
            .map(|(_, _, text)| (text.clone(), 0))
    }

    fn set_background_image(&mut self, path: &Path) -> io::Result<()> {
        if !path.is_file() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "not a regular file"));
        }
        self.background = Some(path.to_path_buf());
        Ok(())
    }

    fn clear_background_image(&mut self) {
        self.background = None;
    }

    fn set_scrollbar_visible(&mut self, visible: bool) {
        self.scrollbar = visible;
    }
}

/// Records window calls. Dialogs return the preset `*_choice` values.
#[derive(Debug, Default)]
pub struct FakeWindow {
    pub title: String,
    pub sizes: Vec<PixelSize>,
    pub moved: Option<Position>,
    pub closed: bool,
    pub clipboard: Option<String>,
    pub errors: Vec<String>,
    pub popups: Vec<PopupMenu>,
    pub popup_choice: Option<MenuAction>,
    pub rgba: bool,
    pub font_choice: Option<FontDescription>,
    pub color_choice: Option<ColorChoice>,
    pub opacity_choice: Option<Opacity>,
    pub title_choice: Option<String>,
    pub background_choice: Option<PathBuf>,
    pub launched: Vec<Vec<String>>,
}

impl HostWindow for FakeWindow {
    fn resize(&mut self, size: PixelSize) {
        self.sizes.push(size);
    }

    fn move_to(&mut self, position: Position) {
        self.moved = Some(position);
    }

    fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn close(&mut self) {
        self.closed = true;
    }

    fn set_clipboard_text(&mut self, text: &str) {
        self.clipboard = Some(text.to_string());
    }

    fn show_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    fn show_popup(&mut self, menu: &PopupMenu) -> Option<MenuAction> {
        self.popups.push(menu.clone());
        self.popup_choice
    }

    fn has_rgba(&self) -> bool {
        self.rgba
    }

    fn choose_font(&mut self, _current: &FontDescription) -> Option<FontDescription> {
        self.font_choice.take()
    }

    fn choose_colors(&mut self, _current: ColorChoice) -> Option<ColorChoice> {
        self.color_choice.take()
    }

    fn choose_opacity(&mut self, _current: Opacity) -> Option<Opacity> {
        self.opacity_choice.take()
    }

    fn choose_title(&mut self, _current: &str) -> Option<String> {
        self.title_choice.take()
    }

    fn choose_background(&mut self) -> Option<PathBuf> {
        self.background_choice.take()
    }

    fn launch(&mut self, argv: &[String]) -> io::Result<()> {
        self.launched.push(argv.to_vec());
        Ok(())
    }
}
