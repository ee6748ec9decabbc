//! Key mapping for accelerators
//!
//! Converts key events to the controller actions bound in the config file.
//! Unbound keys are left for the terminal.

use crossterm::event::{KeyCode, KeyEvent as CrosstermKeyEvent, KeyModifiers};

use super::accelerator::{Accelerator, ModifierMask};
use super::keysym::Keysym;
use crate::config::Bindings;

/// Key used with the scrollbar accelerator
const SCROLLBAR_KEY: Keysym = Keysym::from_ascii(b'S');

/// A key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub keyval: Keysym,
    pub state: ModifierMask,
    /// Caps Lock is engaged on the keyboard
    pub caps_lock: bool,
}

impl KeyEvent {
    pub fn new(keyval: Keysym, state: ModifierMask) -> Self {
        Self {
            keyval,
            state,
            caps_lock: false,
        }
    }
}

impl From<KeyModifiers> for ModifierMask {
    fn from(mods: KeyModifiers) -> Self {
        let mut result = ModifierMask::empty();
        if mods.contains(KeyModifiers::SHIFT) {
            result |= ModifierMask::SHIFT;
        }
        if mods.contains(KeyModifiers::CONTROL) {
            result |= ModifierMask::CONTROL;
        }
        if mods.contains(KeyModifiers::ALT) {
            result |= ModifierMask::MOD1;
        }
        if mods.contains(KeyModifiers::SUPER) {
            result |= ModifierMask::SUPER;
        }
        if mods.contains(KeyModifiers::HYPER) {
            result |= ModifierMask::HYPER;
        }
        if mods.contains(KeyModifiers::META) {
            result |= ModifierMask::META;
        }
        result
    }
}

impl KeyEvent {
    /// Convert a crossterm key event. Keys without a keysym give `None`.
    pub fn from_crossterm(event: &CrosstermKeyEvent) -> Option<Self> {
        let keyval = match event.code {
            KeyCode::Char(ch) => char_keysym(ch)?,
            KeyCode::Enter => Keysym(0xff0d),
            KeyCode::Backspace => Keysym(0xff08),
            KeyCode::Tab | KeyCode::BackTab => Keysym(0xff09),
            KeyCode::Esc => Keysym(0xff1b),
            KeyCode::Home => Keysym(0xff50),
            KeyCode::Left => Keysym(0xff51),
            KeyCode::Up => Keysym(0xff52),
            KeyCode::Right => Keysym(0xff53),
            KeyCode::Down => Keysym(0xff54),
            KeyCode::PageUp => Keysym(0xff55),
            KeyCode::PageDown => Keysym(0xff56),
            KeyCode::End => Keysym(0xff57),
            KeyCode::Insert => Keysym(0xff63),
            KeyCode::Delete => Keysym(0xffff),
            KeyCode::F(n @ 1..=12) => Keysym(0xffbe + u32::from(n) - 1),
            _ => return None,
        };

        let mut state = ModifierMask::from(event.modifiers);
        if event.code == KeyCode::BackTab {
            state |= ModifierMask::SHIFT;
        }

        Some(Self {
            keyval,
            state,
            caps_lock: event.state.contains(crossterm::event::KeyEventState::CAPS_LOCK),
        })
    }
}

fn char_keysym(ch: char) -> Option<Keysym> {
    let cp = ch as u32;
    match cp {
        0x20..=0x7e | 0xa0..=0xff => Some(Keysym(cp)),
        0x100.. => Some(Keysym(0x0100_0000 + cp)),
        _ => None,
    }
}

/// Actions reachable from the keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Copy,
    Paste,
    IncreaseFont,
    DecreaseFont,
    ToggleScrollbar,
}

/// Matches key events against the configured bindings
#[derive(Debug, Clone)]
pub struct KeyMapper {
    bindings: Bindings,
}

impl KeyMapper {
    pub fn new(bindings: Bindings) -> Self {
        Self { bindings }
    }

    /// Map a key press to an action, or `None` if the terminal should get it
    pub fn map(&self, event: &KeyEvent) -> Option<KeyAction> {
        let key = if event.caps_lock {
            event.keyval.to_upper()
        } else {
            event.keyval
        };
        let state = event.state;
        let b = &self.bindings;

        if Accelerator::new(b.copy, b.copy_key).matches(state, key) {
            return Some(KeyAction::Copy);
        }
        if Accelerator::new(b.copy, b.paste_key).matches(state, key) {
            return Some(KeyAction::Paste);
        }
        if Accelerator::new(b.font_size, Keysym::PLUS).matches(state, key) {
            return Some(KeyAction::IncreaseFont);
        }
        if Accelerator::new(b.font_size, Keysym::MINUS).matches(state, key) {
            return Some(KeyAction::DecreaseFont);
        }
        if Accelerator::new(b.scrollbar, SCROLLBAR_KEY).matches(state, key) {
            return Some(KeyAction::ToggleScrollbar);
        }
        None
    }
}
