//! Events consumed by
//! [`SessionController::dispatch`](crate::controller::SessionController::dispatch).
//!
//! Background threads (config watcher, child waiter, input reader) only ever send
//! these through the session channel. The controller handles them one at a time, in
//! arrival order, on the main thread.

use std::sync::mpsc::{Receiver, Sender};

use crate::ui::context_menu::MenuAction;
use crate::ui::keymapper::KeyEvent;
use crate::ui::ModifierMask;

/// A mouse button press, in pixels relative to the terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    /// 1 = left, 2 = middle, 3 = right
    pub button: u8,
    pub x: u32,
    pub y: u32,
    pub state: ModifierMask,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Key(KeyEvent),
    Button(ButtonEvent),
    /// The window now has this size in pixels
    Resize { width: u32, height: u32 },
    ChildExited,
    /// The terminal's PTY reached end of file
    #[allow(dead_code)]
    ChildEof,
    ConfigExternallyModified,
    /// The user asked to close the window
    CloseRequested,
    /// An entry was picked from a menu outside the popup
    #[allow(dead_code)]
    Menu(MenuAction),
}

pub type EventSender = Sender<SessionEvent>;
pub type EventReceiver = Receiver<SessionEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    std::sync::mpsc::channel()
}
