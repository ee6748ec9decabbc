//! Input handling.
//!
//! - **keysym**: X11 key symbols and their names
//! - **accelerator**: modifier masks and the config encoding of accelerators
//! - **keymapper**: key events to controller actions
//! - **context_menu**: right-click popup menu content

pub mod accelerator;
pub mod context_menu;
pub mod keymapper;
pub mod keysym;

pub use accelerator::ModifierMask;
