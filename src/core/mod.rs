//! Session core.
//!
//! - **geometry**: grid and window size reconciliation
//! - **command**: exec string parsing and executable lookup
//! - **session**: child process lifecycle
//! - **widget**: interfaces to the external terminal widget and host window
//!
//! # Architecture
//!
//! ```text
//! SessionController
//! ├── GeometryReconciler (grid <-> pixels)
//! ├── SessionProcess     (Spawning -> Running -> Exited)
//! └── TerminalWidget + HostWindow (external)
//! ```

pub mod command;
pub mod geometry;
pub mod session;
pub mod widget;
