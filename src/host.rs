//! Headless host
//!
//! Runs the session on the terminal kestrel was started from. The child inherits
//! the controlling terminal, so drawing and PTY I/O stay with the host terminal;
//! settings that have an escape sequence (colors, cursor, title, window size) are
//! forwarded, the rest are logged.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use crossterm::cursor::SetCursorStyle;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEventKind,
};
use crossterm::execute;
use crossterm::style::Stylize;
use crossterm::terminal::{self, SetTitle};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::{Color, CursorShape, Opacity, APP_NAME};
use crate::core::geometry::{CellMetrics, Offset, Padding, PixelSize, Position};
use crate::core::widget::{ColorChoice, HostWindow, MatchTag, SpawnSpec, TerminalWidget};
use crate::events::{ButtonEvent, EventSender, SessionEvent};
use crate::font::FontDescription;
use crate::ui::context_menu::{MenuAction, PopupMenu};
use crate::ui::keymapper::KeyEvent;
use crate::ui::ModifierMask;

const HOLD_PROMPT: &str = "Process exited. Press Enter to close.";

/// Padding assumed around the host terminal's grid
const PADDING: Padding = Padding::new(2, 2);

fn write_sequence(seq: &str) {
    let mut out = io::stdout();
    if let Err(e) = out.write_all(seq.as_bytes()).and_then(|_| out.flush()) {
        debug!("Failed to write control sequence: {}", e);
    }
}

/// Approximate cell size for a font at 96 dpi
fn estimate_metrics(font: &FontDescription) -> CellMetrics {
    let pixels = font.size * 96.0 / 72.0;
    let width = (pixels * 0.6).round().max(1.0) as u32;
    let height = (pixels * 1.2).round().max(1.0) as u32;
    CellMetrics::new(width, height)
}

/// The host terminal, driven through escape sequences
pub struct HeadlessTerminal {
    font: FontDescription,
    events: EventSender,
    patterns: Vec<Regex>,
}

impl HeadlessTerminal {
    pub fn new(events: EventSender) -> Self {
        Self {
            font: FontDescription::default(),
            events,
            patterns: Vec::new(),
        }
    }
}

impl TerminalWidget for HeadlessTerminal {
    fn set_font(&mut self, font: &FontDescription) {
        debug!("Font {} (host terminal keeps its own)", font);
        self.font = font.clone();
    }

    fn set_colors(&mut self, foreground: Color, background: Color, palette: &[Color; 16]) {
        let mut seq = format!(
            "\x1b]10;{}\x07\x1b]11;{}\x07",
            foreground.to_x11_spec(),
            background.to_x11_spec()
        );
        for (i, color) in palette.iter().enumerate() {
            seq.push_str(&format!("\x1b]4;{};{}\x07", i, color.to_x11_spec()));
        }
        write_sequence(&seq);
    }

    fn set_opacity(&mut self, alpha: u16) {
        debug!("Opacity alpha {} not supported by host terminal", alpha);
    }

    fn set_cursor_shape(&mut self, shape: CursorShape) {
        let style = match shape {
            CursorShape::Block => SetCursorStyle::SteadyBlock,
            CursorShape::Underline => SetCursorStyle::SteadyUnderScore,
            CursorShape::IBeam => SetCursorStyle::SteadyBar,
        };
        if let Err(e) = execute!(io::stdout(), style) {
            debug!("Failed to set cursor shape: {}", e);
        }
    }

    fn set_word_chars(&mut self, word_chars: &str) {
        debug!("Word characters: {}", word_chars);
    }

    fn cell_metrics(&self) -> CellMetrics {
        estimate_metrics(&self.font)
    }

    fn inner_padding(&self) -> Padding {
        PADDING
    }

    fn spawn(&mut self, spec: &SpawnSpec) -> io::Result<u32> {
        let mut command = Command::new(&spec.program);
        command.args(spec.argv.iter().skip(1));
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            if let Some(argv0) = spec.argv.first() {
                command.arg0(argv0);
            }
        }
        if let Some(cwd) = &spec.cwd {
            command.current_dir(cwd);
        }

        let mut child = command.spawn()?;
        let pid = child.id();

        let events = self.events.clone();
        thread::spawn(move || {
            match child.wait() {
                Ok(status) => info!("Child {} exited: {}", pid, status),
                Err(e) => warn!("Waiting for child {} failed: {}", pid, e),
            }
            let _ = events.send(SessionEvent::ChildExited);
        });

        Ok(pid)
    }

    fn copy_clipboard(&mut self) {
        debug!("No selection to copy in host terminal");
    }

    fn paste_clipboard(&mut self) {
        match arboard::Clipboard::new().and_then(|mut c| c.get_text()) {
            Ok(text) => debug!("Clipboard holds {} bytes; host terminal handles paste", text.len()),
            Err(e) => debug!("Clipboard unavailable: {}", e),
        }
    }

    fn match_add(&mut self, pattern: &Regex) -> MatchTag {
        self.patterns.push(pattern.clone());
        self.patterns.len() as MatchTag - 1
    }

    fn match_check(&self, _column: u32, _row: u32) -> Option<(String, MatchTag)> {
        // Cell contents live in the host terminal
        None
    }

    fn set_background_image(&mut self, path: &Path) -> io::Result<()> {
        if !path.metadata()?.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }
        info!("Background {} (not drawn by host terminal)", path.display());
        Ok(())
    }

    fn clear_background_image(&mut self) {
        debug!("Background cleared");
    }

    fn set_scrollbar_visible(&mut self, visible: bool) {
        debug!("Scrollbar visible: {}", visible);
    }
}

/// The host terminal's window
pub struct HeadlessWindow {
    title: String,
    closed: bool,
}

impl Default for HeadlessWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessWindow {
    pub fn new() -> Self {
        Self {
            title: APP_NAME.to_string(),
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl HostWindow for HeadlessWindow {
    fn resize(&mut self, size: PixelSize) {
        write_sequence(&format!("\x1b[4;{};{}t", size.height, size.width));
    }

    fn move_to(&mut self, position: Position) {
        match (position.x, position.y) {
            (Offset::FromStart(x), Offset::FromStart(y)) => {
                write_sequence(&format!("\x1b[3;{};{}t", x, y));
            }
            _ => debug!("Positions relative to the right or bottom edge are not supported"),
        }
    }

    fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
        if let Err(e) = execute!(io::stdout(), SetTitle(title)) {
            debug!("Failed to set title: {}", e);
        }
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        restore_terminal();
    }

    fn set_clipboard_text(&mut self, text: &str) {
        if let Err(e) = arboard::Clipboard::new().and_then(|mut c| c.set_text(text)) {
            warn!("Clipboard unavailable: {}", e);
        }
    }

    fn show_error(&mut self, message: &str) {
        let _ = terminal::disable_raw_mode();
        eprintln!("{} {}", format!("{}:", APP_NAME).red().bold(), message);
    }

    fn show_popup(&mut self, menu: &PopupMenu) -> Option<MenuAction> {
        let labels: Vec<String> = menu
            .items()
            .iter()
            .map(|item| match item.checked {
                Some(true) => format!("({})", item.label),
                _ => item.label.to_string(),
            })
            .collect();
        debug!("Popup menu not shown: {}", labels.join(", "));
        None
    }

    fn has_rgba(&self) -> bool {
        false
    }

    fn choose_font(&mut self, _current: &FontDescription) -> Option<FontDescription> {
        None
    }

    fn choose_colors(&mut self, _current: ColorChoice) -> Option<ColorChoice> {
        None
    }

    fn choose_opacity(&mut self, _current: Opacity) -> Option<Opacity> {
        None
    }

    fn choose_title(&mut self, _current: &str) -> Option<String> {
        None
    }

    fn choose_background(&mut self) -> Option<PathBuf> {
        None
    }

    fn launch(&mut self, argv: &[String]) -> io::Result<()> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command"))?;
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        thread::spawn(move || {
            let _ = child.wait();
        });
        Ok(())
    }
}

/// Leave raw mode, stop mouse reporting and reset the cursor
pub fn restore_terminal() {
    let _ = terminal::disable_raw_mode();
    let _ = execute!(io::stdout(), DisableMouseCapture, SetCursorStyle::DefaultUserShape);
    print!("\x1b[0m");
    let _ = io::stdout().flush();
}

/// Keep SIGINT and SIGQUIT from the terminal for the child.
///
/// A caught signal is reset to its default on exec, so the child still gets the
/// usual behaviour.
#[cfg(unix)]
pub fn ignore_terminal_signals() {
    use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

    extern "C" fn noop(_: nix::libc::c_int) {}

    let action = SigAction::new(SigHandler::Handler(noop), SaFlags::SA_RESTART, SigSet::empty());
    for sig in [Signal::SIGINT, Signal::SIGQUIT] {
        // SAFETY: the handler does nothing and is async-signal-safe
        if let Err(e) = unsafe { sigaction(sig, &action) } {
            warn!("Could not install {} handler: {}", sig, e);
        }
    }
}

#[cfg(not(unix))]
pub fn ignore_terminal_signals() {}

/// Show the hold prompt and read keys and clicks until the user closes the window
pub fn start_hold_prompt(events: EventSender, metrics: CellMetrics) {
    println!();
    println!("{}", HOLD_PROMPT.bold());

    thread::spawn(move || {
        if let Err(e) = terminal::enable_raw_mode() {
            warn!("Raw mode unavailable: {}", e);
        }
        if let Err(e) = execute!(io::stdout(), EnableMouseCapture) {
            debug!("Mouse reporting unavailable: {}", e);
        }
        loop {
            let event = match event::read() {
                Ok(event) => event,
                Err(e) => {
                    warn!("Input error: {}", e);
                    let _ = events.send(SessionEvent::CloseRequested);
                    break;
                }
            };

            let message = match event {
                Event::Key(key) if key.kind != KeyEventKind::Press => continue,
                Event::Key(key) if matches!(key.code, KeyCode::Enter | KeyCode::Esc) => {
                    SessionEvent::CloseRequested
                }
                Event::Key(key) => match KeyEvent::from_crossterm(&key) {
                    Some(key) => SessionEvent::Key(key),
                    None => continue,
                },
                Event::Mouse(mouse) => {
                    let button = match mouse.kind {
                        MouseEventKind::Down(MouseButton::Left) => 1,
                        MouseEventKind::Down(MouseButton::Middle) => 2,
                        MouseEventKind::Down(MouseButton::Right) => 3,
                        _ => continue,
                    };
                    SessionEvent::Button(ButtonEvent {
                        button,
                        x: metrics.width * u32::from(mouse.column),
                        y: metrics.height * u32::from(mouse.row),
                        state: ModifierMask::from(mouse.modifiers),
                    })
                }
                Event::Resize(columns, rows) => SessionEvent::Resize {
                    width: PADDING.x + metrics.width * u32::from(columns),
                    height: PADDING.y + metrics.height * u32::from(rows),
                },
                _ => continue,
            };

            let closing = message == SessionEvent::CloseRequested;
            if events.send(message).is_err() || closing {
                break;
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::{derive_pixels, GridSize};
    use crate::events;

    #[test]
    fn test_estimated_metrics_grow_with_font() {
        let small = estimate_metrics(&FontDescription::parse("Monospace 8"));
        let large = estimate_metrics(&FontDescription::parse("Monospace 16"));
        assert!(large.width > small.width);
        assert!(large.height > small.height);
        assert!(small.width >= 1 && small.height >= 1);
    }

    #[test]
    fn test_unusable_font_size_gives_sane_window() {
        let metrics = estimate_metrics(&FontDescription::parse("Monospace inf"));
        assert_eq!(metrics, estimate_metrics(&FontDescription::default()));

        let huge = estimate_metrics(&FontDescription::parse("Monospace 1e300"));
        let size = derive_pixels(GridSize::new(80, 24), huge, PADDING);
        assert!(size.width < 100_000 && size.height < 100_000);
    }

    #[test]
    fn test_background_must_be_regular_file() {
        let (tx, _rx) = events::channel();
        let mut terminal = HeadlessTerminal::new(tx);
        let dir = tempfile::TempDir::new().unwrap();

        assert!(terminal.set_background_image(dir.path()).is_err());
        assert!(terminal.set_background_image(&dir.path().join("missing.png")).is_err());

        let image = dir.path().join("wall.png");
        std::fs::write(&image, b"png").unwrap();
        assert!(terminal.set_background_image(&image).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_spawn_reports_exit() {
        let (tx, rx) = events::channel();
        let mut terminal = HeadlessTerminal::new(tx);
        let spec = SpawnSpec {
            program: PathBuf::from("/bin/sh"),
            argv: vec!["sh".into(), "-c".into(), "exit 0".into()],
            cwd: None,
        };
        terminal.spawn(&spec).unwrap();
        assert_eq!(
            rx.recv_timeout(std::time::Duration::from_secs(10)).unwrap(),
            SessionEvent::ChildExited
        );
    }

    #[test]
    fn test_launch_rejects_empty_command() {
        let mut window = HeadlessWindow::new();
        assert!(window.launch(&[]).is_err());
    }
}
