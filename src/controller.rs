//! Session controller.
//!
//! Owns the [`SessionContext`] and the widget/window pair, applies the configuration
//! at startup and handles every [`SessionEvent`] in arrival order.

use std::path::{Path, PathBuf};

use regex::Regex;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::settings::{self, NO_BACKGROUND};
use crate::config::{ConfigStore, CursorShape, Opacity, PersistenceError, Settings, XTERM_PALETTE};
use crate::core::command::{browser_command, default_browser};
use crate::core::geometry::{parse_geometry, GeometryReconciler, GridSize, PixelSize};
use crate::core::session::{SessionError, SessionProcess, Termination};
use crate::core::widget::{ColorChoice, HostWindow, TerminalWidget};
use crate::events::{ButtonEvent, SessionEvent};
use crate::font::FontDescription;
use crate::ui::context_menu::{MenuAction, PopupMenu};
use crate::ui::keymapper::{KeyAction, KeyEvent, KeyMapper};

/// Window title unless `--title` is given
pub const DEFAULT_TITLE: &str = "kestrel";

/// URLs highlighted in the terminal and opened with the open-URL accelerator
pub const URL_PATTERN: &str = r"(?i)(ftp|http)s?://[-a-zA-Z0-9.?$%&/=_~#.,:;+]*";

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

pub type Result<T> = std::result::Result<T, ControllerError>;

/// What the event loop should do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// The child is gone but the window stays open
    Held,
    Quit,
}

/// Command-line overrides applied at startup
#[derive(Debug, Clone, Default)]
pub struct StartupOptions {
    pub font: Option<String>,
    pub title: Option<String>,
    pub columns: Option<u16>,
    pub rows: Option<u16>,
    pub geometry: Option<String>,
}

/// All per-session state
pub struct SessionContext {
    pub store: ConfigStore,
    pub config_path: PathBuf,
    pub settings: Settings,
    pub geometry: GeometryReconciler,
    pub process: SessionProcess,
    pub keymapper: KeyMapper,
    /// URL under the pointer at the last button press
    pub current_match: Option<String>,
    pub scrollbar_visible: bool,
}

impl SessionContext {
    /// Load settings from `store`, writing defaults for absent keys
    pub fn new(mut store: ConfigStore, config_path: PathBuf, process: SessionProcess) -> Self {
        let settings = Settings::load(&mut store);
        let keymapper = KeyMapper::new(settings.bindings);
        Self {
            store,
            config_path,
            settings,
            geometry: GeometryReconciler::new(GridSize::default()),
            process,
            keymapper,
            current_match: None,
            scrollbar_visible: false,
        }
    }
}

pub struct SessionController<W: TerminalWidget, H: HostWindow> {
    ctx: SessionContext,
    widget: W,
    host: H,
}

impl<W: TerminalWidget, H: HostWindow> SessionController<W, H> {
    pub fn new(ctx: SessionContext, widget: W, host: H) -> Self {
        Self { ctx, widget, host }
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn widget(&self) -> &W {
        &self.widget
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Configure the terminal and window, then start the child.
    ///
    /// A missing executable is shown to the user and returned as an error.
    pub fn start(&mut self, options: &StartupOptions) -> Result<Flow> {
        if let Some(font) = &options.font {
            self.ctx.settings.font = FontDescription::parse(font);
        }
        let title = options.title.as_deref().unwrap_or(DEFAULT_TITLE);
        self.host.set_title(title);

        let s = &self.ctx.settings;
        self.widget.set_font(&s.font);
        self.widget.set_colors(s.forecolor, s.backcolor, &XTERM_PALETTE);
        if self.host.has_rgba() {
            self.widget.set_opacity(s.opacity.alpha());
        }
        self.widget.set_word_chars(&s.word_chars);
        self.widget.set_cursor_shape(s.cursor);
        debug!("Window icon {}", s.icon_file);

        match Regex::new(URL_PATTERN) {
            Ok(re) => {
                let tag = self.widget.match_add(&re);
                debug!("URL pattern registered as match {}", tag);
            }
            Err(e) => warn!("URL pattern rejected: {}", e),
        }

        if let Some(background) = self.ctx.settings.background.clone() {
            self.apply_background(&background);
        }

        let default = GridSize::default();
        self.ctx.geometry.set_grid(GridSize::new(
            options.columns.unwrap_or(default.columns),
            options.rows.unwrap_or(default.rows),
        ));
        self.set_size();

        if let Some(geometry) = &options.geometry {
            match parse_geometry(geometry) {
                Ok(spec) => {
                    if let Some(grid) = spec.grid {
                        self.ctx.geometry.set_grid(grid);
                        self.set_size();
                    }
                    if let Some(position) = spec.position {
                        self.host.move_to(position);
                    }
                }
                Err(e) => {
                    warn!("{}: {}", e, geometry);
                    self.host.show_error(&e.to_string());
                }
            }
        }

        match self.ctx.process.spawn(&mut self.widget) {
            Ok(outcome) => {
                debug!("Child running as pid {}", outcome.pid);
                if let Some(warning) = outcome.warning {
                    self.host.show_error(warning);
                }
                Ok(Flow::Continue)
            }
            Err(e) => {
                self.host.show_error(&e.to_string());
                Err(e.into())
            }
        }
    }

    /// Handle one event
    pub fn dispatch(&mut self, event: SessionEvent) -> Result<Flow> {
        debug!("Dispatching {:?}", event);
        match event {
            SessionEvent::Key(key) => {
                self.handle_key(&key);
                Ok(Flow::Continue)
            }
            SessionEvent::Button(button) => {
                self.handle_button(&button);
                Ok(Flow::Continue)
            }
            SessionEvent::Resize { width, height } => {
                self.ctx.geometry.on_user_resize(PixelSize::new(width, height));
                Ok(Flow::Continue)
            }
            SessionEvent::ChildExited => {
                let done = self
                    .ctx
                    .process
                    .on_child_exited(&mut self.ctx.store, &self.ctx.config_path)?;
                Ok(self.after_child(done))
            }
            SessionEvent::ChildEof => {
                let done = self
                    .ctx
                    .process
                    .on_child_eof(&mut self.ctx.store, &self.ctx.config_path)?;
                Ok(self.after_child(done))
            }
            SessionEvent::ConfigExternallyModified => {
                if self.ctx.store.take_external_modification() {
                    if self.ctx.store.is_dirty() {
                        warn!(
                            "{} was changed by another program; unsaved settings will overwrite it",
                            self.ctx.config_path.display()
                        );
                    } else {
                        info!("{} was changed by another program", self.ctx.config_path.display());
                    }
                }
                Ok(Flow::Continue)
            }
            SessionEvent::CloseRequested => {
                self.ctx.store.flush(&self.ctx.config_path)?;
                self.host.close();
                Ok(Flow::Quit)
            }
            SessionEvent::Menu(action) => {
                self.run_menu_action(action);
                Ok(Flow::Continue)
            }
        }
    }

    fn after_child(&mut self, done: Option<Termination>) -> Flow {
        let Some(done) = done else {
            return Flow::Continue;
        };
        debug!("Session ended, config written: {}", done.saved);
        if done.close_window {
            self.host.close();
            Flow::Quit
        } else {
            Flow::Held
        }
    }

    /// Resize the window for the current grid
    fn set_size(&mut self) {
        let metrics = self.widget.cell_metrics();
        let padding = self.widget.inner_padding();
        let grid = self.ctx.geometry.grid();
        let size = self.ctx.geometry.apply_size(grid, metrics, padding);
        debug!("Window size {}x{} for grid {}", size.width, size.height, self.ctx.geometry.grid());
        self.host.resize(size);
    }

    fn handle_key(&mut self, key: &KeyEvent) {
        let Some(action) = self.ctx.keymapper.map(key) else {
            return;
        };
        debug!("Key action {:?}", action);

        match action {
            KeyAction::Copy => self.widget.copy_clipboard(),
            KeyAction::Paste => self.widget.paste_clipboard(),
            KeyAction::IncreaseFont => {
                let font = self.ctx.settings.font.larger();
                self.change_font(font);
            }
            KeyAction::DecreaseFont => match self.ctx.settings.font.smaller() {
                Some(font) => self.change_font(font),
                None => debug!("Font already at minimum size"),
            },
            KeyAction::ToggleScrollbar => {
                self.ctx.scrollbar_visible = !self.ctx.scrollbar_visible;
                self.widget.set_scrollbar_visible(self.ctx.scrollbar_visible);
            }
        }
    }

    fn handle_button(&mut self, button: &ButtonEvent) {
        let metrics = self.widget.cell_metrics();
        let column = button.x / metrics.width.max(1);
        let row = button.y / metrics.height.max(1);
        self.ctx.current_match = self.widget.match_check(column, row).map(|(text, _)| text);

        let open_url = self.ctx.settings.bindings.open_url;
        if button.button == 1
            && open_url.is_held_in(button.state)
            && self.ctx.current_match.is_some()
        {
            self.open_url();
            return;
        }

        if button.button == 3 {
            let menu = PopupMenu::new(
                self.ctx.current_match.is_some(),
                self.ctx.settings.background.is_some(),
                self.ctx.settings.cursor,
            );
            if let Some(action) = self.host.show_popup(&menu) {
                self.run_menu_action(action);
            }
        }
    }

    fn run_menu_action(&mut self, action: MenuAction) {
        debug!("Menu action {:?}", action);
        match action {
            MenuAction::OpenLink => self.open_url(),
            MenuAction::CopyLink => match &self.ctx.current_match {
                Some(url) => self.host.set_clipboard_text(url),
                None => debug!("No link to copy"),
            },
            MenuAction::Copy => self.widget.copy_clipboard(),
            MenuAction::Paste => self.widget.paste_clipboard(),
            MenuAction::SelectFont => {
                if let Some(font) = self.host.choose_font(&self.ctx.settings.font) {
                    self.change_font(font);
                }
            }
            MenuAction::SelectColors => self.select_colors(),
            MenuAction::SelectBackground => {
                if let Some(path) = self.host.choose_background() {
                    self.apply_background(&path);
                }
            }
            MenuAction::ClearBackground => {
                self.widget.clear_background_image();
                self.ctx.settings.background = None;
                self.ctx.store.set(settings::BACKGROUND, NO_BACKGROUND);
            }
            MenuAction::SetOpacity => {
                if let Some(opacity) = self.host.choose_opacity(self.ctx.settings.opacity) {
                    self.set_opacity(opacity);
                }
            }
            MenuAction::SetTitle => {
                let current = self.host.title();
                match self.host.choose_title(&current) {
                    Some(title) if !title.is_empty() => self.host.set_title(&title),
                    _ => {}
                }
            }
            MenuAction::SetCursor(shape) => self.set_cursor(shape),
        }
    }

    /// Apply a new font and keep the grid size
    fn change_font(&mut self, font: FontDescription) {
        info!("Font changed to {}", font);
        self.widget.set_font(&font);
        self.set_size();
        self.ctx.store.set(settings::FONT, font.to_string());
        self.ctx.settings.font = font;
    }

    fn select_colors(&mut self) {
        let has_rgba = self.host.has_rgba();
        let s = &self.ctx.settings;
        let current = ColorChoice {
            foreground: s.forecolor,
            background: s.backcolor,
            alpha: has_rgba.then(|| s.opacity.alpha()),
        };

        let Some(choice) = self.host.choose_colors(current) else {
            return;
        };

        if let (true, Some(alpha)) = (has_rgba, choice.alpha) {
            let opacity = Opacity::from_alpha(alpha);
            self.widget.set_opacity(opacity.alpha());
            self.ctx.settings.opacity = opacity;
        }
        self.widget.set_colors(choice.foreground, choice.background, &XTERM_PALETTE);

        self.ctx.settings.forecolor = choice.foreground;
        self.ctx.settings.backcolor = choice.background;
        self.ctx.store.set(settings::FORECOLOR, choice.foreground.to_hex());
        self.ctx.store.set(settings::BACKCOLOR, choice.background.to_hex());
        self.ctx
            .store
            .set(settings::OPACITY_LEVEL, i64::from(self.ctx.settings.opacity.level()));
    }

    fn set_opacity(&mut self, opacity: Opacity) {
        if self.host.has_rgba() {
            self.widget.set_opacity(opacity.alpha());
        }
        self.ctx.settings.opacity = opacity;
        self.ctx.store.set(settings::OPACITY_LEVEL, i64::from(opacity.level()));
    }

    fn set_cursor(&mut self, shape: CursorShape) {
        self.widget.set_cursor_shape(shape);
        self.ctx.settings.cursor = shape;
        self.ctx.store.set(settings::CURSOR_TYPE, shape.to_config());
    }

    fn apply_background(&mut self, path: &Path) {
        match self.widget.set_background_image(path) {
            Ok(()) => {
                self.ctx.settings.background = Some(path.to_path_buf());
                self.ctx
                    .store
                    .set(settings::BACKGROUND, path.to_string_lossy().into_owned());
            }
            Err(e) => {
                warn!("Background {} not loaded: {}", path.display(), e);
                self.host
                    .show_error(&format!("Error loading image file: {}", e));
            }
        }
    }

    fn open_url(&mut self) {
        let Some(url) = self.ctx.current_match.clone() else {
            debug!("No link under the pointer");
            return;
        };

        let browser = default_browser(std::env::var("BROWSER").ok().as_deref());
        let result = browser_command(&browser, &url)
            .map_err(|e| e.to_string())
            .and_then(|argv| {
                info!("Opening {} with {}", url, browser);
                self.host.launch(&argv).map_err(|e| e.to_string())
            });

        if let Err(e) = result {
            warn!("Could not open {}: {}", url, e);
            self.host
                .show_error(&format!("Couldn't exec \"{}\": {}", browser, e));
        }
    }
}
