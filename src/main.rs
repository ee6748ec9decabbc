//! kestrel - a single-window terminal session with persistent settings
//!
//! kestrel starts one child process in a terminal, applies the user's colors,
//! font and accelerators from `<config dir>/kestrel/kestrel.conf`, and saves any
//! changes made during the session when the child exits.
//!
//! # Quick Start
//!
//! ```text
//! kestrel                      # Start $SHELL
//! kestrel -l                   # Start $SHELL as a login shell
//! kestrel -x "htop -d 10"      # Run a command
//! kestrel -h -e make test      # Run a command and keep the window open afterwards
//! kestrel --geometry 120x40+0+0
//! ```
//!
//! # Accelerators
//!
//! | Key | Action |
//! |-----|--------|
//! | Ctrl+Shift+C | Copy |
//! | Ctrl+Shift+V | Paste |
//! | Ctrl+Shift+S | Toggle scrollbar |
//! | Ctrl++ / Ctrl+- | Font size |
//! | Ctrl+Shift+click | Open URL |

mod config;
mod controller;
mod core;
mod events;
mod font;
mod host;
mod ui;

#[cfg(test)]
mod testing;

use std::env;
use std::path::{Path, PathBuf};
use std::process;

use clap::error::ErrorKind;
use clap::{ArgAction, Parser};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::{ConfigStore, APP_NAME};
use crate::controller::{ControllerError, Flow, SessionContext, SessionController, StartupOptions};
use crate::core::command::{
    inject_xterm_separator, parse_command, parse_xterm_args, user_shell, CommandParseError,
};
use crate::core::session::{Launch, SessionProcess};
use crate::core::widget::{HostWindow, TerminalWidget};
use crate::events::{EventReceiver, EventSender, SessionEvent};
use crate::host::{HeadlessTerminal, HeadlessWindow};

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(
    name = "kestrel",
    about = "A terminal session with persistent settings",
    disable_help_flag = true,
    disable_version_flag = true
)]
struct Cli {
    /// Print version information and exit
    #[arg(short = 'v', long)]
    version: bool,

    /// Select initial terminal font
    #[arg(short = 'f', long, value_name = "FONT")]
    font: Option<String>,

    /// Execute command
    #[arg(short = 'x', long, value_name = "COMMAND")]
    execute: Option<String>,

    /// Execute command (last option in the command line)
    #[arg(short = 'e', long = "xterm-execute")]
    xterm_execute: bool,

    /// Use login shell
    #[arg(short = 'l', long)]
    login: bool,

    /// Set window title
    #[arg(short = 't', long, value_name = "TITLE")]
    title: Option<String>,

    /// Set columns number
    #[arg(short = 'c', long, value_name = "N")]
    columns: Option<u16>,

    /// Set rows number
    #[arg(short = 'r', long, value_name = "N")]
    rows: Option<u16>,

    /// Hold window after execute command
    #[arg(short = 'h', long)]
    hold: bool,

    /// X geometry specification, e.g. 80x24+0+0
    #[arg(long, value_name = "GEOMETRY")]
    geometry: Option<String>,

    /// Use a specific config file, relative to the config directory
    #[arg(long, value_name = "PATH")]
    config_file: Option<PathBuf>,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,

    /// Command and arguments for -e
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, hide = true)]
    command: Vec<String>,
}

impl Cli {
    /// What to run in the terminal. `-x` wins over `-e`.
    fn launch(&self) -> Result<Launch, CommandParseError> {
        if let Some(command) = &self.execute {
            return parse_command(command).map(Launch::Command);
        }
        if self.xterm_execute {
            return parse_xterm_args(&self.command).map(Launch::Command);
        }
        Ok(Launch::Shell {
            program: user_shell(),
            login: self.login,
        })
    }

    fn startup_options(&self) -> StartupOptions {
        StartupOptions {
            font: self.font.clone(),
            title: self.title.clone(),
            columns: self.columns,
            rows: self.rows,
            geometry: self.geometry.clone(),
        }
    }
}

/// Log to `<config dir>/kestrel.log`. Logging stays off if the file cannot be opened.
fn init_logging(dir: &Path) {
    let log_path = config::log_path(dir);
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn main() -> anyhow::Result<()> {
    let args = inject_xterm_separator(env::args());
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            let code = if e.kind() == ErrorKind::DisplayHelp { 0 } else { 1 };
            process::exit(code);
        }
    };

    if cli.version {
        println!("{} {}", APP_NAME, VERSION);
        process::exit(1);
    }

    if !cli.xterm_execute && !cli.command.is_empty() {
        eprintln!("Unexpected argument: {}. Use -e to run a command.", cli.command[0]);
        process::exit(1);
    }

    let dir = config::config_dir();
    let _ = std::fs::create_dir_all(&dir);
    init_logging(&dir);
    info!("kestrel {} starting...", VERSION);

    let config_path = config::config_path(&dir, cli.config_file.as_deref());
    config::ensure_parent_dir(&config_path)?;

    let mut store = match ConfigStore::load(&config_path) {
        Ok(store) => store,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    let mut window = HeadlessWindow::new();
    let launch = match cli.launch() {
        Ok(launch) => launch,
        Err(e) => {
            error!("{}", e);
            window.show_error(&e.to_string());
            process::exit(1);
        }
    };
    info!("Launch: {:?}", launch);

    let (tx, rx) = events::channel();

    let watch_tx = tx.clone();
    if let Err(e) = store.watch(&config_path, move || {
        let _ = watch_tx.send(SessionEvent::ConfigExternallyModified);
    }) {
        warn!("Not watching {}: {}", config_path.display(), e);
    }

    host::ignore_terminal_signals();

    let process = SessionProcess::new(launch, None, cli.hold);
    let ctx = SessionContext::new(store, config_path, process);
    let mut controller = SessionController::new(ctx, HeadlessTerminal::new(tx.clone()), window);

    let result = run(&mut controller, &cli.startup_options(), rx, tx);

    host::restore_terminal();

    match result {
        Ok(()) => {
            info!("kestrel exiting");
            Ok(())
        }
        Err(e) => {
            error!("{}", e);
            if let ControllerError::Persistence(_) = e {
                controller.host_mut().show_error(&e.to_string());
            }
            process::exit(1);
        }
    }
}

/// Start the session and dispatch events until the window closes
fn run(
    controller: &mut SessionController<HeadlessTerminal, HeadlessWindow>,
    options: &StartupOptions,
    rx: EventReceiver,
    tx: EventSender,
) -> Result<(), ControllerError> {
    controller.start(options)?;

    for event in rx.iter() {
        match controller.dispatch(event)? {
            Flow::Continue => {}
            Flow::Held => {
                let metrics = controller.widget().cell_metrics();
                host::start_hold_prompt(tx.clone(), metrics);
            }
            Flow::Quit => break,
        }
        if controller.host().is_closed() {
            break;
        }
    }

    info!(
        "Session ended in state {:?}, config saved: {}",
        controller.context().process.state(),
        !controller.context().store.is_dirty()
    );
    Ok(())
}
