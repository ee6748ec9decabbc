//! Child process lifecycle
//!
//! Tracks the single child started in the terminal: validation before spawn, the
//! transition to running, and the exit/EOF handling that saves the configuration
//! and closes the window unless `hold` is set.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::command::{find_executable, shell_argv0};
use super::widget::{SpawnSpec, TerminalWidget};
use crate::config::{ConfigStore, PersistenceError};

/// Warning shown when `--hold` is given without a command
pub const HOLD_WITHOUT_COMMAND: &str = "Hold option given without any command";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("{0} binary not found")]
    ExecutableNotFound(String),

    #[error("Empty exec string")]
    EmptyCommand,

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Child process already started")]
    AlreadyStarted,
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// What to run in the terminal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launch {
    /// A command from `-x` or `-e`
    Command(Vec<String>),
    /// The user's shell
    Shell { program: String, login: bool },
}

/// Child process state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessState {
    /// Not started yet, or the start failed
    Spawning { argv: Vec<String>, cwd: Option<PathBuf> },
    Running { pid: u32 },
    /// The child exited
    ExitedNormally,
    /// The terminal reached end of file
    ExitedEof,
}

impl ProcessState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessState::ExitedNormally | ProcessState::ExitedEof)
    }
}

/// Result of a successful spawn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnOutcome {
    pub pid: u32,
    /// Non-fatal problem to report to the user
    pub warning: Option<&'static str>,
}

/// What the controller should do after the child went away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Termination {
    pub close_window: bool,
    /// The configuration file was written
    pub saved: bool,
}

/// The child process
#[derive(Debug)]
pub struct SessionProcess {
    state: ProcessState,
    launch: Launch,
    hold: bool,
}

impl SessionProcess {
    pub fn new(launch: Launch, cwd: Option<PathBuf>, hold: bool) -> Self {
        let argv = match &launch {
            Launch::Command(argv) => argv.clone(),
            Launch::Shell { program, login } => vec![shell_argv0(program, *login)],
        };
        Self {
            state: ProcessState::Spawning { argv, cwd },
            launch,
            hold,
        }
    }

    pub fn state(&self) -> &ProcessState {
        &self.state
    }

    #[allow(dead_code)]
    pub fn hold(&self) -> bool {
        self.hold
    }

    /// Validate the command and start it in `widget`. On failure the state stays `Spawning`.
    pub fn spawn<W: TerminalWidget>(&mut self, widget: &mut W) -> Result<SpawnOutcome> {
        let (argv, cwd) = match &self.state {
            ProcessState::Spawning { argv, cwd } => (argv.clone(), cwd.clone()),
            _ => return Err(SessionError::AlreadyStarted),
        };

        let mut warning = None;
        let program_name = match &self.launch {
            Launch::Command(_) => argv.first().cloned().ok_or(SessionError::EmptyCommand)?,
            Launch::Shell { program, .. } => {
                if self.hold {
                    warn!("{}", HOLD_WITHOUT_COMMAND);
                    warning = Some(HOLD_WITHOUT_COMMAND);
                    self.hold = false;
                }
                program.clone()
            }
        };

        let program = find_executable(&program_name)
            .ok_or_else(|| SessionError::ExecutableNotFound(program_name.clone()))?;

        let spec = SpawnSpec { program, argv, cwd };
        let pid = widget.spawn(&spec).map_err(|source| SessionError::Spawn {
            program: program_name.clone(),
            source,
        })?;

        info!("Started {} (pid {})", program_name, pid);
        self.state = ProcessState::Running { pid };
        Ok(SpawnOutcome { pid, warning })
    }

    /// The child exited. Returns `None` if the session had already ended.
    pub fn on_child_exited(
        &mut self,
        store: &mut ConfigStore,
        config_path: &Path,
    ) -> std::result::Result<Option<Termination>, PersistenceError> {
        self.finish(ProcessState::ExitedNormally, store, config_path)
    }

    /// The terminal hit end of file. Returns `None` if the session had already ended.
    pub fn on_child_eof(
        &mut self,
        store: &mut ConfigStore,
        config_path: &Path,
    ) -> std::result::Result<Option<Termination>, PersistenceError> {
        self.finish(ProcessState::ExitedEof, store, config_path)
    }

    fn finish(
        &mut self,
        next: ProcessState,
        store: &mut ConfigStore,
        config_path: &Path,
    ) -> std::result::Result<Option<Termination>, PersistenceError> {
        if self.state.is_terminal() {
            debug!("Ignoring {:?}: session already ended as {:?}", next, self.state);
            return Ok(None);
        }

        info!("Child finished: {:?}", next);
        let running = match self.state {
            ProcessState::Running { pid } => Some(pid),
            _ => None,
        };
        self.state = next;

        let saved = store.flush(config_path)?;

        if self.hold {
            info!("Holding window open");
            return Ok(Some(Termination {
                close_window: false,
                saved,
            }));
        }

        if let Some(pid) = running {
            reap(pid);
        }
        Ok(Some(Termination {
            close_window: true,
            saved,
        }))
    }
}

/// Collect the child's exit status without blocking
#[cfg(unix)]
fn reap(pid: u32) {
    use nix::sys::wait::{waitpid, WaitPidFlag};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        debug!("pid {} out of range, not reaping", pid);
        return;
    };
    match waitpid(Pid::from_raw(raw), Some(WaitPidFlag::WNOHANG)) {
        Ok(status) => debug!("Reaped child {}: {:?}", pid, status),
        Err(e) => debug!("Could not reap child {}: {}", pid, e),
    }
}

#[cfg(not(unix))]
fn reap(pid: u32) {
    debug!("Not reaping child {} on this platform", pid);
}
