//! Command-line handling for the child process.
//!
//! `-x "cmd args"` takes a single string; `-e cmd args...` takes everything after it.
//! Both are split with POSIX shell rules.

use std::env;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shell used when `$SHELL` is unset
pub const FALLBACK_SHELL: &str = "/bin/sh";

/// Ways an exec string can fail to parse
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("Empty exec string")]
    EmptyString,

    #[error("Cannot parse command line arguments: mangled quoting")]
    BadQuoting,

    #[error("Error in exec option command line arguments")]
    GenericFailure,
}

/// Split an exec string into argv
pub fn parse_command(command: &str) -> Result<Vec<String>, CommandParseError> {
    if command.trim().is_empty() {
        return Err(CommandParseError::EmptyString);
    }
    if command.contains('\0') {
        return Err(CommandParseError::GenericFailure);
    }

    let argv = shell_words::split(command).map_err(|_| CommandParseError::BadQuoting)?;

    // Only a comment, e.g. "# nothing"
    if argv.is_empty() {
        return Err(CommandParseError::GenericFailure);
    }
    Ok(argv)
}

/// Parse the arguments following `-e`. They are re-joined with spaces and split again,
/// so quoting inside a single argument is honoured.
pub fn parse_xterm_args(args: &[String]) -> Result<Vec<String>, CommandParseError> {
    parse_command(&args.join(" "))
}

/// Put `--` after the first bare `-e` so the option parser leaves the command's own
/// flags alone.
pub fn inject_xterm_separator<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut out = Vec::new();
    let mut injected = false;
    for arg in args {
        let is_xterm = !injected && arg == "-e";
        out.push(arg);
        if is_xterm {
            out.push("--".to_string());
            injected = true;
        }
    }
    out
}

/// Locate `name` on `PATH`. Names containing a `/` are checked as given.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }

    if name.contains('/') {
        let path = Path::new(name);
        return is_executable(path).then(|| path.to_path_buf());
    }

    let path_var = env::var_os("PATH")?;
    env::split_paths(&path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// The user's shell: `$SHELL`, or `/bin/sh`
pub fn user_shell() -> String {
    env::var("SHELL")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| FALLBACK_SHELL.to_string())
}

/// `argv[0]` for a shell; login shells get a leading `-`
pub fn shell_argv0(shell: &str, login: bool) -> String {
    if login {
        format!("-{}", shell)
    } else {
        shell.to_string()
    }
}

/// Browser used to open URLs: `$BROWSER` if set, then `xdg-open`, then `firefox`
pub fn default_browser(configured: Option<&str>) -> String {
    match configured.map(str::trim).filter(|s| !s.is_empty()) {
        Some(browser) => browser.to_string(),
        None if find_executable("xdg-open").is_some() => "xdg-open".to_string(),
        None => "firefox".to_string(),
    }
}

/// argv that opens `url` with `browser`. The URL is always a single argument.
pub fn browser_command(browser: &str, url: &str) -> Result<Vec<String>, CommandParseError> {
    let mut argv = parse_command(browser)?;
    argv.push(url.to_string());
    Ok(argv)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(
            parse_command("vim -c 'set nu' \"my file\"").unwrap(),
            strings(&["vim", "-c", "set nu", "my file"])
        );
    }

    #[test]
    fn test_parse_command_errors() {
        assert_eq!(parse_command(""), Err(CommandParseError::EmptyString));
        assert_eq!(parse_command("   "), Err(CommandParseError::EmptyString));
        assert_eq!(parse_command("echo 'unterminated"), Err(CommandParseError::BadQuoting));
        assert_eq!(parse_command("# only a comment"), Err(CommandParseError::GenericFailure));
        assert_eq!(parse_command("ls\0-l"), Err(CommandParseError::GenericFailure));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(CommandParseError::EmptyString.to_string(), "Empty exec string");
        assert_eq!(
            CommandParseError::BadQuoting.to_string(),
            "Cannot parse command line arguments: mangled quoting"
        );
    }

    #[test]
    fn test_parse_xterm_args() {
        assert_eq!(
            parse_xterm_args(&strings(&["ssh", "host", "'uptime -p'"])).unwrap(),
            strings(&["ssh", "host", "uptime -p"])
        );
        assert_eq!(parse_xterm_args(&[]), Err(CommandParseError::EmptyString));
    }

    #[test]
    fn test_inject_xterm_separator() {
        assert_eq!(
            inject_xterm_separator(strings(&["kestrel", "-h", "-e", "grep", "-e", "x"])),
            strings(&["kestrel", "-h", "-e", "--", "grep", "-e", "x"])
        );
        assert_eq!(
            inject_xterm_separator(strings(&["kestrel", "--execute", "ls"])),
            strings(&["kestrel", "--execute", "ls"])
        );
    }

    #[test]
    fn test_find_executable() {
        assert!(find_executable("/bin/sh").is_some());
        assert!(find_executable("sh").is_some());
        assert!(find_executable("/bin/nonexistent").is_none());
        assert!(find_executable("definitely-not-a-real-binary-kestrel").is_none());
        assert!(find_executable("").is_none());
    }

    #[test]
    fn test_browser_command() {
        assert_eq!(
            browser_command("firefox --new-tab", "http://a.b/?q=1&r=2").unwrap(),
            strings(&["firefox", "--new-tab", "http://a.b/?q=1&r=2"])
        );
        assert_eq!(
            browser_command("", "http://a.b"),
            Err(CommandParseError::EmptyString)
        );
        assert_eq!(default_browser(Some("w3m")), "w3m");
        assert_ne!(default_browser(Some("  ")), "  ");
    }

    #[test]
    fn test_shell_argv0() {
        assert_eq!(shell_argv0("/bin/bash", true), "-/bin/bash");
        assert_eq!(shell_argv0("/bin/bash", false), "/bin/bash");
    }
}
