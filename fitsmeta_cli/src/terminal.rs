//! Terminal detection for colored diagnostics

use is_terminal::IsTerminal;
use std::env;
use std::ffi::OsStr;
use std::io::stderr;

/// Check if stderr is connected to a terminal
pub fn stderr_is_terminal() -> bool {
    stderr().is_terminal()
}

/// Whether error messages on stderr should carry ANSI colors
///
/// Honours `NO_COLOR` and `TERM=dumb`, and never colors redirected output.
pub fn use_color() -> bool {
    color_allowed(
        env::var_os("NO_COLOR").as_deref(),
        env::var("TERM").ok().as_deref(),
        stderr_is_terminal(),
    )
}

fn color_allowed(no_color: Option<&OsStr>, term: Option<&str>, is_terminal: bool) -> bool {
    if no_color.is_some_and(|v| !v.is_empty()) {
        return false;
    }
    if term == Some("dumb") {
        return false;
    }
    is_terminal
}

/// Apply [`use_color`] to the `colored` crate's global switch
pub fn configure_color() {
    if !use_color() {
        colored::control::set_override(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_color_disables_color_on_a_terminal() {
        assert!(!color_allowed(Some(OsStr::new("1")), Some("xterm-256color"), true));
        assert!(color_allowed(Some(OsStr::new("")), Some("xterm-256color"), true));
    }

    #[test]
    fn test_dumb_terminal_gets_no_color() {
        assert!(!color_allowed(None, Some("dumb"), true));
        assert!(color_allowed(None, Some("xterm"), true));
        assert!(color_allowed(None, None, true));
    }

    #[test]
    fn test_redirected_stderr_gets_no_color() {
        assert!(!color_allowed(None, Some("xterm"), false));
    }
}
