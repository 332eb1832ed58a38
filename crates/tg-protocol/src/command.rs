//! Exec command tokenizing

/// Command run when the caller does not supply one
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Split a command string into an argument vector.
///
/// Tokens are separated by runs of whitespace. There is no quoting or
/// escaping: `sh -c "echo hi"` yields `["sh", "-c", "\"echo", "hi\""]`.
/// A blank command yields the default shell.
pub fn split_command(command: Option<&str>) -> Vec<String> {
    let argv: Vec<String> = command
        .unwrap_or_default()
        .split_whitespace()
        .map(str::to_string)
        .collect();

    if argv.is_empty() {
        vec![DEFAULT_SHELL.to_string()]
    } else {
        argv
    }
}
