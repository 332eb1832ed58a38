//! Output formatting utilities for the CLI
//!
//! Status messages go to stderr so stdout carries nothing but session
//! output and can be piped.

use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

use crate::client::HealthStatus;

/// One-line summary of a health response
pub fn format_health(gateway: &str, health: &HealthStatus) -> String {
    if health.is_ok() {
        format!("Gateway {} is healthy", gateway)
    } else {
        format!("Gateway {} reported status '{}'", gateway, health.status)
    }
}

fn print_tagged(color: Color, tag: &str, msg: &str) {
    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(color),
        Print(tag),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print a success message in green with a checkmark prefix
pub fn print_success(msg: &str) {
    print_tagged(Color::Green, "✓ ", msg);
}

/// Print an error message in red with an X prefix
pub fn print_error(msg: &str) {
    print_tagged(Color::Red, "✗ ", msg);
}

/// Print a warning message in yellow
pub fn print_warning(msg: &str) {
    print_tagged(Color::Yellow, "⚠ ", msg);
}

/// Print an informational message in cyan
pub fn print_info(msg: &str) {
    print_tagged(Color::Cyan, "ℹ ", msg);
}
