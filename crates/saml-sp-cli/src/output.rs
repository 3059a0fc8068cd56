//! Output formatting utilities.

use colored::Colorize;
use serde::Serialize;

/// Prints an error message.
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Prints a warning message.
pub fn warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message);
}

/// Renders a value as pretty JSON.
pub fn json<T: Serialize>(value: &T) -> crate::CliResult<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
