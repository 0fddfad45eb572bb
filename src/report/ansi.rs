//! The two styling roles diagnostics use: red for the offending site, blue
//! for the reference site being pointed back at.

use colored::{ColoredString, Colorize};

/// Style for the `error` keyword and the offending line/underline
pub fn error(s: &str) -> ColoredString {
    s.red().bold()
}

/// Style for the reference line/underline (the original allocation or
/// deletion being pointed back at)
pub fn reference(s: &str) -> ColoredString {
    s.blue().bold()
}

/// Force styling on or off regardless of whether stdout is a terminal.
/// Mostly for tests and captured output.
pub fn set_colors_enabled(enabled: bool) {
    colored::control::set_override(enabled)
}
