//! Colour-coded console echo of logged events.

use colored::{Color, Colorize};

use crate::types::Priority;

/// `ctime`-style date, e.g. `Mon Jan  2 15:04:05 UTC 2006`.
pub(crate) const UNIX_DATE_FORMAT: &str = "%a %b %e %H:%M:%S %Z %Y";

pub fn color(priority: Priority) -> Color {
    match priority {
        Priority::Debug => Color::Green,
        Priority::Info => Color::White,
        Priority::Warning => Color::Yellow,
        Priority::Error => Color::Red,
        Priority::Fatal => Color::Magenta,
    }
}

/// Builds the console line for an event: a bold coloured `<date>:<PREFIX>-`
/// header followed by the message.
pub fn render(message: &str, priority: Priority) -> String {
    let header = format!("{}:{}-", chrono::Utc::now().format(UNIX_DATE_FORMAT), priority.prefix());
    format!("{}{}", header.color(color(priority)).bold(), message)
}

pub fn echo(message: &str, priority: Priority) {
    println!("{}", render(message, priority));
}
