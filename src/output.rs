//! Colored log output and GitHub Actions workflow commands
//!
//! ERROR HANDLING STRATEGY FOR DECORATIVE I/O:
//! All termcolor operations use `let _ =` to deliberately ignore errors.
//! Colored output is decorative and non-essential. If stderr/stdout is unavailable
//! (broken pipe, no TTY, etc.), the job continues without colors.
//!
//! Every line goes through the global [`Redactor`](crate::redact::Redactor)
//! before it is written.

use std::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use termcolor::{BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

use crate::redact;

static DEBUG: AtomicBool = AtomicBool::new(false);

/// Enable or disable debug lines outside of Actions
pub fn set_debug(enabled: bool) {
    DEBUG.store(enabled, Ordering::Relaxed);
}

#[must_use]
pub fn debug_enabled() -> bool {
    DEBUG.load(Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Success,
    Warn,
    Error,
}

/// Print info messages
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::output::emit($crate::output::Level::Info, format_args!($($arg)*))
    };
}

/// Print success messages with green color
#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {
        $crate::output::emit($crate::output::Level::Success, format_args!($($arg)*))
    };
}

/// Print warnings with yellow color
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::output::emit($crate::output::Level::Warn, format_args!($($arg)*))
    };
}

/// Print errors with red color
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::output::emit($crate::output::Level::Error, format_args!($($arg)*))
    };
}

/// Print debug messages, only visible in debug mode
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::output::emit($crate::output::Level::Debug, format_args!($($arg)*))
    };
}

/// Write one redacted log line at `level`
pub fn emit(level: Level, args: fmt::Arguments<'_>) {
    let text = redact::global().redact(&args.to_string());

    if redact::running_in_actions() {
        match level {
            // The runner decides whether debug lines are shown
            Level::Debug => println!("::debug::{}", escape_command_data(&text)),
            Level::Error => println!("::error::{}", escape_command_data(&text)),
            Level::Warn => println!("::warning::{}", escape_command_data(&text)),
            Level::Info | Level::Success => write_colored(level, &text),
        }
        return;
    }

    if level == Level::Debug && !debug_enabled() {
        return;
    }
    write_colored(level, &text);
}

fn write_colored(level: Level, text: &str) {
    let bufwtr = match level {
        Level::Warn | Level::Error => BufferWriter::stderr(ColorChoice::Auto),
        _ => BufferWriter::stdout(ColorChoice::Auto),
    };
    let mut buffer = bufwtr.buffer();

    let (color, prefix) = match level {
        Level::Debug => (Some(Color::Cyan), "debug: "),
        Level::Info => (None, ""),
        Level::Success => (Some(Color::Green), "✓ "),
        Level::Warn => (Some(Color::Yellow), "⚠️  "),
        Level::Error => (Some(Color::Red), "❌ "),
    };

    if let Some(color) = color {
        let _ = buffer.set_color(ColorSpec::new().set_fg(Some(color)));
        let _ = write!(&mut buffer, "{prefix}");
        let _ = buffer.reset();
    }
    let _ = writeln!(&mut buffer, "{text}");
    let _ = bufwtr.print(&buffer);
}

/// Open a collapsible log group
pub fn group(title: &str) {
    let title = redact::global().redact(title);
    if redact::running_in_actions() {
        println!("::group::{}", escape_command_data(&title));
        return;
    }

    let bufwtr = BufferWriter::stdout(ColorChoice::Auto);
    let mut buffer = bufwtr.buffer();
    let _ = buffer.set_color(ColorSpec::new().set_bold(true));
    let _ = writeln!(&mut buffer, "▶ {title}");
    let _ = buffer.reset();
    let _ = bufwtr.print(&buffer);
}

pub fn end_group() {
    if redact::running_in_actions() {
        println!("::endgroup::");
    }
}

/// Escape a message for use as workflow command data
#[must_use]
pub fn escape_command_data(text: &str) -> String {
    text.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
