/// Tagged console logging for lorascope
///
/// Small fixed pipeline:
/// - Standard levels (Error/Warning/Info/Debug)
/// - Per-module debug control via --debug-<module> flags
/// - Colored, aligned console output
///
/// Errors are always shown; info/warning honor --quiet; debug requires the
/// module's debug flag or --verbose.
use chrono::Local;
use colored::*;
use std::io::{self, Write};

use crate::arguments;

// ============================================================================
// TAGS & LEVELS
// ============================================================================

/// Module tag attached to every log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTag {
    System,
    Config,
    Store,
    Realtime,
    Webserver,
    Stats,
}

impl LogTag {
    pub fn label(&self) -> &'static str {
        match self {
            LogTag::System => "SYSTEM",
            LogTag::Config => "CONFIG",
            LogTag::Store => "STORE",
            LogTag::Realtime => "REALTIME",
            LogTag::Webserver => "WEBSERVER",
            LogTag::Stats => "STATS",
        }
    }

    /// CLI flag that enables debug output for this tag.
    pub fn debug_flag(&self) -> &'static str {
        match self {
            LogTag::System => "--debug-system",
            LogTag::Config => "--debug-config",
            LogTag::Store => "--debug-store",
            LogTag::Realtime => "--debug-realtime",
            LogTag::Webserver => "--debug-webserver",
            LogTag::Stats => "--debug-stats",
        }
    }

    fn colored_label(&self) -> ColoredString {
        // Pad before coloring so ANSI codes don't break alignment.
        let padded = format!("{:<9}", self.label());
        match self {
            LogTag::System => padded.cyan(),
            LogTag::Config => padded.blue(),
            LogTag::Store => padded.green(),
            LogTag::Realtime => padded.magenta(),
            LogTag::Webserver => padded.yellow(),
            LogTag::Stats => padded.purple(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warning,
    Info,
    Debug,
}

impl LogLevel {
    fn formatted(&self) -> ColoredString {
        match self {
            LogLevel::Error => format!("{:<5}", "ERROR").red().bold(),
            LogLevel::Warning => format!("{:<5}", "WARN").yellow(),
            LogLevel::Info => format!("{:<5}", "INFO").normal(),
            LogLevel::Debug => format!("{:<5}", "DEBUG").dimmed(),
        }
    }
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Initialize the logger. Snapshots argv so later flag checks are cheap
/// and consistent; call once at startup before any logging occurs.
pub fn init() {
    let _ = arguments::get_cmd_args();
}

/// Log at ERROR level (always shown).
pub fn error(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Error, message);
}

/// Log at WARNING level (hidden by --quiet).
pub fn warning(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Warning, message);
}

/// Log at INFO level (hidden by --quiet).
pub fn info(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Info, message);
}

/// Log at DEBUG level (requires --debug-<module> or --verbose).
pub fn debug(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Debug, message);
}

// ============================================================================
// INTERNALS
// ============================================================================

fn should_log(tag: &LogTag, level: LogLevel) -> bool {
    match level {
        LogLevel::Error => true,
        LogLevel::Warning | LogLevel::Info => !arguments::is_quiet_enabled(),
        LogLevel::Debug => {
            arguments::is_verbose_enabled() || arguments::has_arg(tag.debug_flag())
        }
    }
}

fn log_internal(tag: LogTag, level: LogLevel, message: &str) {
    if !should_log(&tag, level) {
        return;
    }

    let time = Local::now().format("%H:%M:%S").to_string();
    let line = format!(
        "{} [{}] [{}] {}",
        time.dimmed(),
        tag.colored_label(),
        level.formatted(),
        message
    );

    // Tolerate broken pipes when output is piped into head/grep.
    let mut out = io::stdout();
    if writeln!(out, "{}", line).is_err() {
        return;
    }
    let _ = out.flush();
}
