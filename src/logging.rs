use chrono::Local;
use log::{LevelFilter, Metadata, Record, SetLoggerError};
use std::collections::HashSet;
use std::io::{self, Write};
use std::sync::OnceLock;

/// Debug topics understood by `--debug-filter`.
pub const TOPICS: &[&str] = &["sim", "tank", "bullet", "path", "learn", "level"];

#[derive(Debug)]
struct TankBattleLogger {
    level: LevelFilter,
    debug_filters: Option<HashSet<String>>,
}

/// Pulls the number following `label` out of a message, e.g. "Tank 3".
fn number_after(message: &str, label: &str) -> Option<u64> {
    let start = message.find(label)? + label.len();
    let rest = &message[start..];
    let end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    rest[..end].parse().ok()
}

impl log::Log for TankBattleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        if metadata.level() > self.level {
            return false;
        }
        // Debug and trace records are limited to the selected topics
        match &self.debug_filters {
            Some(filters) if metadata.level() >= log::Level::Debug => {
                filters.contains(metadata.target())
                    || filters.iter().any(|f| metadata.target().starts_with(f.as_str()))
            }
            _ => true,
        }
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let level_color = match record.level() {
            log::Level::Error => "\x1B[31m", // Red
            log::Level::Warn => "\x1B[33m",  // Yellow
            log::Level::Info => "\x1B[32m",  // Green
            log::Level::Debug => "\x1B[36m", // Cyan
            log::Level::Trace => "\x1B[35m", // Magenta
        };
        let reset = "\x1B[0m";
        let timestamp = Local::now().format("%H:%M:%S%.3f");

        let message = record.args().to_string();
        let mut context = String::new();
        if let Some(id) = number_after(&message, "Tank ") {
            context.push_str(&format!("[K{:02}]", id));
        }
        if let Some(tick) = number_after(&message, "Tick ") {
            context.push_str(&format!("[T{:05}]", tick));
        }
        if !context.is_empty() {
            context.push(' ');
        }

        let mut output = format!(
            "{timestamp} {level_color}{level:5}{reset} {context}{target}: {message}",
            level = record.level(),
            target = record.target(),
        );
        if let Some(module_path) = record.module_path() {
            if module_path != record.target() {
                output.push_str(&format!(" [{}]", module_path));
            }
        }

        // A record that cannot reach stdout is dropped.
        write_line(&mut io::stdout().lock(), &output).ok();
    }

    fn flush(&self) {
        io::stdout().flush().ok();
    }
}

fn write_line<W: Write>(out: &mut W, line: &str) -> io::Result<()> {
    writeln!(out, "{}", line)?;
    out.flush()
}

static LOGGER: OnceLock<TankBattleLogger> = OnceLock::new();

/// Parses a comma separated topic list such as "tank,path".
pub fn parse_filters(filter: &str) -> HashSet<String> {
    filter
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Topics in `filter` that no log target uses, in the order given.
pub fn unknown_topics(filter: &str) -> Vec<String> {
    filter
        .split(',')
        .map(str::trim)
        .filter(|topic| !topic.is_empty() && !TOPICS.contains(topic))
        .map(str::to_string)
        .collect()
}

/// Installs the process-wide logger. Only the first call's settings take effect.
pub fn init_logger(level: LevelFilter, debug_filter: Option<String>) -> Result<(), SetLoggerError> {
    let logger = LOGGER.get_or_init(|| TankBattleLogger {
        level,
        debug_filters: debug_filter.as_deref().map(parse_filters),
    });
    log::set_logger(logger).map(|()| log::set_max_level(level))
}

/// Parses a level name, falling back to `Info` for anything unrecognised.
pub fn level_from_str(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

// Helper macros for specific debug topics
#[macro_export]
macro_rules! debug_sim {
    ($($arg:tt)*) => {
        log::debug!(target: "sim", "{}", format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_tank {
    ($tank_id:expr; $($arg:tt)*) => {
        log::debug!(target: "tank", "Tank {} {}", $tank_id, format_args!($($arg)*))
    };
    ($($arg:tt)*) => {
        log::debug!(target: "tank", "{}", format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_bullet {
    ($($arg:tt)*) => {
        log::debug!(target: "bullet", "{}", format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_path {
    ($($arg:tt)*) => {
        log::debug!(target: "path", "{}", format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_learn {
    ($tank_id:expr; $($arg:tt)*) => {
        log::debug!(target: "learn", "Tank {} {}", $tank_id, format_args!($($arg)*))
    };
    ($($arg:tt)*) => {
        log::debug!(target: "learn", "{}", format_args!($($arg)*))
    };
}
