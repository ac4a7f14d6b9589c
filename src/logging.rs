/*!
 * Logger for the `log` facade.
 *
 * Writes colored, timestamped lines to stderr. The level is set once at
 * startup with `init` and can be adjusted afterwards from the configuration
 * with `apply`.
 */

use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;

use crate::app_config::{Config, LogLevel};

struct PipelineLogger {
    level: LevelFilter,
}

impl PipelineLogger {
    fn new(level: LevelFilter) -> Self {
        PipelineLogger { level }
    }

    // ANSI color per level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

/// Render one log line without the trailing newline
pub fn format_line(level: Level, target: &str, message: &std::fmt::Arguments) -> String {
    let now = chrono::Local::now().format("%H:%M:%S.%3f");
    format!(
        "\x1B[{}m{} {:<5} [{}] {}\x1B[0m",
        PipelineLogger::color_for_level(level),
        now,
        level,
        target,
        message
    )
}

impl Log for PipelineLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let line = format_line(record.level(), record.target(), record.args());
            let _ = writeln!(std::io::stderr(), "{}", line);
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Install the global logger. Fails if a logger is already installed.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    // The logger itself lets everything through; `set_max_level` does the filtering
    log::set_boxed_logger(Box::new(PipelineLogger::new(LevelFilter::Trace)))?;
    log::set_max_level(level);
    Ok(())
}

pub fn level_filter(level: &LogLevel) -> LevelFilter {
    match level {
        LogLevel::Error => LevelFilter::Error,
        LogLevel::Warn => LevelFilter::Warn,
        LogLevel::Info => LevelFilter::Info,
        LogLevel::Debug => LevelFilter::Debug,
        LogLevel::Trace => LevelFilter::Trace,
    }
}

/// Apply the configured log level to the installed logger
pub fn apply(config: &Config) {
    log::set_max_level(level_filter(&config.log_level));
}
