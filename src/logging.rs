/// Structured logging for the scraper service
///
/// Provides context-rich logging tagged with the pipeline stage and the
/// subject being worked on (page URL, image filename, file path), with
/// timestamps and severity levels. Supports both console output and an
/// append-only log file for cron-driven runs.

use crate::pipeline::CycleOutcome;
use chrono::Local;
use serde::Deserialize;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::str::FromStr;
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    #[serde(alias = "warn")]
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            _ => Err(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline Stages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Page,
    Extract,
    Novelty,
    Image,
    Store,
    System,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Page => write!(f, "PAGE"),
            Stage::Extract => write!(f, "EXTRACT"),
            Stage::Novelty => write!(f, "NOVELTY"),
            Stage::Image => write!(f, "IMAGE"),
            Stage::Store => write!(f, "STORE"),
            Stage::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - camera offline, page layout changed, nothing new
    Expected,
    /// Unexpected failure - site unreachable, disk unwritable
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<String>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
}

impl Logger {
    /// Initialize the global logger
    pub fn init(min_level: LogLevel, log_file: Option<String>, console_timestamps: bool) {
        let logger = Logger {
            min_level,
            log_file,
            console_timestamps,
        };

        if let Ok(mut slot) = LOGGER.lock() {
            *slot = Some(logger);
        }
    }

    fn format_entry(level: LogLevel, stage: Stage, subject: Option<&str>, message: &str) -> String {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let subject_part = subject.map(|s| format!(" [{}]", s)).unwrap_or_default();
        format!("{} - {} - {}{}: {}", timestamp, level, stage, subject_part, message)
    }

    fn log(&self, level: LogLevel, stage: Stage, subject: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }

        let log_entry = Self::format_entry(level, stage, subject, message);
        let subject_part = subject.map(|s| format!(" [{}]", s)).unwrap_or_default();

        // Console output
        if self.console_timestamps {
            match level {
                LogLevel::Error | LogLevel::Warning => eprintln!("{}", log_entry),
                LogLevel::Info | LogLevel::Debug => println!("{}", log_entry),
            }
        } else {
            match level {
                LogLevel::Error => eprintln!("   ✗ {}{}: {}", stage, subject_part, message),
                LogLevel::Warning => eprintln!("   ⚠ {}{}: {}", stage, subject_part, message),
                LogLevel::Info => println!("   {}", message),
                LogLevel::Debug => println!("   [DEBUG] {}", message),
            }
        }

        // File output
        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    Logger::init(min_level, log_file.map(String::from), console_timestamps);
}

fn dispatch(level: LogLevel, stage: Stage, subject: Option<&str>, message: &str) {
    // Logging before init, or after a poisoned lock, is silently dropped.
    if let Ok(guard) = LOGGER.lock() {
        if let Some(logger) = guard.as_ref() {
            logger.log(level, stage, subject, message);
        }
    }
}

/// Log a general informational message
pub fn info(stage: Stage, subject: Option<&str>, message: &str) {
    dispatch(LogLevel::Info, stage, subject, message);
}

/// Log a warning message
pub fn warn(stage: Stage, subject: Option<&str>, message: &str) {
    dispatch(LogLevel::Warning, stage, subject, message);
}

/// Log an error message
pub fn error(stage: Stage, subject: Option<&str>, message: &str) {
    dispatch(LogLevel::Error, stage, subject, message);
}

/// Log a debug message
pub fn debug(stage: Stage, subject: Option<&str>, message: &str) {
    dispatch(LogLevel::Debug, stage, subject, message);
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify a stage failure from its error text.
pub fn classify_failure(stage: Stage, error_message: &str) -> FailureType {
    match stage {
        // A changed layout or an offline camera is a normal outcome.
        Stage::Extract if error_message.contains("No data found") => FailureType::Expected,
        Stage::Extract => FailureType::Unexpected,
        Stage::Page | Stage::Image
            if error_message.contains("HTTP error") || error_message.contains("failed") =>
        {
            FailureType::Unexpected
        }
        Stage::Store => FailureType::Unexpected,
        _ => FailureType::Unknown,
    }
}

/// Log a stage failure with automatic classification
pub fn log_failure(stage: Stage, subject: Option<&str>, operation: &str, err: &dyn std::error::Error) {
    let mut error_msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        error_msg.push_str(&format!(": {}", cause));
        source = cause.source();
    }
    let failure_type = classify_failure(stage, &error_msg);

    let message = format!("{} failed [{}]: {}", operation, failure_type, error_msg);

    match failure_type {
        FailureType::Expected => warn(stage, subject, &message),
        FailureType::Unexpected => error(stage, subject, &message),
        FailureType::Unknown => warn(stage, subject, &message),
    }
}

// ---------------------------------------------------------------------------
// Cycle Summary Logging
// ---------------------------------------------------------------------------

/// Log the final outcome of one scrape cycle
pub fn log_cycle_summary(outcome: &CycleOutcome) {
    match outcome {
        CycleOutcome::Persisted { record, image_saved: true } => info(
            Stage::System,
            record.image_path.as_deref(),
            "Scraping completed successfully",
        ),
        CycleOutcome::Persisted { image_saved: false, .. } => warn(
            Stage::System,
            None,
            "Scraping completed with missing image; weather reading saved",
        ),
        CycleOutcome::Unchanged => info(Stage::System, None, "No new image found, nothing to do"),
        CycleOutcome::Failed(err) => error(Stage::System, None, &format!("Scraping failed: {}", err)),
    }
}
