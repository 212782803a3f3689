/// WeatherReading, ImageLocator, HistoryRecord and the error taxonomy.
///
/// Core data types for the Evardalen scraper service.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no I/O, only types, their serialized shape, and the small
/// invariants that belong to the types themselves.

use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Reading types
// ---------------------------------------------------------------------------

/// One weather observation scraped from the station page.
///
/// Every measurement is optional because the page layout drifts; use
/// `is_usable` before treating the reading as data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
    pub wind_speed: Option<f64>,      // m/s
    pub wind_direction: Option<String>, // compass code, e.g. "SV"
    pub temperature: Option<f64>,     // °C
}

impl WeatherReading {
    /// A reading stamped with the current local time, truncated to whole
    /// seconds so it survives a round trip through the persisted format.
    pub fn captured_now() -> Self {
        let now = Local::now().naive_local();
        Self::captured_at(now.with_nanosecond(0).unwrap_or(now))
    }

    /// An empty reading stamped with `timestamp`.
    pub fn captured_at(timestamp: NaiveDateTime) -> Self {
        WeatherReading {
            timestamp,
            wind_speed: None,
            wind_direction: None,
            temperature: None,
        }
    }

    /// A reading counts as data only if wind speed or temperature was found.
    pub fn is_usable(&self) -> bool {
        self.wind_speed.is_some() || self.temperature.is_some()
    }
}

// ---------------------------------------------------------------------------
// Image locator
// ---------------------------------------------------------------------------

/// Absolute address of a camera image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageLocator(String);

impl ImageLocator {
    /// Resolves `reference` against `site_root`.
    ///
    /// `http://` and `https://` references are kept as-is. A reference
    /// starting with `/` is appended to the root; anything else is appended
    /// with a `/` inserted.
    pub fn resolve(reference: &str, site_root: &str) -> Self {
        let reference = reference.trim();
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return ImageLocator(reference.to_string());
        }
        let root = site_root.trim_end_matches('/');
        if reference.starts_with('/') {
            ImageLocator(format!("{}{}", root, reference))
        } else {
            ImageLocator(format!("{}/{}", root, reference))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment with query string and fragment removed.
    ///
    /// Returns `None` when the locator ends in `/` and so names no file.
    pub fn filename(&self) -> Option<&str> {
        let path = self.0.split(['?', '#']).next().unwrap_or_default();
        match path.rsplit('/').next() {
            Some(name) if !name.is_empty() => Some(name),
            _ => None,
        }
    }
}

impl std::fmt::Display for ImageLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// History record
// ---------------------------------------------------------------------------

/// A reading together with the stored filename of its camera image.
///
/// Serialized flat, matching the `current_data.json` / `history.json`
/// layout the display page reads:
/// `{timestamp, wind_speed, wind_direction, temperature, image_path}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(flatten)]
    pub reading: WeatherReading,
    pub image_path: Option<String>,
}

impl HistoryRecord {
    pub fn new(reading: WeatherReading, image_path: Option<String>) -> Self {
        HistoryRecord { reading, image_path }
    }
}

/// `YYYY-MM-DD HH:MM:SS`, local wall-clock time.
pub(crate) mod timestamp_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Failures retrieving the station page or a camera image.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP client could not be built")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error {status} from {url}")]
    Status { url: String, status: u16 },
}

/// Failures turning page markup into a reading.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ExtractError {
    /// The markup could not be parsed at all.
    #[error("Parse error: {0}")]
    Parse(String),
    /// The markup parsed, but held neither a camera image nor weather data.
    #[error("No data found: page has no camera image and no weather reading")]
    NoDataFound,
}

/// Failures writing the snapshot, history, or image files.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("I/O error on '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not serialize history records")]
    Serialize(#[from] serde_json::Error),

    #[error("refusing to store image under unsafe filename '{0}'")]
    InvalidFilename(String),
}

/// Why a scrape cycle ended without persisting anything.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("page fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("new camera image found, but the page had no usable weather reading")]
    MissingReading,

    #[error("persisting the cycle failed: {0}")]
    Persist(#[from] PersistError),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
