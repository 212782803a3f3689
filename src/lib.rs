//! Evardalen weather-station scraper.
//!
//! Each run fetches the station page, pulls out the latest camera image and
//! the current wind and temperature readings, and, when the camera has a new
//! image, stores it next to a rolling JSON history for the display page.
//!
//! Modules:
//! - `model`: readings, history records, image locators, error types
//! - `config`: TOML + environment configuration
//! - `logging`: stage-tagged console/file logging
//! - `document`: parsed-page capability over `scraper`
//! - `extract`: camera image and weather field extraction
//! - `novelty`: has the camera image changed since the last record
//! - `history`: atomic snapshot/history/image persistence
//! - `fetch`: blocking HTTP page and image fetchers
//! - `pipeline`: one scrape cycle end to end

pub mod config;
pub mod document;
pub mod extract;
pub mod fetch;
pub mod history;
pub mod logging;
pub mod model;
pub mod novelty;
pub mod pipeline;
