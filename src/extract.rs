//! Camera image and weather field extraction from the station page.
//!
//! The page is Norwegian and loosely structured. Extraction prefers the
//! labelled widgets ("KAMERA NÅ", "VÆR OG VIND") to keep unrelated numbers
//! out, and falls back to scanning the whole page when the layout drifts.

use crate::config::{Config, Labels};
use crate::document::{HtmlDocument, ParsedDocument};
use crate::model::{ExtractError, ImageLocator, WeatherReading};
use chrono::NaiveDateTime;
use regex::Regex;

/// What one page yielded. Either half may be missing.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub locator: Option<ImageLocator>,
    pub reading: Option<WeatherReading>,
}

pub struct FieldExtractor {
    site_root: String,
    labels: Labels,
    wind: Regex,
    temperature: Regex,
}

impl FieldExtractor {
    pub fn new(config: &Config) -> Result<Self, ExtractError> {
        let labels = config.labels.clone();

        // Direction: one or more uppercase letters, Norwegian included (NØ, SØ).
        let wind = Regex::new(&format!(
            r"{}:\s*(\d+(?:\.\d+)?)\s*m/s\s*([A-ZÆØÅ]+)\b",
            regex::escape(&labels.wind)
        ))
        .map_err(|e| ExtractError::Parse(e.to_string()))?;

        let temperature = Regex::new(&format!(
            r"{}:\s*([-+]?\d+(?:\.\d+)?)\s*°\s*C",
            regex::escape(&labels.temperature)
        ))
        .map_err(|e| ExtractError::Parse(e.to_string()))?;

        Ok(FieldExtractor {
            site_root: config.site_root().to_string(),
            labels,
            wind,
            temperature,
        })
    }

    /// Extracts from raw markup, stamping the reading with the current time.
    pub fn extract(&self, markup: &str) -> Result<Extraction, ExtractError> {
        let document = HtmlDocument::parse(markup)?;
        self.extract_from(&document, WeatherReading::captured_now().timestamp)
    }

    /// Extracts from an already parsed document.
    ///
    /// Returns `NoDataFound` when neither a locator nor a usable reading
    /// could be recovered.
    pub fn extract_from(
        &self,
        document: &dyn ParsedDocument,
        captured_at: NaiveDateTime,
    ) -> Result<Extraction, ExtractError> {
        let locator = self.find_image_locator(document);

        let tokens: Vec<&str> = self
            .labels
            .weather_heading_tokens
            .iter()
            .map(String::as_str)
            .collect();
        let text = match document.find_region(&tokens) {
            Some(region) => region.text,
            None => document.text(),
        };
        let reading = self.parse_weather(&text, captured_at);

        if locator.is_none() && reading.is_none() {
            return Err(ExtractError::NoDataFound);
        }
        Ok(Extraction { locator, reading })
    }

    /// Camera widget's first image, else the first camera-feed image on the
    /// page, else nothing.
    pub fn find_image_locator(&self, document: &dyn ParsedDocument) -> Option<ImageLocator> {
        let from_widget = document
            .find_region(&[self.labels.camera_heading.as_str()])
            .and_then(|region| region.image_sources.into_iter().next());

        let reference = from_widget.or_else(|| {
            document
                .image_sources()
                .into_iter()
                .find(|src| src.contains(&self.labels.camera_path_segment))
        })?;

        Some(ImageLocator::resolve(&reference, &self.site_root))
    }

    /// Applies the wind and temperature patterns to `text` independently.
    ///
    /// Wind speed and direction are recorded together or not at all. Returns
    /// `None` when neither wind speed nor temperature was found.
    pub fn parse_weather(&self, text: &str, captured_at: NaiveDateTime) -> Option<WeatherReading> {
        let mut reading = WeatherReading::captured_at(captured_at);

        if let Some(caps) = self.wind.captures(text) {
            if let Ok(speed) = caps[1].parse::<f64>() {
                reading.wind_speed = Some(speed);
                reading.wind_direction = Some(caps[2].to_string());
            }
        }

        if let Some(caps) = self.temperature.captures(text) {
            reading.temperature = caps[1].parse::<f64>().ok();
        }

        reading.is_usable().then_some(reading)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
