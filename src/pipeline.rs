//! One scrape cycle: fetch page, extract, check novelty, fetch image, persist.
//!
//! ```text
//! FETCH_PAGE → EXTRACT_FIELDS → CHECK_NOVELTY → (SKIP | FETCH_IMAGE → PERSIST)
//! ```
//!
//! Nothing here panics or propagates: every failure ends the cycle with a
//! `CycleOutcome` the caller turns into an exit status.

use crate::config::Config;
use crate::extract::FieldExtractor;
use crate::fetch::{ImageFetcher, PageFetcher};
use crate::history::HistoryStore;
use crate::logging::{self, Stage};
use crate::model::{CycleError, HistoryRecord, ImageLocator};
use crate::novelty;

/// How a cycle ended.
#[derive(Debug)]
pub enum CycleOutcome {
    /// A record was appended. `image_saved` is false when the camera image
    /// could not be fetched or stored and the record carries no image.
    Persisted { record: HistoryRecord, image_saved: bool },
    /// The page still shows the last recorded image; nothing to do.
    Unchanged,
    Failed(CycleError),
}

impl CycleOutcome {
    /// Persisted (with or without image) and unchanged both count as success.
    pub fn is_success(&self) -> bool {
        !matches!(self, CycleOutcome::Failed(_))
    }
}

pub struct Pipeline<P, I> {
    site_url: String,
    extractor: FieldExtractor,
    page_fetcher: P,
    image_fetcher: I,
    store: HistoryStore,
}

impl<P: PageFetcher, I: ImageFetcher> Pipeline<P, I> {
    pub fn new(
        config: &Config,
        page_fetcher: P,
        image_fetcher: I,
        store: HistoryStore,
    ) -> Result<Self, CycleError> {
        Ok(Pipeline {
            site_url: config.site_url.clone(),
            extractor: FieldExtractor::new(config)?,
            page_fetcher,
            image_fetcher,
            store,
        })
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    /// Runs one cycle and logs its summary.
    pub fn run_cycle(&mut self) -> CycleOutcome {
        logging::info(Stage::System, Some(&self.site_url), "Starting Evardalen scraper");
        let outcome = match self.try_cycle() {
            Ok(outcome) => outcome,
            Err(err) => CycleOutcome::Failed(err),
        };
        logging::log_cycle_summary(&outcome);
        outcome
    }

    fn try_cycle(&mut self) -> Result<CycleOutcome, CycleError> {
        // FETCH_PAGE
        let markup = self.page_fetcher.fetch_page(&self.site_url).inspect_err(|e| {
            logging::log_failure(Stage::Page, Some(&self.site_url), "Fetching webpage", e)
        })?;

        // EXTRACT_FIELDS
        let extraction = self
            .extractor
            .extract(&markup)
            .inspect_err(|e| logging::log_failure(Stage::Extract, None, "Extracting page data", e))?;

        match &extraction.locator {
            Some(locator) => logging::info(
                Stage::Extract,
                Some(locator.as_str()),
                "Found camera image URL",
            ),
            None => logging::warn(Stage::Extract, None, "Camera image URL not found"),
        }
        match &extraction.reading {
            Some(reading) => logging::info(
                Stage::Extract,
                None,
                &format!(
                    "Extracted weather data: wind {:?} m/s {:?}, temperature {:?} °C",
                    reading.wind_speed, reading.wind_direction, reading.temperature
                ),
            ),
            None => logging::warn(Stage::Extract, None, "Weather data not found"),
        }

        // CHECK_NOVELTY
        if !novelty::is_novel(extraction.locator.as_ref(), self.store.current()) {
            logging::info(Stage::Novelty, None, "No new image found, skipping download");
            return Ok(CycleOutcome::Unchanged);
        }
        // Novel implies a locator is present.
        let Some(locator) = extraction.locator else {
            return Ok(CycleOutcome::Unchanged);
        };
        let Some(reading) = extraction.reading else {
            return Err(CycleError::MissingReading);
        };

        // FETCH_IMAGE (degrades to a record without image)
        let image_path = self.fetch_and_save_image(&locator);
        let image_saved = image_path.is_some();

        // PERSIST
        let record = HistoryRecord::new(reading, image_path);
        self.store.append(record.clone()).inspect_err(|e| {
            logging::log_failure(Stage::Store, None, "Saving weather data", e)
        })?;
        logging::info(Stage::Store, None, "Weather data saved successfully");

        Ok(CycleOutcome::Persisted { record, image_saved })
    }

    /// Downloads and stores the image, returning its stored file name.
    fn fetch_and_save_image(&self, locator: &ImageLocator) -> Option<String> {
        let Some(filename) = locator.filename() else {
            logging::warn(
                Stage::Image,
                Some(locator.as_str()),
                "Image URL has no file name, not downloading",
            );
            return None;
        };

        let bytes = match self.image_fetcher.fetch_image(locator) {
            Ok(bytes) => bytes,
            Err(e) => {
                logging::log_failure(Stage::Image, Some(locator.as_str()), "Downloading image", &e);
                return None;
            }
        };

        match self.store.save_image(filename, &bytes) {
            Ok(path) => {
                logging::info(
                    Stage::Image,
                    Some(filename),
                    &format!("Image downloaded and saved to {}", path.display()),
                );
                Some(filename.to_string())
            }
            Err(e) => {
                logging::log_failure(Stage::Image, Some(filename), "Saving image", &e);
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
