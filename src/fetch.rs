/// HTTP retrieval of the station page and camera images.
///
/// The pipeline only sees the two traits below; any transport error or
/// non-success status is a `FetchError`, with no distinction by status code.
/// Timeouts are the fetcher's concern, configured through `Config`.

use crate::config::Config;
use crate::model::{FetchError, ImageLocator};

pub trait PageFetcher {
    fn fetch_page(&self, url: &str) -> Result<String, FetchError>;
}

pub trait ImageFetcher {
    fn fetch_image(&self, locator: &ImageLocator) -> Result<Vec<u8>, FetchError>;
}

impl<T: PageFetcher + ?Sized> PageFetcher for &T {
    fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        (**self).fetch_page(url)
    }
}

impl<T: ImageFetcher + ?Sized> ImageFetcher for &T {
    fn fetch_image(&self, locator: &ImageLocator) -> Result<Vec<u8>, FetchError> {
        (**self).fetch_image(locator)
    }
}

// ============================================================================
// Blocking reqwest client
// ============================================================================

pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.http_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(FetchError::Client)?;
        Ok(HttpFetcher { client })
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response, FetchError> {
        let response = self.client.get(url).send().map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(response)
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        self.get(url)?.text().map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })
    }
}

impl ImageFetcher for HttpFetcher {
    fn fetch_image(&self, locator: &ImageLocator) -> Result<Vec<u8>, FetchError> {
        let url = locator.as_str();
        let bytes = self.get(url)?.bytes().map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;
        Ok(bytes.to_vec())
    }
}

// ============================================================================
// Tests
// ============================================================================
