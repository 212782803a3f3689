//! Parsed-document capability used by the extractor.
//!
//! The extractor only needs three things from a page: find a labelled
//! region, list image references, and get plain text. `ParsedDocument`
//! names exactly that, and `HtmlDocument` provides it on top of the
//! `scraper` crate so extraction logic never touches selectors directly.

use crate::model::ExtractError;
use scraper::{ElementRef, Html, Selector};

/// A labelled block of the page: its plain text and its image references,
/// both in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Region {
    pub text: String,
    pub image_sources: Vec<String>,
}

pub trait ParsedDocument {
    /// First region (document order) whose heading contains every token.
    fn find_region(&self, heading_tokens: &[&str]) -> Option<Region>;

    /// `src` of every `<img>` in the document, in document order.
    fn image_sources(&self) -> Vec<String>;

    /// Plain text of the whole document.
    fn text(&self) -> String;
}

// ---------------------------------------------------------------------------
// scraper-backed implementation
// ---------------------------------------------------------------------------

const HEADING_SELECTOR: &str = "h1, h2, h3, h4, h5, h6";
const CONTAINER_SELECTOR: &str = ".widget-area, .widget, section, aside";
const IMAGE_SELECTOR: &str = "img[src]";

/// Elements a heading's region may be bounded by.
const REGION_ELEMENTS: &[&str] = &["section", "aside", "article", "div"];

pub struct HtmlDocument {
    html: Html,
    headings: Selector,
    containers: Selector,
    images: Selector,
}

impl HtmlDocument {
    /// Parses `markup`. The HTML parser itself is lenient, so only markup
    /// with no content at all is rejected.
    pub fn parse(markup: &str) -> Result<Self, ExtractError> {
        if markup.trim().is_empty() {
            return Err(ExtractError::Parse("document is empty".to_string()));
        }

        Ok(HtmlDocument {
            html: Html::parse_document(markup),
            headings: selector(HEADING_SELECTOR)?,
            containers: selector(CONTAINER_SELECTOR)?,
            images: selector(IMAGE_SELECTOR)?,
        })
    }

    fn region_of(&self, element: ElementRef<'_>) -> Region {
        Region {
            text: plain_text(element),
            image_sources: element
                .select(&self.images)
                .filter_map(|img| img.value().attr("src"))
                .map(str::to_string)
                .collect(),
        }
    }
}

fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::Parse(format!("bad selector '{}': {}", css, e)))
}

/// Text nodes joined by a space, whitespace runs (including `&nbsp;`)
/// collapsed. Keeps adjacent inline elements from gluing words together.
fn plain_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn contains_all(text: &str, tokens: &[&str]) -> bool {
    !tokens.is_empty() && tokens.iter().all(|t| text.contains(t))
}

impl ParsedDocument for HtmlDocument {
    fn find_region(&self, heading_tokens: &[&str]) -> Option<Region> {
        // A matching heading bounds its region by the nearest block ancestor
        // that holds more than the heading itself: a title wrapper alone is
        // skipped in favour of the widget around it.
        let by_heading = self
            .html
            .select(&self.headings)
            .filter(|h| contains_all(&plain_text(*h), heading_tokens))
            .find_map(|h| {
                let heading_len = plain_text(h).len();
                h.ancestors()
                    .filter_map(ElementRef::wrap)
                    .filter(|a| REGION_ELEMENTS.contains(&a.value().name()))
                    .find(|a| {
                        plain_text(*a).len() > heading_len || a.select(&self.images).next().is_some()
                    })
            });
        if let Some(region) = by_heading {
            return Some(self.region_of(region));
        }

        // Pages without real headings: first widget/section holding the label.
        self.html
            .select(&self.containers)
            .find(|c| contains_all(&plain_text(*c), heading_tokens))
            .map(|c| self.region_of(c))
    }

    fn image_sources(&self) -> Vec<String> {
        self.html
            .select(&self.images)
            .filter_map(|img| img.value().attr("src"))
            .map(str::to_string)
            .collect()
    }

    fn text(&self) -> String {
        plain_text(self.html.root_element())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <img src="/logo.png">
          <div class="widget-area">
            <section class="widget">
              <h3 class="widget-title">KAMERA NÅ</h3>
              <img src="/Hikvision1/cam_0800.jpg">
              <img src="/Hikvision1/cam_0745.jpg">
            </section>
            <section class="widget">
              <h3 class="widget-title">VÆR OG VIND</h3>
              <p>Vind Nå: 3.4 m/s SV</p>
            </section>
          </div>
        </body></html>
    "#;

    #[test]
    fn test_empty_markup_is_a_parse_error() {
        assert!(matches!(HtmlDocument::parse("  \n "), Err(ExtractError::Parse(_))));
    }

    #[test]
    fn test_region_is_bounded_by_heading_section() {
        let doc = HtmlDocument::parse(PAGE).unwrap();
        let camera = doc.find_region(&["KAMERA NÅ"]).expect("camera region");
        assert_eq!(
            camera.image_sources,
            vec!["/Hikvision1/cam_0800.jpg", "/Hikvision1/cam_0745.jpg"]
        );
        assert!(!camera.text.contains("Vind Nå"), "region leaked into sibling widget");
    }

    #[test]
    fn test_region_requires_every_token() {
        let doc = HtmlDocument::parse(PAGE).unwrap();
        let weather = doc.find_region(&["VÆR", "VIND"]).expect("weather region");
        assert!(weather.text.contains("Vind Nå: 3.4 m/s SV"));
        assert!(doc.find_region(&["VÆR", "REGN"]).is_none());
    }

    #[test]
    fn test_heading_tokens_are_case_sensitive() {
        let doc = HtmlDocument::parse(PAGE).unwrap();
        assert!(doc.find_region(&["Vær", "Vind"]).is_none());
    }

    #[test]
    fn test_heading_wrapper_is_skipped_for_enclosing_widget() {
        let doc = HtmlDocument::parse(
            r#"
            <div class="widget">
              <div class="title-wrap"><h2>VÆR OG VIND</h2></div>
              <div class="textwidget"><p>Vind Nå: 3.4 m/s SV</p><p>Ute Nå: -2.1 °C</p></div>
            </div>
            <div class="widget">
              <div class="title-wrap"><h2>KAMERA NÅ</h2></div>
              <div><img src="/Hikvision1/cam.jpg"></div>
            </div>
            "#,
        )
        .unwrap();

        let weather = doc.find_region(&["VÆR", "VIND"]).expect("weather region");
        assert_eq!(weather.text, "VÆR OG VIND Vind Nå: 3.4 m/s SV Ute Nå: -2.1 °C");

        let camera = doc.find_region(&["KAMERA NÅ"]).expect("camera region");
        assert_eq!(camera.image_sources, vec!["/Hikvision1/cam.jpg"]);
    }

    #[test]
    fn test_container_fallback_without_headings() {
        let doc = HtmlDocument::parse(
            r#"<div class="widget-area"><div>KAMERA NÅ</div><img src="a.jpg"></div>"#,
        )
        .unwrap();
        let region = doc.find_region(&["KAMERA NÅ"]).expect("container region");
        assert_eq!(region.image_sources, vec!["a.jpg"]);
    }

    #[test]
    fn test_text_separates_adjacent_elements() {
        let doc = HtmlDocument::parse(
            "<p>Vind Nå: 3.4 m/s SV</p><p>Ute&nbsp;Nå:\n  -2.1 °C</p>",
        )
        .unwrap();
        assert_eq!(doc.text(), "Vind Nå: 3.4 m/s SV Ute Nå: -2.1 °C");
    }

    #[test]
    fn test_image_sources_in_document_order() {
        let doc = HtmlDocument::parse(PAGE).unwrap();
        assert_eq!(
            doc.image_sources(),
            vec!["/logo.png", "/Hikvision1/cam_0800.jpg", "/Hikvision1/cam_0745.jpg"]
        );
    }

    #[test]
    fn test_document_text_spans_all_regions() {
        let doc = HtmlDocument::parse(PAGE).unwrap();
        let text = doc.text();
        assert!(text.contains("KAMERA NÅ"));
        assert!(text.contains("Vind Nå: 3.4 m/s SV"));
    }
}
