//! Field extractor: turns a container (listing mode) or a whole document
//! (detail mode) into a uniformly shaped [`Record`].
//!
//! Each field walks its selector chain and normalizes the first non-empty
//! match. A field that resolves nothing takes its sentinel, so extraction of
//! a single field never fails; only a container that is entirely blank, or
//! whose link cannot be resolved, is rejected.

use crate::error::ExtractionError;
use crate::locate::{locate, Container};
use crate::normalize::{
    absolute_url, element_text, normalize_count, normalize_price, timestamp_now,
};
use crate::selectors::{FieldChains, Layout, SelectorChain};
use crate::types::{PageKind, Record, NOT_AVAILABLE, ZERO};
use scraper::{ElementRef, Html};
use url::Url;

/// Outcome of extracting one rendered page.
#[derive(Debug, Default)]
pub struct PageHarvest {
    /// Containers located (after truncation); 1 for a detail page.
    pub containers: usize,
    /// Successfully extracted records, in locate order.
    pub records: Vec<Record>,
    /// Containers that were skipped, with their reasons.
    pub failures: Vec<ExtractionError>,
}

/// Applies the per-field chains of a [`Layout`].
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    layout: Layout,
    origin: Url,
}

impl FieldExtractor {
    pub fn new(layout: Layout, origin: Url) -> Self {
        Self { layout, origin }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Extract one listing container.
    pub fn extract_listing(&self, container: &Container<'_>) -> Result<Record, ExtractionError> {
        let chains = &self.layout.listing;
        let scope = container.element;
        let href = chains.url.first_attr(scope, "href");

        if href.is_none() && element_text(&scope).is_empty() {
            return Err(ExtractionError::Blank {
                index: container.index,
            });
        }

        let url = match href {
            Some(href) => {
                absolute_url(&self.origin, &href).map_err(|source| ExtractionError::InvalidUrl {
                    index: container.index,
                    href,
                    source,
                })?
            }
            None => NOT_AVAILABLE.to_string(),
        };

        Ok(self.build(chains, scope, url, ZERO))
    }

    /// Extract the single product on a detail page. `page_url` becomes the
    /// record's URL.
    pub fn extract_detail(&self, doc: &Html, page_url: &str) -> Result<Record, ExtractionError> {
        let scope = doc.root_element();
        if element_text(&scope).is_empty() {
            return Err(ExtractionError::Blank { index: 0 });
        }
        Ok(self.build(
            &self.layout.detail,
            scope,
            page_url.to_string(),
            NOT_AVAILABLE,
        ))
    }

    fn build(
        &self,
        chains: &FieldChains,
        scope: ElementRef<'_>,
        url: String,
        price_default: &str,
    ) -> Record {
        let text_or = |chain: &SelectorChain, default: &str| {
            chain
                .first_text(scope)
                .unwrap_or_else(|| default.to_string())
        };
        let normalized_or = |chain: &SelectorChain, f: fn(&str) -> String, default: &str| {
            chain
                .first_text(scope)
                .map(|t| f(&t))
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| {
                    tracing::debug!("field {} unresolved, using {default:?}", chain.name());
                    default.to_string()
                })
        };

        Record {
            title: text_or(&chains.title, NOT_AVAILABLE),
            price: normalized_or(&chains.price, normalize_price, price_default),
            original_price: normalized_or(&chains.original_price, normalize_price, price_default),
            rating: text_or(&chains.rating, NOT_AVAILABLE),
            review_count: normalized_or(&chains.review_count, normalize_count, ZERO),
            url,
            seller: text_or(&chains.seller, NOT_AVAILABLE),
            category: String::new(),
            scraped_at: timestamp_now(),
        }
    }

    /// Parse rendered markup and extract every record it holds.
    ///
    /// Listing pages are split into at most `max_products` containers; a
    /// failing container is logged with its index and skipped. Detail pages
    /// yield at most one record.
    pub fn extract_page(
        &self,
        html: &str,
        kind: PageKind,
        page_url: &str,
        max_products: usize,
    ) -> PageHarvest {
        let doc = Html::parse_document(html);
        match kind {
            PageKind::Listing => {
                let containers = locate(&doc, &self.layout.containers, max_products);
                self.extract_containers(&containers, page_url)
            }
            PageKind::Detail => self.extract_document(&doc, page_url),
        }
    }

    /// Extract already-located listing containers, skipping failures.
    pub fn extract_containers(&self, containers: &[Container<'_>], page_url: &str) -> PageHarvest {
        let mut harvest = PageHarvest {
            containers: containers.len(),
            ..PageHarvest::default()
        };
        for container in containers {
            harvest.keep(self.extract_listing(container), page_url);
        }
        harvest
    }

    /// Extract a parsed detail page.
    pub fn extract_document(&self, doc: &Html, page_url: &str) -> PageHarvest {
        let mut harvest = PageHarvest {
            containers: 1,
            ..PageHarvest::default()
        };
        harvest.keep(self.extract_detail(doc, page_url), page_url);
        harvest
    }
}

impl PageHarvest {
    fn keep(&mut self, result: Result<Record, ExtractionError>, page_url: &str) {
        match result {
            Ok(record) => {
                let n = self.records.len() + 1;
                tracing::info!("scraped product {n}: {}", preview(&record.title));
                self.records.push(record);
            }
            Err(e) => {
                tracing::warn!("error extracting product on {page_url}: {e}");
                self.failures.push(e);
            }
        }
    }
}

/// First 50 characters of a title for log lines.
fn preview(title: &str) -> String {
    title.chars().take(50).collect()
}
