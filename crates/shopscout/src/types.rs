//! Core data types: product records and scrape targets.

use serde::{Deserialize, Serialize};

/// Placeholder for a text field that could not be resolved.
pub const NOT_AVAILABLE: &str = "N/A";

/// Placeholder for a numeric field that could not be resolved.
pub const ZERO: &str = "0";

/// Column order shared by every tabular sink.
pub const COLUMNS: [&str; 9] = [
    "title",
    "price",
    "original_price",
    "rating",
    "review_count",
    "url",
    "seller",
    "category",
    "scraped_at",
];

/// One extracted product.
///
/// Every field is always present; unresolved fields carry [`NOT_AVAILABLE`]
/// or [`ZERO`] so a batch stays uniformly shaped for the sinks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub title: String,
    pub price: String,
    pub original_price: String,
    pub rating: String,
    pub review_count: String,
    pub url: String,
    pub seller: String,
    pub category: String,
    pub scraped_at: String,
}

impl Record {
    /// Attach the source category. This is the only change a record sees
    /// after extraction.
    pub fn with_category(self, category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            ..self
        }
    }

    /// Field values in [`COLUMNS`] order.
    pub fn values(&self) -> [&str; 9] {
        [
            &self.title,
            &self.price,
            &self.original_price,
            &self.rating,
            &self.review_count,
            &self.url,
            &self.seller,
            &self.category,
            &self.scraped_at,
        ]
    }
}

/// What kind of page a target points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    /// Search or category page with many product containers.
    Listing,
    /// Single product page; yields one record from the whole document.
    Detail,
}

impl std::str::FromStr for PageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "listing" => Ok(Self::Listing),
            "detail" => Ok(Self::Detail),
            other => Err(format!("unknown page kind '{other}' (expected listing or detail)")),
        }
    }
}

/// One unit of work for the pipeline driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Category label copied onto every record from this target.
    pub category: String,
    pub url: String,
    pub kind: PageKind,
}

impl Target {
    pub fn listing(category: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            url: url.into(),
            kind: PageKind::Listing,
        }
    }

    pub fn detail(category: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            url: url.into(),
            kind: PageKind::Detail,
        }
    }
}
