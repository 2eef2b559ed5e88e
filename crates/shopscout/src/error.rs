//! Error taxonomy for the extraction pipeline.
//!
//! Errors are scoped to the smallest unit that keeps the run moving: a field
//! falls back to a sentinel, a container yields [`ExtractionError`], a target
//! yields [`AcquisitionError`], and only [`ScrapeError::Initialization`]
//! aborts a run.

use crate::renderer::RenderError;

/// Which bounded wait expired during acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStage {
    Navigation,
    ReadySelector,
}

impl std::fmt::Display for WaitStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Navigation => f.write_str("navigation"),
            Self::ReadySelector => f.write_str("ready selector"),
        }
    }
}

/// One target's page could not be rendered.
#[derive(thiserror::Error, Debug)]
pub enum AcquisitionError {
    #[error("timed out during {stage} for {url} after {waited_ms}ms")]
    Timeout {
        url: String,
        stage: WaitStage,
        waited_ms: u64,
    },

    #[error("failed to acquire {url}: {source}")]
    Failed {
        url: String,
        #[source]
        source: RenderError,
    },
}

impl AcquisitionError {
    /// Timeouts are expected under load and may be retried by policy.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Timeout { url, .. } | Self::Failed { url, .. } => url,
        }
    }
}

/// One container's fields could not be read.
#[derive(thiserror::Error, Debug)]
pub enum ExtractionError {
    #[error("container {index} has no text and no link")]
    Blank { index: usize },

    #[error("container {index}: cannot resolve href {href:?}: {source}")]
    InvalidUrl {
        index: usize,
        href: String,
        #[source]
        source: url::ParseError,
    },
}

/// A persistence adapter failed.
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A selector layout could not be compiled.
#[derive(thiserror::Error, Debug)]
pub enum LayoutError {
    #[error("invalid selector {selector:?} in chain '{chain}': {message}")]
    Selector {
        chain: String,
        selector: String,
        message: String,
    },

    #[error("chain '{0}' has no queries")]
    EmptyChain(String),

    #[error("layout JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error reading layout: {0}")]
    Io(#[from] std::io::Error),
}

/// A configuration file could not be loaded.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Run-level errors surfaced by the pipeline driver.
#[derive(thiserror::Error, Debug)]
pub enum ScrapeError {
    #[error("rendering session could not be created: {0}")]
    Initialization(#[source] RenderError),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Convenience result type.
pub type ScrapeResult<T> = Result<T, ScrapeError>;
