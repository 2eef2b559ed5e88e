//! Shopscout: product record extraction from JavaScript-rendered storefront pages.

pub mod acquire;
pub mod config;
pub mod error;
pub mod extract;
pub mod locate;
pub mod normalize;
pub mod pacing;
pub mod pipeline;
pub mod renderer;
pub mod selectors;
pub mod sink;
pub mod targets;
pub mod types;

pub use acquire::{AcquireConfig, RenderAcquirer, RenderedDocument};
pub use config::ScrapeConfig;
pub use error::{
    AcquisitionError, ConfigError, ExtractionError, LayoutError, ScrapeError, ScrapeResult,
    SinkError, WaitStage,
};
pub use extract::{FieldExtractor, PageHarvest};
pub use locate::{locate, Container};
pub use pacing::{DelayRange, IdentityPool, NoPacing, PacingConfig, PacingPolicy, RandomPacing};
pub use pipeline::{Harvest, Pipeline, PipelineOptions, TargetOutcome, TargetState};
pub use renderer::{NoopRenderer, RenderContext, RenderError, Renderer};
pub use selectors::{Layout, Query, SelectorChain};
pub use sink::{write_all, Sink, SinkKind, SinkReport};
pub use types::*;
