//! Renderer abstraction for browser-based page rendering.
//!
//! Defines the `Renderer` and `RenderContext` traits that abstract over the
//! browser engine (currently Chromium via chromiumoxide), so the acquirer and
//! pipeline can be driven by a scripted renderer in tests.

pub mod chromium;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Failures reported by a rendering backend.
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("browser not available: {0}")]
    Unavailable(String),

    #[error("browser error: {0}")]
    Browser(String),

    #[error("navigation timed out after {0}ms")]
    Timeout(u64),

    #[error("script error: {0}")]
    Script(String),
}

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// A browser engine that can create rendering contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new browser context (tab), presenting `identity` as its
    /// user-agent when given.
    async fn new_context(&self, identity: Option<&str>) -> Result<Box<dyn RenderContext>, RenderError>;
    /// Shut down the browser engine.
    async fn shutdown(&self) -> Result<(), RenderError>;
    /// Number of currently active contexts.
    fn active_contexts(&self) -> usize;
}

/// A single browser context (tab) for rendering pages.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Override the user-agent for subsequent requests.
    async fn set_user_agent(&mut self, user_agent: &str) -> Result<(), RenderError>;
    /// Navigate to a URL with a timeout.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult, RenderError>;
    /// Execute JavaScript in the page context and return the result.
    async fn execute_js(&self, script: &str) -> Result<serde_json::Value, RenderError>;
    /// Get the full page HTML.
    async fn get_html(&self) -> Result<String, RenderError>;
    /// Close this context.
    async fn close(self: Box<Self>) -> Result<(), RenderError>;
}

/// A renderer that never opens a context; used when Chromium is missing so
/// offline commands still work and live runs fail at initialization.
pub struct NoopRenderer;

#[async_trait]
impl Renderer for NoopRenderer {
    async fn new_context(&self, _identity: Option<&str>) -> Result<Box<dyn RenderContext>, RenderError> {
        Err(RenderError::Unavailable("no browser configured".into()))
    }
    async fn shutdown(&self) -> Result<(), RenderError> {
        Ok(())
    }
    fn active_contexts(&self) -> usize {
        0
    }
}
