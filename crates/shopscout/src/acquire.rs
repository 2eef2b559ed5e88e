//! Render acquirer: drives one browser context to a fully rendered snapshot.
//!
//! Each acquisition rotates the client identity, navigates, waits out a
//! randomized arrival delay, optionally waits for a ready selector, dismisses
//! an intercepting popup when one is present, scrolls to trigger lazy
//! loading, and finally captures the document markup.

use crate::error::{AcquisitionError, WaitStage};
use crate::pacing::{pause, DelayRange, IdentityPool, PacingPolicy};
use crate::renderer::{RenderContext, RenderError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const HEIGHT_SCRIPT: &str = "document.body.scrollHeight";
const SCROLL_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight)";

/// Bounded waits and lazy-load settings for one acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquireConfig {
    pub navigation_timeout_ms: u64,
    /// Settle time after navigation, sampled per page.
    pub arrival_delay: DelayRange,
    pub popup_timeout_ms: u64,
    /// Text that identifies the popup's close button.
    pub popup_close_text: String,
    pub ready_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub scroll_rounds: u32,
    pub scroll_pause_ms: u64,
}

impl Default for AcquireConfig {
    fn default() -> Self {
        Self {
            navigation_timeout_ms: 30_000,
            arrival_delay: DelayRange::secs(3, 5),
            popup_timeout_ms: 5_000,
            popup_close_text: "✕".to_string(),
            ready_timeout_ms: 10_000,
            poll_interval_ms: 250,
            scroll_rounds: 3,
            scroll_pause_ms: 1_500,
        }
    }
}

/// A fully rendered page snapshot.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    /// URL that was requested.
    pub url: String,
    /// URL after redirects.
    pub final_url: String,
    pub html: String,
    pub load_time_ms: u64,
    pub popup_dismissed: bool,
    /// Scroll rounds actually performed.
    pub scroll_rounds: u32,
}

/// Acquires rendered pages through a single long-lived context.
pub struct RenderAcquirer {
    context: Box<dyn RenderContext>,
    config: AcquireConfig,
    policy: Arc<dyn PacingPolicy>,
    identities: Arc<IdentityPool>,
    human: DelayRange,
}

impl RenderAcquirer {
    pub fn new(
        context: Box<dyn RenderContext>,
        config: AcquireConfig,
        policy: Arc<dyn PacingPolicy>,
        identities: Arc<IdentityPool>,
    ) -> Self {
        Self {
            context,
            config,
            policy,
            identities,
            human: DelayRange::secs(2, 5),
        }
    }

    /// Pause range used after dismissing a popup.
    pub fn with_human_delay(mut self, range: DelayRange) -> Self {
        self.human = range;
        self
    }

    pub fn config(&self) -> &AcquireConfig {
        &self.config
    }

    /// Render `url` and return its markup.
    ///
    /// `ready` is a CSS selector that must appear before the page counts as
    /// loaded; listing pages pass `None`.
    pub async fn acquire(
        &mut self,
        url: &str,
        ready: Option<&str>,
    ) -> Result<RenderedDocument, AcquisitionError> {
        let failed = |source: RenderError| AcquisitionError::Failed {
            url: url.to_string(),
            source,
        };

        if let Some(agent) = self.identities.next() {
            self.context.set_user_agent(agent).await.map_err(failed)?;
        }

        let nav = match self
            .context
            .navigate(url, self.config.navigation_timeout_ms)
            .await
        {
            Ok(nav) => nav,
            Err(RenderError::Timeout(waited_ms)) => {
                return Err(AcquisitionError::Timeout {
                    url: url.to_string(),
                    stage: WaitStage::Navigation,
                    waited_ms,
                })
            }
            Err(e) => return Err(failed(e)),
        };
        tracing::info!("navigated to {url} ({}ms)", nav.load_time_ms);

        pause(self.policy.as_ref(), self.config.arrival_delay).await;

        if let Some(selector) = ready {
            let script = format!(
                "document.querySelector({}) !== null",
                serde_json::Value::from(selector)
            );
            let found = self
                .poll_until(&script, self.config.ready_timeout_ms)
                .await
                .map_err(failed)?;
            if !found {
                return Err(AcquisitionError::Timeout {
                    url: url.to_string(),
                    stage: WaitStage::ReadySelector,
                    waited_ms: self.config.ready_timeout_ms,
                });
            }
        }

        let popup_dismissed = self.dismiss_popup().await;
        let scroll_rounds = self.scroll_to_bottom().await;

        let html = self.context.get_html().await.map_err(failed)?;

        Ok(RenderedDocument {
            url: url.to_string(),
            final_url: nav.final_url,
            html,
            load_time_ms: nav.load_time_ms,
            popup_dismissed,
            scroll_rounds,
        })
    }

    /// Close the underlying context.
    pub async fn close(self) -> Result<(), RenderError> {
        self.context.close().await
    }

    /// Evaluate `script` until it returns `true` or `timeout_ms` elapses.
    async fn poll_until(&self, script: &str, timeout_ms: u64) -> Result<bool, RenderError> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        let interval = Duration::from_millis(self.config.poll_interval_ms.max(1));
        loop {
            if self.context.execute_js(script).await?.as_bool() == Some(true) {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(interval).await;
        }
    }

    async fn dismiss_popup(&self) -> bool {
        let script = format!(
            "(() => {{ const t = {}; const b = Array.from(document.querySelectorAll('button')).find(e => (e.textContent || '').includes(t)); if (b) {{ b.click(); return true; }} return false; }})()",
            serde_json::Value::from(self.config.popup_close_text.as_str())
        );
        match self.poll_until(&script, self.config.popup_timeout_ms).await {
            Ok(true) => {
                tracing::info!("closed login popup");
                pause(self.policy.as_ref(), self.human).await;
                true
            }
            Ok(false) => {
                tracing::info!("no popup detected");
                false
            }
            Err(e) => {
                tracing::info!("no popup detected ({e})");
                false
            }
        }
    }

    /// Scroll until the page height stops growing or the round limit is hit.
    async fn scroll_to_bottom(&self) -> u32 {
        let settle = DelayRange::new(self.config.scroll_pause_ms, self.config.scroll_pause_ms);
        let mut last = match self.page_height().await {
            Ok(h) => h,
            Err(e) => {
                tracing::warn!("error during scrolling: {e}");
                return 0;
            }
        };

        let mut done = 0;
        for round in 1..=self.config.scroll_rounds {
            if let Err(e) = self.context.execute_js(SCROLL_SCRIPT).await {
                tracing::warn!("error during scrolling: {e}");
                break;
            }
            pause(self.policy.as_ref(), settle).await;
            done = round;

            match self.page_height().await {
                Ok(height) if height == last => {
                    tracing::debug!("page height stable after {round} scroll rounds");
                    break;
                }
                Ok(height) => last = height,
                Err(e) => {
                    tracing::warn!("error during scrolling: {e}");
                    break;
                }
            }
        }
        tracing::info!("scrolled page ({done} rounds)");
        done
    }

    async fn page_height(&self) -> Result<u64, RenderError> {
        let value = self.context.execute_js(HEIGHT_SCRIPT).await?;
        value
            .as_f64()
            .map(|h| h as u64)
            .ok_or_else(|| RenderError::Script(format!("unexpected scrollHeight: {value}")))
    }
}
