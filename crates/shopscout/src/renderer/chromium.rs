//! Chromium-based renderer using chromiumoxide.
//!
//! The browser is launched once per run with automation signals suppressed:
//! the `AutomationControlled` blink feature is disabled at launch and
//! `navigator.webdriver` is masked by a script installed on every new
//! document of every page.

use super::{NavigationResult, RenderContext, RenderError, Renderer};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Runs before any page script so automation checks see a regular browser.
const STEALTH_SCRIPT: &str =
    "Object.defineProperty(navigator, 'webdriver', {get: () => undefined});";

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. SHOPSCOUT_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("SHOPSCOUT_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.shopscout/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".shopscout/chromium/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".shopscout/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".shopscout/chromium/chrome-linux64/chrome"),
                home.join(".shopscout/chromium/chrome"),
            ]
        };
        if let Some(found) = candidates.into_iter().find(|c| c.exists()) {
            return Some(found);
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common = PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Launch settings for [`ChromiumRenderer`].
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    /// User-agent passed on the command line; pages may override it later.
    pub user_agent: Option<String>,
    /// Explicit binary; discovered with [`find_chromium`] when `None`.
    pub chromium_path: Option<PathBuf>,
    pub window_size: (u32, u32),
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            user_agent: None,
            chromium_path: None,
            window_size: (1920, 1080),
        }
    }
}

/// Chromium-based renderer.
pub struct ChromiumRenderer {
    browser: Mutex<Browser>,
    handler: JoinHandle<()>,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumRenderer {
    /// Launch a Chromium instance configured against automation detection.
    pub async fn launch(options: &LaunchOptions) -> Result<Self, RenderError> {
        let chrome_path = options
            .chromium_path
            .clone()
            .or_else(find_chromium)
            .ok_or_else(|| {
                RenderError::Unavailable(
                    "Chromium not found; set SHOPSCOUT_CHROMIUM_PATH".into(),
                )
            })?;

        let (w, h) = options.window_size;
        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .window_size(w, h)
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage");
        builder = if options.headless {
            builder.arg("--headless=new")
        } else {
            builder.with_head()
        };
        if let Some(ua) = &options.user_agent {
            builder = builder.arg(format!("--user-agent={ua}"));
        }
        let config = builder
            .build()
            .map_err(|e| RenderError::Browser(format!("failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Browser(format!("failed to launch Chromium: {e}")))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("browser handler event error: {e}");
                }
            }
        });

        tracing::info!("WebDriver-free Chromium session initialized");

        Ok(Self {
            browser: Mutex::new(browser),
            handler,
            active_count: Arc::new(AtomicUsize::new(0)),
        })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self, identity: Option<&str>) -> Result<Box<dyn RenderContext>, RenderError> {
        let page = self
            .browser
            .lock()
            .await
            .new_page("about:blank")
            .await
            .map_err(|e| RenderError::Browser(format!("failed to create new page: {e}")))?;

        page.evaluate_on_new_document(STEALTH_SCRIPT)
            .await
            .map_err(|e| RenderError::Script(format!("failed to install stealth script: {e}")))?;

        self.active_count.fetch_add(1, Ordering::Relaxed);

        let mut context = ChromiumContext {
            page,
            active_count: Arc::clone(&self.active_count),
        };
        if let Some(ua) = identity {
            context.set_user_agent(ua).await?;
        }
        Ok(Box::new(context))
    }

    async fn shutdown(&self) -> Result<(), RenderError> {
        let mut browser = self.browser.lock().await;
        let closed = browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| RenderError::Browser(format!("failed to close browser: {e}")));
        let _ = browser.wait().await;
        self.handler.abort();
        tracing::info!("browser closed");
        closed
    }

    fn active_contexts(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

/// A single Chromium page context.
pub struct ChromiumContext {
    page: Page,
    active_count: Arc<AtomicUsize>,
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn set_user_agent(&mut self, user_agent: &str) -> Result<(), RenderError> {
        self.page
            .set_user_agent(user_agent)
            .await
            .map(|_| ())
            .map_err(|e| RenderError::Browser(format!("user-agent override failed: {e}")))
    }

    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult, RenderError> {
        let start = Instant::now();

        let result = tokio::time::timeout(
            std::time::Duration::from_millis(timeout_ms),
            self.page.goto(url),
        )
        .await;

        let load_time_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(_)) => {
                let final_url = self
                    .page
                    .url()
                    .await
                    .unwrap_or_default()
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| url.to_string());

                Ok(NavigationResult {
                    final_url,
                    load_time_ms,
                })
            }
            Ok(Err(e)) => Err(RenderError::Browser(format!("navigation failed: {e}"))),
            Err(_) => Err(RenderError::Timeout(timeout_ms)),
        }
    }

    async fn execute_js(&self, script: &str) -> Result<serde_json::Value, RenderError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| RenderError::Script(format!("JS execution failed: {e}")))?;

        result
            .into_value()
            .map_err(|e| RenderError::Script(format!("failed to convert JS result: {e:?}")))
    }

    async fn get_html(&self) -> Result<String, RenderError> {
        let result = self
            .page
            .evaluate("document.documentElement.outerHTML")
            .await
            .map_err(|e| RenderError::Script(format!("failed to get HTML: {e}")))?;

        result
            .into_value()
            .map_err(|e| RenderError::Script(format!("failed to convert HTML result: {e:?}")))
    }

    async fn close(self: Box<Self>) -> Result<(), RenderError> {
        self.active_count.fetch_sub(1, Ordering::Relaxed);
        let _ = self.page.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_masks_webdriver_and_renders() {
        let renderer = ChromiumRenderer::launch(&LaunchOptions::default())
            .await
            .expect("failed to launch renderer");
        let mut ctx = renderer
            .new_context(Some("shopscout-test-agent"))
            .await
            .expect("failed to create context");

        ctx.navigate("data:text/html,<h1>Hello</h1><p>World</p>", 10000)
            .await
            .expect("navigation failed");

        let webdriver = ctx
            .execute_js("typeof navigator.webdriver")
            .await
            .expect("JS execution failed");
        assert_eq!(webdriver.as_str().unwrap(), "undefined");

        let ua = ctx
            .execute_js("navigator.userAgent")
            .await
            .expect("JS execution failed");
        assert_eq!(ua.as_str().unwrap(), "shopscout-test-agent");

        let html = ctx.get_html().await.expect("get_html failed");
        assert!(html.contains("<h1>Hello</h1>"));

        ctx.close().await.expect("close failed");
        assert_eq!(renderer.active_contexts(), 0);

        renderer.shutdown().await.expect("shutdown failed");
    }
}
