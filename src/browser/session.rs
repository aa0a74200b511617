//! Chrome driven over the DevTools protocol.

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::element::Element;
use futures::StreamExt;
use serde_json::Value;
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::browser::driver::{
    PageDriver, Probe, click_script, count_script, probe_script, text_script,
};
use crate::browser::locator::Locator;

const CHROME_ARGS: &[&str] = &[
    "--disable-notifications",
    "--disable-extensions",
    "--disable-infobars",
    "--start-maximized",
    "--user-agent=Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
];

#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    pub chrome_executable: Option<PathBuf>,
    pub download_dir: PathBuf,
    pub window_size: (u32, u32),
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: false,
            chrome_executable: None,
            download_dir: std::env::temp_dir(),
            window_size: (1920, 1080),
        }
    }
}

/// One browser with one tab, owned by the run and closed at its end.
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

impl BrowserSession {
    pub async fn launch(options: &LaunchOptions) -> Result<Self> {
        info!(headless = options.headless, "launching Chrome");

        let (width, height) = options.window_size;
        let mut builder = BrowserConfig::builder()
            .args(CHROME_ARGS.iter().copied())
            .window_size(width, height)
            .viewport(None);
        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &options.chrome_executable {
            builder = builder.chrome_executable(executable);
        }
        let config = builder
            .build()
            .map_err(|e| anyhow!("invalid browser configuration: {e}"))?;

        let (browser, mut events) = Browser::launch(config)
            .await
            .context("failed to launch Chrome; is it installed and on PATH?")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "browser event error");
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .context("failed to open a browser tab")?;

        let download_behavior = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::Allow)
            .download_path(options.download_dir.to_string_lossy().to_string())
            .build()
            .map_err(|e| anyhow!("invalid download behavior: {e}"))?;
        browser
            .execute(download_behavior)
            .await
            .context("failed to set the download directory")?;

        info!(download_dir = %options.download_dir.display(), "Chrome ready");

        Ok(Self {
            browser,
            page,
            handler,
        })
    }

    async fn element(&self, locator: &Locator) -> Result<Element> {
        let element = match locator {
            Locator::Css(selector) => self.page.find_element(selector.as_str()).await,
            Locator::XPath(expression) => self.page.find_xpath(expression.as_str()).await,
        };
        element.with_context(|| format!("element not found: {locator}"))
    }

    async fn clear(&self, locator: &Locator) -> Result<()> {
        let script = format!(
            r#"(() => {{
                const el = {};
                if (!el) return false;
                el.focus();
                const proto = el instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
                Object.getOwnPropertyDescriptor(proto, "value").set.call(el, "");
                el.dispatchEvent(new Event("input", {{ bubbles: true }}));
                return true;
            }})()"#,
            locator.first_js()
        );

        if self.evaluate(&script).await? != Value::Bool(true) {
            bail!("element not found: {locator}");
        }
        Ok(())
    }

    pub async fn close(mut self) -> Result<()> {
        info!("closing Chrome");

        let result = async {
            self.browser.close().await.context("failed to close Chrome")?;
            self.browser.wait().await.context("Chrome did not exit")?;
            anyhow::Ok(())
        }
        .await;

        self.handler.abort();
        result
    }
}

#[async_trait]
impl PageDriver for BrowserSession {
    async fn goto(&self, url: &str) -> Result<()> {
        info!(url, "navigating");
        self.page
            .goto(url)
            .await
            .with_context(|| format!("failed to open {url}"))?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn probe(&self, locator: &Locator) -> Result<Probe> {
        let value = self.evaluate(&probe_script(locator)).await?;
        serde_json::from_value(value).with_context(|| format!("unexpected probe result for {locator}"))
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        let native = async {
            let element = self.element(locator).await?;
            element.scroll_into_view().await?;
            element.click().await?;
            anyhow::Ok(())
        }
        .await;

        if let Err(e) = native {
            warn!(%locator, error = %e, "mouse click failed, falling back to a script click");
            if self.evaluate(&click_script(locator)).await? != Value::Bool(true) {
                bail!("element not found: {locator}");
            }
        }

        Ok(())
    }

    async fn fill(&self, locator: &Locator, text: &str) -> Result<()> {
        self.clear(locator).await?;
        let element = self.element(locator).await?;
        element.click().await?;
        element.type_str(text).await?;
        Ok(())
    }

    async fn text_of(&self, locator: &Locator) -> Result<Option<String>> {
        Ok(self
            .evaluate(&text_script(locator))
            .await?
            .as_str()
            .map(str::to_string))
    }

    async fn count(&self, locator: &Locator) -> Result<usize> {
        let value = self.evaluate(&count_script(locator)).await?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }

    async fn evaluate(&self, script: &str) -> Result<Value> {
        let result = self.page.evaluate(script).await?;
        Ok(result.into_value::<Value>().unwrap_or(Value::Null))
    }
}
