//! The clinic dashboard workflow, one function per screen interaction.

mod download;
mod login;
mod period;
mod ranking;

pub use download::{Diagnostics, diagnose, download, download_started, locate_download_button};
pub use login::{Credentials, DEFAULT_LOGIN_URL, login, login_succeeded};
pub use period::{DateField, DateRange, Period, month_name, select_period};
pub use ranking::{list_ranking, open_ranking};

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::browser::{Located, Locator, PageDriver, Step, Wait, require};

/// Waits around every click on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub wait: Wait,
    pub before_click: Duration,
    pub after_click: Duration,
}

impl Timing {
    /// Same search budget, with the post-click pause cut down to the
    /// pre-click one. Used for clicks that do not load anything.
    pub fn brief(self) -> Self {
        Self {
            after_click: self.before_click,
            ..self
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            wait: Wait::default(),
            before_click: Duration::from_secs(1),
            after_click: Duration::from_secs(5),
        }
    }
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

/// Locates the element of `step` and clicks it, settling before and after.
pub async fn click_step(page: &dyn PageDriver, step: &Step, timing: Timing) -> Result<Located> {
    let located = require(page, step, timing.wait).await?;

    pause(timing.before_click).await;
    info!(step = %step.name, "clicking");
    page.click(&located.locator)
        .await
        .with_context(|| format!("failed to click {}", step.name))?;
    pause(timing.after_click).await;

    Ok(located)
}

/// Checks whether any indicator is on the page. Only logs: a missing
/// indicator never fails the run.
pub async fn confirm(page: &dyn PageDriver, what: &str, indicators: &[Locator]) -> bool {
    for indicator in indicators {
        match page.count(indicator).await {
            Ok(n) if n > 0 => {
                info!(%indicator, "{what} confirmed");
                return true;
            }
            Ok(_) => {}
            Err(e) => warn!(%indicator, error = %e, "indicator check failed"),
        }
    }

    warn!("{what} looks fine but no indicator confirmed it");
    false
}

/// Logs the page URL after a step.
pub async fn log_url(page: &dyn PageDriver, after: &str) {
    match page.current_url().await {
        Ok(url) => info!(url = %url, "current URL after {after}"),
        Err(e) => warn!(error = %e, "could not read the current URL"),
    }
}
