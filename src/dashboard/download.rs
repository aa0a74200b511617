use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::browser::locator::MARK_ATTRIBUTE;
use crate::browser::{Located, Locator, PageDriver, Readiness, Wait, find_first, wait_for};
use crate::dashboard::{Timing, pause};
use crate::error::StepError;

const MARK: &str = "download";

fn button_locators() -> Vec<Locator> {
    vec![
        Locator::xpath(
            "//span[text()='download' and contains(@class, 'material-symbols-outlined')]/parent::button",
        ),
        Locator::css("button[type='button'][tabindex='0'].MuiButton-outlined"),
        Locator::css("button.force-display.css-1r9ztn7"),
    ]
}

/// Page scripts that look for the button structurally. Each one tags what
/// it finds with the mark attribute and returns `true`.
fn search_scripts() -> [(&'static str, String); 3] {
    let tag = |body: &str| {
        format!(
            r#"(() => {{
                document.querySelectorAll("[{MARK_ATTRIBUTE}='{MARK}']").forEach(e => e.removeAttribute("{MARK_ATTRIBUTE}"));
                const found = (() => {{ {body} }})();
                if (!found) return false;
                found.setAttribute("{MARK_ATTRIBUTE}", "{MARK}");
                return true;
            }})()"#
        )
    };

    [
        (
            "icon parent",
            tag(r#"
                const span = document.evaluate("//span[text()='download' and contains(@class, 'material-symbols-outlined')]", document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue;
                const parent = span && span.parentElement;
                return parent && parent.tagName.toLowerCase() === "button" ? parent : null;
            "#),
        ),
        (
            "toolbar position",
            tag(r#"
                for (const div of document.querySelectorAll("div[style*='position: absolute']")) {
                    if (!(div.getAttribute("style") || "").includes("gap: 8px")) continue;
                    for (const button of div.querySelectorAll("button")) {
                        for (const span of button.querySelectorAll("span")) {
                            if (span.textContent.trim() === "download") return button;
                        }
                    }
                }
                return null;
            "#),
        ),
        (
            "MUI button scan",
            tag(r#"
                for (const button of document.querySelectorAll("button[class*='MuiButton']")) {
                    const html = button.innerHTML;
                    if (html.includes("download") && html.includes("material-symbols-outlined") && html.includes("MuiIcon-root")) return button;
                }
                return null;
            "#),
        ),
    ]
}

/// Element counts logged when no strategy finds the button.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub download_text: usize,
    pub material_icons: usize,
    pub absolute_divs: usize,
    pub mui_buttons: usize,
}

pub async fn diagnose(page: &dyn PageDriver) -> Diagnostics {
    let count = |locator: Locator| async move {
        match page.count(&locator).await {
            Ok(n) => n,
            Err(e) => {
                warn!(%locator, error = %e, "diagnostic count failed");
                0
            }
        }
    };

    Diagnostics {
        download_text: count(Locator::xpath("//*[contains(text(), 'download')]")).await,
        material_icons: count(Locator::css(".material-symbols-outlined")).await,
        absolute_divs: count(Locator::css("div[style*='position: absolute']")).await,
        mui_buttons: count(Locator::css("button[class*='MuiButton']")).await,
    }
}

/// Finds the report download button: the locator list first, then the
/// structural page searches.
pub async fn locate_download_button(
    page: &dyn PageDriver,
    wait: Wait,
) -> Result<Located, StepError> {
    if let Some(located) = find_first(page, &button_locators(), Readiness::Clickable, wait).await {
        info!(locator = %located.locator, strategy = 1, "download button found");
        return Ok(located);
    }

    let marked = Locator::marked(MARK);
    for (i, (name, script)) in search_scripts().iter().enumerate() {
        let strategy = i + 2;
        debug!(strategy, name, "searching for the download button");

        match page.evaluate(script).await {
            Ok(Value::Bool(true)) => {
                if wait_for(page, &marked, Readiness::Clickable, wait).await {
                    info!(strategy, name, "download button found");
                    return Ok(Located {
                        index: strategy - 1,
                        locator: marked,
                    });
                }
                debug!(strategy, "download button found but not clickable");
            }
            Ok(_) => {}
            Err(e) => warn!(strategy, error = %e, "download button search failed"),
        }
    }

    let diagnostics = diagnose(page).await;
    warn!(
        download_text = diagnostics.download_text,
        material_icons = diagnostics.material_icons,
        absolute_divs = diagnostics.absolute_divs,
        mui_buttons = diagnostics.mui_buttons,
        "download button not found"
    );

    Err(StepError::DownloadButtonMissing { strategies: 4 })
}

/// Clicks the download button. Returns whether the page showed any sign
/// of a download starting; the file itself is awaited on disk.
pub async fn download(page: &dyn PageDriver, timing: Timing) -> Result<bool> {
    info!("looking for the download button");
    let located = locate_download_button(page, timing.wait).await?;

    pause(timing.before_click).await;
    page.click(&located.locator)
        .await
        .context("failed to click the download button")?;
    info!("download button clicked");
    pause(timing.after_click).await;

    Ok(download_started(page).await)
}

pub async fn download_started(page: &dyn PageDriver) -> bool {
    match page.current_url().await {
        Ok(url) if url.to_lowercase().contains("download") => {
            info!(url = %url, "download URL detected");
            return true;
        }
        Ok(_) => {}
        Err(e) => warn!(error = %e, "could not read the current URL"),
    }

    let indicators = [
        Locator::css("*[class*='loading'], *[class*='progress'], .spinner"),
        Locator::xpath(
            "//*[contains(text(), 'download') or contains(text(), 'Download') or contains(text(), 'baixando')]",
        ),
        Locator::css("*[style*='display: block']"),
    ];
    for indicator in &indicators {
        match page.count(indicator).await {
            Ok(n) if n > 0 => {
                info!(%indicator, "download indicator detected");
                return true;
            }
            Ok(_) => {}
            Err(e) => warn!(%indicator, error = %e, "download indicator check failed"),
        }
    }

    warn!("no download indicator on the page; some downloads are silent");
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::Probe;
    use crate::browser::fake::FakePage;
    use crate::dashboard::tests::instant;
    use serde_json::json;

    const RANKING: &str = "https://sistema.example.test/ranking";

    #[tokio::test]
    async fn locator_list_is_tried_first() {
        let page = FakePage::new(RANKING);
        page.set(Locator::css("button.force-display.css-1r9ztn7"), Probe::Clickable);
        page.on_script("gap: 8px", json!(true));

        let located = locate_download_button(&page, instant().wait).await.unwrap();

        assert_eq!(located.index, 2);
        assert_eq!(located.locator, Locator::css("button.force-display.css-1r9ztn7"));
    }

    #[tokio::test]
    async fn falls_back_to_the_toolbar_search() {
        let page = FakePage::new(RANKING);
        page.on_script("gap: 8px", json!(true));
        page.set(Locator::marked("download"), Probe::Clickable);

        download(&page, instant()).await.unwrap();

        assert_eq!(page.clicks(), vec![Locator::marked("download")]);
    }

    #[tokio::test]
    async fn mui_scan_is_the_last_resort() {
        let page = FakePage::new(RANKING);
        page.on_script("MuiIcon-root", json!(true));
        page.set(Locator::marked("download"), Probe::Clickable);

        let located = locate_download_button(&page, instant().wait).await.unwrap();
        assert_eq!(located.index, 3);
    }

    #[tokio::test]
    async fn missing_button_fails_after_every_strategy() {
        let page = FakePage::new(RANKING);
        page.set_count(Locator::css("button[class*='MuiButton']"), 7);

        let err = download(&page, instant()).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<StepError>(),
            Some(StepError::DownloadButtonMissing { strategies: 4 })
        ));
        assert!(page.clicks().is_empty());
        assert_eq!(diagnose(&page).await.mui_buttons, 7);
    }

    #[tokio::test]
    async fn download_url_counts_as_started() {
        let page = FakePage::new("https://sistema.example.test/api/Download?id=1");
        assert!(download_started(&page).await);

        let page = FakePage::new(RANKING);
        assert!(!download_started(&page).await);
        page.set_count(Locator::css("*[style*='display: block']"), 1);
        assert!(download_started(&page).await);
    }
}
