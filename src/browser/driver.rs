//! The seam between the dashboard steps and a live browser page.

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use crate::browser::locator::Locator;

/// How far along an element is towards being usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Probe {
    Missing,
    Present,
    Clickable,
}

/// What a step needs from the element it waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// The element is attached to the document.
    Present,
    /// The element is displayed and not disabled.
    Clickable,
}

impl Readiness {
    pub fn satisfied_by(self, probe: Probe) -> bool {
        match self {
            Readiness::Present => probe >= Probe::Present,
            Readiness::Clickable => probe == Probe::Clickable,
        }
    }
}

/// A page the workflow can drive.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn goto(&self, url: &str) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    async fn probe(&self, locator: &Locator) -> Result<Probe>;

    async fn click(&self, locator: &Locator) -> Result<()>;

    /// Clears the element and types `text` into it.
    async fn fill(&self, locator: &Locator, text: &str) -> Result<()>;

    async fn text_of(&self, locator: &Locator) -> Result<Option<String>>;

    async fn count(&self, locator: &Locator) -> Result<usize>;

    /// Evaluates a JS expression and returns its JSON value.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;
}

/// JS expression returning `"missing"`, `"present"` or `"clickable"` for the
/// first element `locator` resolves to.
pub fn probe_script(locator: &Locator) -> String {
    format!(
        r#"(() => {{
            const el = {};
            if (!el) return "missing";
            const style = window.getComputedStyle(el);
            const rect = el.getBoundingClientRect();
            const shown = style.display !== "none" && style.visibility !== "hidden" && rect.width > 0 && rect.height > 0;
            const enabled = !el.disabled && el.getAttribute("aria-disabled") !== "true";
            return shown && enabled ? "clickable" : "present";
        }})()"#,
        locator.first_js()
    )
}

/// JS expression that clicks the first element `locator` resolves to and
/// returns whether there was one.
pub fn click_script(locator: &Locator) -> String {
    format!(
        r#"(() => {{
            const el = {};
            if (!el) return false;
            el.scrollIntoView({{ block: "center" }});
            el.click();
            return true;
        }})()"#,
        locator.first_js()
    )
}

/// JS expression returning the trimmed text of the first match, or `null`.
pub fn text_script(locator: &Locator) -> String {
    format!(
        r#"(() => {{
            const el = {};
            return el ? (el.innerText || el.textContent || "").trim() : null;
        }})()"#,
        locator.first_js()
    )
}

/// JS expression returning how many elements `locator` resolves to.
pub fn count_script(locator: &Locator) -> String {
    format!("{}.length", locator.all_js())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presence_accepts_clickable_elements() {
        assert!(Readiness::Present.satisfied_by(Probe::Present));
        assert!(Readiness::Present.satisfied_by(Probe::Clickable));
        assert!(!Readiness::Present.satisfied_by(Probe::Missing));
        assert!(!Readiness::Clickable.satisfied_by(Probe::Present));
        assert!(Readiness::Clickable.satisfied_by(Probe::Clickable));
    }

    #[test]
    fn probe_results_deserialize_from_script_output() {
        let probe: Probe = serde_json::from_value(serde_json::json!("clickable")).unwrap();
        assert_eq!(probe, Probe::Clickable);
    }

    #[test]
    fn scripts_embed_the_locator() {
        let locator = Locator::css("#login-button");
        assert!(probe_script(&locator).contains(r##"document.querySelector("#login-button")"##));
        assert!(count_script(&locator).ends_with(".length"));
    }
}
