//! In-memory page used by the step tests.

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::browser::driver::{PageDriver, Probe};
use crate::browser::locator::Locator;

#[derive(Default)]
struct State {
    url: String,
    elements: HashMap<Locator, Probe>,
    // locator -> (probe, probes left before it shows up)
    delayed: HashMap<Locator, (Probe, usize)>,
    broken: HashSet<Locator>,
    texts: HashMap<Locator, String>,
    counts: HashMap<Locator, usize>,
    navigations: HashMap<Locator, String>,
    scripts: Vec<(String, Value)>,
    clicks: Vec<Locator>,
    fills: Vec<(Locator, String)>,
    visited: Vec<String>,
}

pub struct FakePage {
    state: Mutex<State>,
}

impl FakePage {
    pub fn new(url: &str) -> Self {
        Self {
            state: Mutex::new(State {
                url: url.to_string(),
                ..State::default()
            }),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn set(&self, locator: Locator, probe: Probe) {
        self.with(|s| s.elements.insert(locator, probe));
    }

    pub fn set_after(&self, locator: Locator, probe: Probe, probes: usize) {
        self.with(|s| s.delayed.insert(locator, (probe, probes)));
    }

    pub fn fail_probe(&self, locator: Locator) {
        self.with(|s| s.broken.insert(locator));
    }

    pub fn set_text(&self, locator: Locator, text: &str) {
        self.with(|s| {
            s.elements.entry(locator.clone()).or_insert(Probe::Clickable);
            s.texts.insert(locator, text.to_string())
        });
    }

    pub fn set_count(&self, locator: Locator, count: usize) {
        self.with(|s| s.counts.insert(locator, count));
    }

    /// Clicking `locator` moves the page to `url`.
    pub fn navigate_on_click(&self, locator: Locator, url: &str) {
        self.with(|s| s.navigations.insert(locator, url.to_string()));
    }

    /// Scripts containing `needle` evaluate to `value`.
    pub fn on_script(&self, needle: &str, value: Value) {
        self.with(|s| s.scripts.push((needle.to_string(), value)));
    }

    pub fn url(&self) -> String {
        self.with(|s| s.url.clone())
    }

    pub fn clicks(&self) -> Vec<Locator> {
        self.with(|s| s.clicks.clone())
    }

    pub fn fills(&self) -> Vec<(Locator, String)> {
        self.with(|s| s.fills.clone())
    }

    pub fn visited(&self) -> Vec<String> {
        self.with(|s| s.visited.clone())
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn goto(&self, url: &str) -> Result<()> {
        self.with(|s| {
            s.url = url.to_string();
            s.visited.push(url.to_string());
        });
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.url())
    }

    async fn probe(&self, locator: &Locator) -> Result<Probe> {
        self.with(|s| {
            if s.broken.contains(locator) {
                bail!("invalid locator {locator}");
            }

            if let Some((probe, left)) = s.delayed.get_mut(locator) {
                if *left == 0 {
                    return Ok(*probe);
                }
                *left -= 1;
                return Ok(Probe::Missing);
            }

            Ok(s.elements.get(locator).copied().unwrap_or(Probe::Missing))
        })
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        self.with(|s| {
            if !s.elements.contains_key(locator) && !s.delayed.contains_key(locator) {
                return Err(anyhow!("no element for {locator}"));
            }

            s.clicks.push(locator.clone());
            if let Some(url) = s.navigations.get(locator).cloned() {
                s.url = url;
            }
            Ok(())
        })
    }

    async fn fill(&self, locator: &Locator, text: &str) -> Result<()> {
        self.with(|s| s.fills.push((locator.clone(), text.to_string())));
        Ok(())
    }

    async fn text_of(&self, locator: &Locator) -> Result<Option<String>> {
        Ok(self.with(|s| s.texts.get(locator).cloned()))
    }

    async fn count(&self, locator: &Locator) -> Result<usize> {
        Ok(self.with(|s| {
            s.counts
                .get(locator)
                .copied()
                .unwrap_or_else(|| usize::from(s.elements.contains_key(locator)))
        }))
    }

    async fn evaluate(&self, script: &str) -> Result<Value> {
        Ok(self.with(|s| {
            s.scripts
                .iter()
                .find(|(needle, _)| script.contains(needle.as_str()))
                .map(|(_, value)| value.clone())
                .unwrap_or(Value::Null)
        }))
    }
}
