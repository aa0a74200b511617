//! Linear locator search: try each locator in order, give each one a fixed
//! wait budget, stop at the first that is ready.

use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::browser::driver::{PageDriver, Readiness};
use crate::browser::locator::Locator;
use crate::error::StepError;

/// Per-locator wait budget and polling interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wait {
    pub budget: Duration,
    pub poll: Duration,
}

impl Wait {
    pub fn new(budget: Duration) -> Self {
        Self {
            budget,
            poll: Duration::from_millis(250),
        }
    }

    pub fn with_poll(mut self, poll: Duration) -> Self {
        self.poll = poll;
        self
    }
}

impl Default for Wait {
    fn default() -> Self {
        Self::new(Duration::from_secs(15))
    }
}

/// A named element to locate, with the locators to try in order.
#[derive(Debug, Clone)]
pub struct Step {
    pub name: String,
    pub locators: Vec<Locator>,
    pub readiness: Readiness,
}

impl Step {
    pub fn clickable(name: impl Into<String>, locators: Vec<Locator>) -> Self {
        Self {
            name: name.into(),
            locators,
            readiness: Readiness::Clickable,
        }
    }

    pub fn present(name: impl Into<String>, locators: Vec<Locator>) -> Self {
        Self {
            name: name.into(),
            locators,
            readiness: Readiness::Present,
        }
    }
}

/// The locator that matched and its position in the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    pub index: usize,
    pub locator: Locator,
}

/// Polls one locator until it satisfies `readiness` or the budget runs out.
/// A probe error (a malformed XPath, a detached frame) counts as no match.
pub async fn wait_for(
    page: &dyn PageDriver,
    locator: &Locator,
    readiness: Readiness,
    wait: Wait,
) -> bool {
    let started = Instant::now();

    loop {
        match page.probe(locator).await {
            Ok(probe) if readiness.satisfied_by(probe) => return true,
            Ok(_) => {}
            Err(e) => {
                debug!(%locator, error = %e, "probe failed");
                return false;
            }
        }

        if started.elapsed() >= wait.budget {
            return false;
        }

        tokio::time::sleep(wait.poll).await;
    }
}

pub async fn find_first(
    page: &dyn PageDriver,
    locators: &[Locator],
    readiness: Readiness,
    wait: Wait,
) -> Option<Located> {
    for (index, locator) in locators.iter().enumerate() {
        if wait_for(page, locator, readiness, wait).await {
            return Some(Located {
                index,
                locator: locator.clone(),
            });
        }

        debug!(%locator, attempt = index + 1, "no match, trying next locator");
    }

    None
}

/// Runs the search for `step` and turns "nothing matched" into an error.
pub async fn require(page: &dyn PageDriver, step: &Step, wait: Wait) -> Result<Located, StepError> {
    debug!(step = %step.name, locators = step.locators.len(), "locating");

    match find_first(page, &step.locators, step.readiness, wait).await {
        Some(located) => {
            info!(step = %step.name, locator = %located.locator, "found");
            Ok(located)
        }
        None => Err(StepError::NotFound {
            step: step.name.clone(),
            tried: step.locators.iter().map(ToString::to_string).collect(),
        }),
    }
}
