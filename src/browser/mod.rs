pub mod driver;
pub mod fallback;
pub mod locator;
pub mod session;

#[cfg(test)]
pub(crate) mod fake;

pub use driver::{PageDriver, Probe, Readiness};
pub use fallback::{Located, Step, Wait, find_first, require, wait_for};
pub use locator::Locator;
pub use session::{BrowserSession, LaunchOptions};
