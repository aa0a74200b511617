pub mod browser;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod sheets;
pub mod utils;
