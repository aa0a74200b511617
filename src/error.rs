use thiserror::Error;

/// Failures of the dashboard automation that end a run.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("{step}: no element matched after trying {} locator(s): {}", .tried.len(), .tried.join(" | "))]
    NotFound { step: String, tried: Vec<String> },

    #[error("login rejected (still at {url}){}", format_messages(.messages))]
    LoginRejected { url: String, messages: Vec<String> },

    #[error("download button not found after {strategies} strategies")]
    DownloadButtonMissing { strategies: usize },
}

fn format_messages(messages: &[String]) -> String {
    if messages.is_empty() {
        String::new()
    } else {
        format!(": {}", messages.join("; "))
    }
}
