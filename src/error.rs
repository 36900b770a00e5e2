use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("element `{selector}` not found within {timeout:?}")]
    ElementTimeout { selector: String, timeout: Duration },

    #[error("could not read page markup: {0}")]
    Markup(String),

    #[error("script evaluation failed: {0}")]
    Script(String),

    #[error("could not close the browser tab: {0}")]
    Close(String),

    #[error("no browser session is open")]
    NoSession,
}

#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Connectivity could not be restored; nothing useful can happen after this.
    #[error("no network connectivity after {reconnects} reconnect attempts")]
    ConnectivityLost { reconnects: usize },

    /// A retry loop running under the abort policy gave up.
    #[error("{operation} failed after {attempts} attempts: {last}")]
    Exhausted {
        operation: String,
        attempts: usize,
        last: String,
    },

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("invalid selector `{selector}`: {reason}")]
    Selector { selector: String, reason: String },

    #[error("invalid url `{url}`: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl ScrapeError {
    /// Fatal errors end the run instead of being recorded against one profile.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ScrapeError::ConnectivityLost { .. } | ScrapeError::Exhausted { .. }
        )
    }
}
