use thiserror::Error;

/// Why a single delivery to the tracking API did not succeed.
///
/// Every variant folds into the `Err` side of [`DeliveryResult`](crate::DeliveryResult).
/// Nothing here is ever raised past the sender.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid response body: {0}")]
    Decode(String),

    /// The event was missing a required field and was never sent.
    #[error("{0}")]
    Invalid(String),

    /// Non-2xx answer. Displays as the raw response body.
    #[error("{body}")]
    Rejected { status: u16, body: String },
}

impl DeliveryError {
    /// Classify a `reqwest` failure at the transport boundary.
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        let message = err.to_string();
        if err.is_timeout() {
            Self::Timeout(message)
        } else if err.is_connect() {
            Self::Connect(message)
        } else {
            Self::Transport(message)
        }
    }

    /// HTTP status of a remote rejection, if that is what this is.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors while reading [`TrackerConfig`](crate::TrackerConfig) from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}
