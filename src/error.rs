//! Failure values for the fetch layer.
//!
//! A failed request never unwinds through the feed. It is turned into a
//! [`FetchError`] and delivered through the same completion path as a
//! successful response, so the loader can settle its batch and the slot can
//! show the failure.

use thiserror::Error;

use crate::models::ItemId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("could not decode {url}: {message}")]
    Decode { url: String, message: String },

    /// The API answered `null` for this id.
    #[error("item {0} does not exist")]
    Missing(ItemId),

    /// The item exists but was deleted or flagged dead.
    #[error("item {0} was removed")]
    Removed(ItemId),

    /// The worker running the request went away before reporting back.
    #[error("fetch worker failed: {0}")]
    Worker(String),
}

impl FetchError {
    pub fn transport(url: &str, err: &reqwest::Error) -> Self {
        Self::Transport {
            url: url.to_string(),
            message: err.to_string(),
        }
    }

    pub fn decode(url: &str, err: &serde_json::Error) -> Self {
        Self::Decode {
            url: url.to_string(),
            message: err.to_string(),
        }
    }

    /// Short text for a failed render slot.
    pub fn summary(&self) -> String {
        match self {
            FetchError::Transport { .. } => "Network error".to_string(),
            FetchError::Status { status, .. } => format!("Server error ({})", status),
            FetchError::Decode { .. } => "Unreadable response".to_string(),
            FetchError::Missing(_) => "Not found".to_string(),
            FetchError::Removed(_) => "[deleted]".to_string(),
            FetchError::Worker(_) => "Request aborted".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summaries_are_short_and_specific() {
        let status = FetchError::Status {
            url: "https://example.com".to_string(),
            status: 503,
        };
        assert_eq!(status.summary(), "Server error (503)");
        assert_eq!(FetchError::Missing(7).summary(), "Not found");
        assert_eq!(FetchError::Missing(7).to_string(), "item 7 does not exist");
        assert_eq!(FetchError::Removed(7).summary(), "[deleted]");
    }
}
