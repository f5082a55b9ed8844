//! Command-line configuration.

use clap::{Parser, ValueEnum};
use std::num::NonZeroUsize;
use std::time::Duration;

use crate::feed::coordinator::DEFAULT_LOAD_THRESHOLD;
use crate::feed::VisibilityFilter;
use crate::hn_client::DEFAULT_API_BASE;

#[derive(Parser, Debug, Clone)]
#[command(name = env!("CARGO_PKG_NAME"), about = "Infinitely scrolling Hacker News top stories")]
pub struct FeedConfig {
    /// Stories requested per batch
    #[arg(long, default_value = "100")]
    pub batch_size: NonZeroUsize,

    /// Distance from the bottom of the feed that triggers the next batch
    #[arg(long, default_value_t = DEFAULT_LOAD_THRESHOLD)]
    pub load_threshold: f32,

    /// Cap on concurrent comment requests (unbounded when omitted)
    #[arg(long)]
    pub comment_concurrency: Option<NonZeroUsize>,

    /// Which score badges are skipped as off-screen when styling
    #[arg(long, value_enum, default_value_t = FilterArg::AsShipped)]
    pub visibility_filter: FilterArg,

    #[arg(long, default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Per-request HTTP timeout
    #[arg(long, default_value_t = 60)]
    pub request_timeout_secs: u64,

    #[arg(long, default_value_t = 1200.0)]
    pub width: f32,

    #[arg(long, default_value_t = 800.0)]
    pub height: f32,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterArg {
    AsShipped,
    Corrected,
}

impl From<FilterArg> for VisibilityFilter {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::AsShipped => VisibilityFilter::AsShipped,
            FilterArg::Corrected => VisibilityFilter::Corrected,
        }
    }
}

impl FeedConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn comment_cap(&self) -> Option<usize> {
        self.comment_concurrency.map(NonZeroUsize::get)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_feed_constants() {
        let config = FeedConfig::try_parse_from(["hn_feed"]).unwrap();
        assert_eq!(config.batch_size.get(), 100);
        assert_eq!(config.load_threshold, 300.0);
        assert_eq!(config.comment_cap(), None);
        assert_eq!(VisibilityFilter::from(config.visibility_filter), VisibilityFilter::AsShipped);
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = FeedConfig::try_parse_from([
            "hn_feed",
            "--batch-size",
            "25",
            "--comment-concurrency",
            "8",
            "--visibility-filter",
            "corrected",
        ])
        .unwrap();
        assert_eq!(config.batch_size.get(), 25);
        assert_eq!(config.comment_cap(), Some(8));
        assert_eq!(VisibilityFilter::from(config.visibility_filter), VisibilityFilter::Corrected);
    }

    #[test]
    fn zero_sizes_are_rejected() {
        assert!(FeedConfig::try_parse_from(["hn_feed", "--batch-size", "0"]).is_err());
        assert!(FeedConfig::try_parse_from(["hn_feed", "--comment-concurrency", "0"]).is_err());
    }
}
