use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::error::FetchError;
use crate::models::{Comment, Item, ItemId};

pub const DEFAULT_API_BASE: &str = "https://hacker-news.firebaseio.com/v0";

/// Blocking client for the public Hacker News API.
///
/// Every call is one-shot: one request per id, no batching and no caching at
/// this layer. Callers run these on worker threads.
#[derive(Debug, Clone)]
pub struct HackerNewsClient {
    client: Client,
    api_base: String,
}

impl HackerNewsClient {
    pub fn new(api_base: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to create HTTP client")?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn top_stories_url(&self) -> String {
        format!("{}/topstories.json", self.api_base)
    }

    pub fn item_url(&self, id: ItemId) -> String {
        format!("{}/item/{}.json", self.api_base, id)
    }

    /// Ranked ids of the current front page, best first.
    pub fn fetch_top_item_ids(&self) -> Result<Vec<ItemId>, FetchError> {
        let url = self.top_stories_url();
        Ok(self.get_json::<Vec<ItemId>>(&url)?.unwrap_or_default())
    }

    pub fn fetch_item_by_id(&self, id: ItemId) -> Result<Item, FetchError> {
        live_story(id, self.get_json(&self.item_url(id))?)
    }

    pub fn fetch_comment_by_id(&self, id: ItemId) -> Result<Comment, FetchError> {
        self.get_json(&self.item_url(id))?
            .ok_or(FetchError::Missing(id))
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| FetchError::transport(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().map_err(|e| FetchError::transport(url, &e))?;
        debug!(url, bytes = body.len(), "fetched");
        decode_body(url, &body)
    }
}

/// Deleted and dead stories come back as stubs without a title. They fail
/// the slot instead of rendering a blank card.
fn live_story(id: ItemId, item: Option<Item>) -> Result<Item, FetchError> {
    match item {
        None => Err(FetchError::Missing(id)),
        Some(item) if item.is_removed() => Err(FetchError::Removed(id)),
        Some(item) => Ok(item),
    }
}

/// The API answers `null` for ids it does not know.
fn decode_body<T: DeserializeOwned>(url: &str, body: &str) -> Result<Option<T>, FetchError> {
    serde_json::from_str::<Option<T>>(body).map_err(|e| FetchError::decode(url, &e))
}
