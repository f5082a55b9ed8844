use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::fmt;

use crate::error::FetchError;

pub type ItemId = u64;

/// A top-level story as returned by `/v0/item/{id}.json`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Item {
    pub id: ItemId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub score: i64,
    #[serde(rename = "by", default)]
    pub submitter: String,
    #[serde(rename = "time", with = "chrono::serde::ts_seconds")]
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(rename = "kids", default)]
    pub child_ids: Vec<ItemId>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub dead: bool,
    // Total comment count, including nested replies
    #[serde(default)]
    pub descendants: u32,
}

impl Item {
    pub fn is_removed(&self) -> bool {
        self.deleted || self.dead
    }

    /// Host part of the story link, shown next to the title.
    pub fn host(&self) -> Option<String> {
        let url = reqwest::Url::parse(self.url.as_deref()?).ok()?;
        let host = url.host_str()?;
        Some(host.trim_start_matches("www.").to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Comment {
    pub id: ItemId,
    #[serde(rename = "by", default)]
    pub author: String,
    #[serde(default)]
    pub text: String,
    #[serde(rename = "time", with = "chrono::serde::ts_seconds")]
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub dead: bool,
}

impl Comment {
    pub fn is_removed(&self) -> bool {
        self.deleted || self.dead
    }

    /// Comment body without markup, ready for a plain label.
    pub fn plain_text(&self) -> String {
        if self.is_removed() {
            return "[deleted]".to_string();
        }
        markup_to_text(&self.text)
    }
}

/// Stable key of a render slot, derived from the id it will display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SlotKey {
    Story(ItemId),
    Comment(ItemId),
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotKey::Story(id) => write!(f, "s-{}", id),
            SlotKey::Comment(id) => write!(f, "sdc-{}", id),
        }
    }
}

/// Content of a render slot between request and completion.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot<T> {
    Loading,
    Ready(T),
    Failed(FetchError),
}

impl<T> Slot<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Slot::Loading)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Slot::Ready(value) => Some(value),
            _ => None,
        }
    }
}

impl<T> From<Result<T, FetchError>> for Slot<T> {
    fn from(outcome: Result<T, FetchError>) -> Self {
        match outcome {
            Ok(value) => Slot::Ready(value),
            Err(err) => Slot::Failed(err),
        }
    }
}

/// "3 hours ago" style age of a timestamp relative to `now`.
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds().max(0);

    let (amount, unit) = match seconds {
        s if s < 60 => return "just now".to_string(),
        s if s < 3_600 => (s / 60, "minute"),
        s if s < 86_400 => (s / 3_600, "hour"),
        s if s < 2_592_000 => (s / 86_400, "day"),
        s if s < 31_536_000 => (s / 2_592_000, "month"),
        s => (s / 31_536_000, "year"),
    };

    if amount == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", amount, unit)
    }
}

lazy_static! {
    static ref PARAGRAPH: Regex = Regex::new(r"(?i)<p>").unwrap();
    static ref ANY_TAG: Regex = Regex::new(r"<[^>]+>").unwrap();
}

/// Flattens the small HTML subset the API uses in comment bodies.
pub fn markup_to_text(html: &str) -> String {
    let text = PARAGRAPH.replace_all(html, "\n\n");
    let text = ANY_TAG.replace_all(&text, "");
    html_escape::decode_html_entities(&text).trim().to_string()
}
