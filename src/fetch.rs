//! Runs API requests off the UI thread.
//!
//! Every request is a blocking call on the tokio blocking pool. Its outcome,
//! success or failure, is sent back as a [`FetchEvent`] over a channel that
//! the UI drains once per frame.

use anyhow::{Context as _, Result};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::feed::{CommentFetcher, ItemFetcher};
use crate::hn_client::HackerNewsClient;
use crate::models::{Comment, Item, ItemId};

#[derive(Debug)]
pub enum FetchEvent {
    TopIds(Result<Vec<ItemId>, FetchError>),
    Item {
        id: ItemId,
        outcome: Result<Item, FetchError>,
    },
    Comment {
        generation: u64,
        id: ItemId,
        outcome: Result<Comment, FetchError>,
    },
}

pub struct Fetcher {
    runtime: Option<Runtime>,
    client: Arc<HackerNewsClient>,
    events: Sender<FetchEvent>,
    repaint: Option<egui::Context>,
}

impl Fetcher {
    pub fn new(client: HackerNewsClient, events: Sender<FetchEvent>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("hn-fetch")
            .enable_all()
            .build()
            .context("failed to start fetch runtime")?;

        Ok(Self {
            runtime: Some(runtime),
            client: Arc::new(client),
            events,
            repaint: None,
        })
    }

    /// Context woken up whenever a request completes.
    pub fn set_repaint_context(&mut self, ctx: egui::Context) {
        self.repaint = Some(ctx);
    }

    pub fn fetch_top_ids(&self) {
        self.dispatch(|client| client.fetch_top_item_ids(), FetchEvent::TopIds);
    }

    fn dispatch<T, F, W>(&self, request: F, wrap: W)
    where
        T: Send + 'static,
        F: FnOnce(&HackerNewsClient) -> Result<T, FetchError> + Send + 'static,
        W: FnOnce(Result<T, FetchError>) -> FetchEvent + Send + 'static,
    {
        let Some(runtime) = &self.runtime else {
            warn!("fetch requested after shutdown");
            return;
        };
        let client = Arc::clone(&self.client);
        let events = self.events.clone();
        let repaint = self.repaint.clone();

        runtime.spawn(async move {
            let outcome = tokio::task::spawn_blocking(move || request(&client))
                .await
                .unwrap_or_else(|join_err| Err(FetchError::Worker(join_err.to_string())));

            // The receiver is gone once the window closes.
            if events.send(wrap(outcome)).is_err() {
                debug!("dropping fetch result after shutdown");
                return;
            }
            if let Some(ctx) = repaint {
                ctx.request_repaint();
            }
        });
    }
}

impl ItemFetcher for Fetcher {
    fn fetch_item(&mut self, id: ItemId) {
        self.dispatch(
            move |client| client.fetch_item_by_id(id),
            move |outcome| FetchEvent::Item { id, outcome },
        );
    }
}

impl CommentFetcher for Fetcher {
    fn fetch_comment(&mut self, generation: u64, id: ItemId) {
        self.dispatch(
            move |client| client.fetch_comment_by_id(id),
            move |outcome| FetchEvent::Comment {
                generation,
                id,
                outcome,
            },
        );
    }
}

impl Drop for Fetcher {
    // Requests still in flight must not hold the window open on exit.
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
