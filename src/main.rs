use anyhow::anyhow;
use clap::Parser;
use eframe::egui;
use egui::ViewportBuilder;
use std::sync::mpsc;
use tracing_subscriber::EnvFilter;

mod app;
mod config;
mod error;
mod feed;
mod fetch;
mod hn_client;
mod models;
mod theme;

use crate::app::FeedApp;
use crate::config::FeedConfig;
use crate::fetch::Fetcher;
use crate::hn_client::HackerNewsClient;

fn main() -> anyhow::Result<()> {
    // Respect RUST_LOG, default to "info"
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config = FeedConfig::parse();
    tracing::info!(?config, "starting feed");

    let client = HackerNewsClient::new(&config.api_base, config.request_timeout())?;
    let (tx, rx) = mpsc::channel();
    let fetcher = Fetcher::new(client, tx)?;

    let options = eframe::NativeOptions {
        viewport: ViewportBuilder::default()
            .with_inner_size([config.width, config.height])
            .with_min_inner_size([400.0, 300.0])
            .with_title("Hacker News"),
        ..Default::default()
    };

    eframe::run_native(
        "Hacker News",
        options,
        Box::new(move |cc| Ok(Box::new(FeedApp::new(cc, &config, fetcher, rx)))),
    )
    .map_err(|e| anyhow!("failed to run window: {}", e))
}
