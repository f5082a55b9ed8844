//! Per-scroll-event driver of the feed.

use tracing::debug;

use crate::error::FetchError;
use crate::feed::loader::{BatchLoader, BatchStart, Completion, ItemFetcher};
use crate::feed::stylist::{GeometryProvider, StyleSink, ViewportStylist};
use crate::models::{Item, ItemId};

pub const DEFAULT_LOAD_THRESHOLD: f32 = 300.0;

const HEADER_RAISE_AT: f32 = 70.0;
const HEADER_FULL_HEIGHT: f32 = 156.0;
const TITLE_SCALE_DIVISOR: f32 = 300.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollMetrics {
    pub scroll_top: f32,
    pub scroll_height: f32,
    pub viewport_height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeaderStyle {
    /// Header casts a shadow over the feed.
    pub raised: bool,
    pub title_scale: f32,
    pub height: f32,
}

impl HeaderStyle {
    pub fn for_scroll(scroll_top: f32) -> Self {
        let capped = scroll_top.clamp(0.0, HEADER_RAISE_AT);
        Self {
            raised: scroll_top > HEADER_RAISE_AT,
            title_scale: 1.0 - capped / TITLE_SCALE_DIVISOR,
            height: HEADER_FULL_HEIGHT - capped,
        }
    }
}

impl Default for HeaderStyle {
    fn default() -> Self {
        Self::for_scroll(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollOutcome {
    pub header: HeaderStyle,
    pub styled: usize,
    /// Set when the scroll position crossed the load threshold.
    pub batch: Option<BatchStart>,
}

#[derive(Debug, Clone)]
pub struct ScrollCoordinator {
    loader: BatchLoader,
    stylist: ViewportStylist,
    load_threshold: f32,
    header: HeaderStyle,
}

impl ScrollCoordinator {
    pub fn new(loader: BatchLoader, stylist: ViewportStylist, load_threshold: f32) -> Self {
        Self {
            loader,
            stylist,
            load_threshold,
            header: HeaderStyle::default(),
        }
    }

    pub fn loader(&self) -> &BatchLoader {
        &self.loader
    }

    pub fn loader_mut(&mut self) -> &mut BatchLoader {
        &mut self.loader
    }

    pub fn header(&self) -> HeaderStyle {
        self.header
    }

    pub fn should_load(&self, metrics: ScrollMetrics) -> bool {
        metrics.scroll_top > metrics.scroll_height - metrics.viewport_height - self.load_threshold
    }

    /// Installs the ranked ids and loads the first batch.
    pub fn bootstrap<F>(&mut self, ids: Vec<ItemId>, fetcher: &mut F) -> BatchStart
    where
        F: ItemFetcher + ?Sized,
    {
        self.loader.set_ids(ids);
        self.loader.load_next_batch(fetcher)
    }

    /// Handles one scroll event synchronously: header, styles, then the
    /// load threshold check.
    pub fn on_scroll<G, S, F>(
        &mut self,
        metrics: ScrollMetrics,
        geometry: &G,
        sink: &mut S,
        fetcher: &mut F,
    ) -> ScrollOutcome
    where
        G: GeometryProvider + ?Sized,
        S: StyleSink + ?Sized,
        F: ItemFetcher + ?Sized,
    {
        self.header = HeaderStyle::for_scroll(metrics.scroll_top);
        let styled = self.restyle(geometry, sink);

        let batch = if self.should_load(metrics) {
            let start = self.loader.load_next_batch(fetcher);
            debug!(?start, scroll_top = metrics.scroll_top, "load threshold crossed");
            Some(start)
        } else {
            None
        };

        ScrollOutcome {
            header: self.header,
            styled,
            batch,
        }
    }

    /// Routes an item completion to the loader and restyles once the batch
    /// has settled.
    pub fn on_item_loaded<G, S>(
        &mut self,
        id: ItemId,
        outcome: Result<Item, FetchError>,
        geometry: &G,
        sink: &mut S,
    ) -> Completion
    where
        G: GeometryProvider + ?Sized,
        S: StyleSink + ?Sized,
    {
        let completion = self.loader.complete(id, outcome);
        if completion == Completion::Settled {
            self.restyle(geometry, sink);
        }
        completion
    }

    pub fn restyle<G, S>(&self, geometry: &G, sink: &mut S) -> usize
    where
        G: GeometryProvider + ?Sized,
        S: StyleSink + ?Sized,
    {
        self.stylist.restyle(geometry, self.loader.slot_keys(), sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::stylist::{DocumentBand, ItemStyle, Rect};
    use crate::models::SlotKey;
    use chrono::Utc;
    use std::collections::HashMap;

    #[derive(Default)]
    struct RecordingFetcher {
        requested: Vec<ItemId>,
    }

    impl ItemFetcher for RecordingFetcher {
        fn fetch_item(&mut self, id: ItemId) {
            self.requested.push(id);
        }
    }

    /// Every badge stacked 60 units apart from the top of the document.
    struct ListGeometry;

    impl GeometryProvider for ListGeometry {
        fn document_band(&self) -> DocumentBand {
            DocumentBand { top: 0.0, bottom: 600.0 }
        }
        fn container_height(&self) -> f32 {
            600.0
        }
        fn badge_rect(&self, key: SlotKey) -> Option<Rect> {
            match key {
                SlotKey::Story(id) => Some(Rect::new(0.0, id as f32 * 60.0, 40.0, 40.0)),
                SlotKey::Comment(_) => None,
            }
        }
    }

    fn item(id: ItemId) -> Item {
        Item {
            id,
            title: String::new(),
            score: 0,
            submitter: String::new(),
            submitted_at: Utc::now(),
            url: None,
            child_ids: Vec::new(),
            deleted: false,
            dead: false,
            descendants: 0,
        }
    }

    fn coordinator(batch_size: usize) -> ScrollCoordinator {
        ScrollCoordinator::new(
            BatchLoader::new(batch_size),
            ViewportStylist::default(),
            DEFAULT_LOAD_THRESHOLD,
        )
    }

    fn metrics(scroll_top: f32) -> ScrollMetrics {
        ScrollMetrics {
            scroll_top,
            scroll_height: 2_000.0,
            viewport_height: 600.0,
        }
    }

    #[test]
    fn header_raises_past_seventy() {
        assert!(!HeaderStyle::for_scroll(70.0).raised);
        assert!(HeaderStyle::for_scroll(71.0).raised);

        let header = HeaderStyle::for_scroll(500.0);
        assert!((header.title_scale - (1.0 - 70.0 / 300.0)).abs() < 1e-6);
        assert_eq!(header.height, 86.0);
        assert_eq!(HeaderStyle::for_scroll(0.0).title_scale, 1.0);
    }

    #[test]
    fn threshold_is_measured_from_the_bottom() {
        let coordinator = coordinator(10);
        // 2000 - 600 - 300 = 1100
        assert!(!coordinator.should_load(metrics(1_100.0)));
        assert!(coordinator.should_load(metrics(1_100.5)));
    }

    #[test]
    fn scrolling_near_the_bottom_loads_once_per_settlement() {
        let mut coordinator = coordinator(3);
        let mut fetcher = RecordingFetcher::default();
        let mut styles: HashMap<SlotKey, ItemStyle> = HashMap::new();
        coordinator.bootstrap((0..9).collect(), &mut fetcher);
        assert_eq!(fetcher.requested, vec![0, 1, 2]);

        let outcome = coordinator.on_scroll(metrics(1_500.0), &ListGeometry, &mut styles, &mut fetcher);
        assert_eq!(outcome.batch, Some(BatchStart::Busy { pending: 3 }));
        assert!(outcome.header.raised);
        assert_eq!(outcome.styled, 3);

        for id in 0..3 {
            coordinator.on_item_loaded(id, Ok(item(id)), &ListGeometry, &mut styles);
        }
        let outcome = coordinator.on_scroll(metrics(1_500.0), &ListGeometry, &mut styles, &mut fetcher);
        assert_eq!(outcome.batch, Some(BatchStart::Started { first: 3, requested: 3 }));
        assert_eq!(fetcher.requested, (0..6).collect::<Vec<_>>());
    }

    #[test]
    fn scrolling_near_the_top_does_not_load() {
        let mut coordinator = coordinator(3);
        let mut fetcher = RecordingFetcher::default();
        let mut styles: HashMap<SlotKey, ItemStyle> = HashMap::new();
        coordinator.bootstrap((0..9).collect(), &mut fetcher);
        fetcher.requested.clear();

        let outcome = coordinator.on_scroll(metrics(20.0), &ListGeometry, &mut styles, &mut fetcher);
        assert_eq!(outcome.batch, None);
        assert!(fetcher.requested.is_empty());
        assert!(!coordinator.header().raised);
    }

    #[test]
    fn settlement_triggers_a_style_pass() {
        let mut coordinator = coordinator(2);
        let mut fetcher = RecordingFetcher::default();
        let mut styles: HashMap<SlotKey, ItemStyle> = HashMap::new();
        coordinator.bootstrap(vec![10, 11], &mut fetcher);

        coordinator.on_item_loaded(10, Ok(item(10)), &ListGeometry, &mut styles);
        assert!(styles.is_empty());

        let completion = coordinator.on_item_loaded(11, Ok(item(11)), &ListGeometry, &mut styles);
        assert_eq!(completion, Completion::Settled);
        assert_eq!(styles.len(), 2);
        // Badge of item 11 sits at 660, well below the scale origin.
        assert!(styles[&SlotKey::Story(11)].scale < 1.0);
    }
}
