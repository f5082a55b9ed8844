//! Maps the on-screen position of every score badge to a visual style.
//!
//! Badges near the top of the feed are full size, fully opaque and saturated;
//! the further down the viewport a badge sits, the smaller and fainter its
//! story becomes. The pass is split into a read phase
//! ([`ViewportSnapshot::capture`]) and a pure compute phase
//! ([`compute_styles`]) so geometry is never read between style writes.

use std::collections::HashMap;

use crate::models::SlotKey;

/// Badge rows above this distance from the document top keep full scale.
pub const SCALE_ORIGIN: f32 = 170.0;
pub const BADGE_SIZE: f32 = 40.0;
pub const BADGE_HUE: f32 = 42.0;
pub const BADGE_LIGHTNESS: f32 = 50.0;

const SCALE_FALLOFF: f32 = 0.05;
const OPACITY_FALLOFF: f32 = 0.5;
const SATURATION_BASE_WIDTH: f32 = 38.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub top: f32,
    pub left: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self { top, left, width, height }
    }
}

/// Vertical extent of the document, in the same coordinates as badge rects.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DocumentBand {
    pub top: f32,
    pub bottom: f32,
}

/// Read access to the current layout.
pub trait GeometryProvider {
    fn document_band(&self) -> DocumentBand;
    fn container_height(&self) -> f32;
    /// Current rect of the score badge inside the slot, if it is rendered.
    fn badge_rect(&self, key: SlotKey) -> Option<Rect>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemStyle {
    pub scale: f32,
    pub opacity: f32,
    /// Saturation percentage of the badge color. Not clamped.
    pub saturation: f32,
}

impl ItemStyle {
    pub const NEUTRAL: ItemStyle = ItemStyle {
        scale: 1.0,
        opacity: 1.0,
        saturation: 100.0,
    };

    /// Side length of the square badge.
    pub fn badge_size(&self) -> f32 {
        self.scale * BADGE_SIZE
    }
}

impl Default for ItemStyle {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Write side of the pass.
pub trait StyleSink {
    fn apply_style(&mut self, key: SlotKey, style: ItemStyle);
}

impl StyleSink for HashMap<SlotKey, ItemStyle> {
    fn apply_style(&mut self, key: SlotKey, style: ItemStyle) {
        self.insert(key, style);
    }
}

/// Which badges are skipped as being outside the document band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisibilityFilter {
    /// `top < band.top && top > band.bottom`. Only skips anything when the
    /// band is inverted, so in practice every badge is styled.
    #[default]
    AsShipped,
    /// `top < band.top || top > band.bottom`.
    Corrected,
}

impl VisibilityFilter {
    pub fn skips(self, badge_top: f32, band: DocumentBand) -> bool {
        match self {
            VisibilityFilter::AsShipped => badge_top < band.top && badge_top > band.bottom,
            VisibilityFilter::Corrected => badge_top < band.top || badge_top > band.bottom,
        }
    }
}

/// Geometry read once per pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewportSnapshot {
    pub band: DocumentBand,
    pub container_height: f32,
    pub badges: Vec<(SlotKey, Rect)>,
}

impl ViewportSnapshot {
    /// Reads the band, the container and every badge in `keys`. Slots that
    /// are not rendered yet are left out.
    pub fn capture<G, I>(geometry: &G, keys: I) -> Self
    where
        G: GeometryProvider + ?Sized,
        I: IntoIterator<Item = SlotKey>,
    {
        let badges = keys
            .into_iter()
            .filter_map(|key| geometry.badge_rect(key).map(|rect| (key, rect)))
            .collect();

        Self {
            band: geometry.document_band(),
            container_height: geometry.container_height(),
            badges,
        }
    }
}

/// Style of one badge. Scale and opacity are capped at 1 but can go
/// negative for badges far below the container.
pub fn style_for(badge: Rect, band: DocumentBand, container_height: f32) -> ItemStyle {
    let score_location = badge.top - band.top;
    let depth = (score_location - SCALE_ORIGIN) / container_height;

    ItemStyle {
        scale: (1.0 - SCALE_FALLOFF * depth).min(1.0),
        opacity: (1.0 - OPACITY_FALLOFF * depth).min(1.0),
        saturation: 100.0 * (badge.width - SATURATION_BASE_WIDTH) / 2.0,
    }
}

pub fn compute_styles(snapshot: &ViewportSnapshot, filter: VisibilityFilter) -> Vec<(SlotKey, ItemStyle)> {
    // A collapsed container has no meaningful depth.
    if snapshot.container_height <= 0.0 {
        return Vec::new();
    }

    snapshot
        .badges
        .iter()
        .filter(|(_, rect)| !filter.skips(rect.top, snapshot.band))
        .map(|&(key, rect)| (key, style_for(rect, snapshot.band, snapshot.container_height)))
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ViewportStylist {
    filter: VisibilityFilter,
}

impl ViewportStylist {
    pub fn new(filter: VisibilityFilter) -> Self {
        Self { filter }
    }

    /// Full read-compute-write pass. Returns how many slots were styled.
    pub fn restyle<G, I, S>(&self, geometry: &G, keys: I, sink: &mut S) -> usize
    where
        G: GeometryProvider + ?Sized,
        I: IntoIterator<Item = SlotKey>,
        S: StyleSink + ?Sized,
    {
        let snapshot = ViewportSnapshot::capture(geometry, keys);
        let styles = compute_styles(&snapshot, self.filter);
        let count = styles.len();
        for (key, style) in styles {
            sink.apply_style(key, style);
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    struct FakeGeometry {
        band: DocumentBand,
        height: f32,
        badges: HashMap<SlotKey, Rect>,
    }

    impl GeometryProvider for FakeGeometry {
        fn document_band(&self) -> DocumentBand {
            self.band
        }
        fn container_height(&self) -> f32 {
            self.height
        }
        fn badge_rect(&self, key: SlotKey) -> Option<Rect> {
            self.badges.get(&key).copied()
        }
    }

    fn badge_at(top: f32) -> Rect {
        Rect::new(10.0, top, 40.0, 40.0)
    }

    fn band() -> DocumentBand {
        DocumentBand { top: 0.0, bottom: 800.0 }
    }

    #[test]
    fn badges_above_the_origin_keep_full_style() {
        let style = style_for(badge_at(100.0), band(), 800.0);
        assert_eq!(style.scale, 1.0);
        assert_eq!(style.opacity, 1.0);
        assert_eq!(style.saturation, 100.0);
    }

    #[test]
    fn badges_shrink_and_fade_with_depth() {
        // One container height below the origin.
        let style = style_for(badge_at(970.0), band(), 800.0);
        assert!((style.scale - 0.95).abs() < 1e-6);
        assert!((style.opacity - 0.5).abs() < 1e-6);
    }

    #[test]
    fn opacity_is_not_clamped_below_zero() {
        let style = style_for(badge_at(170.0 + 3.0 * 800.0), band(), 800.0);
        assert!(style.opacity < 0.0);
        assert!((style.opacity + 0.5).abs() < 1e-5);
    }

    #[test]
    fn saturation_follows_badge_width() {
        let narrow = Rect::new(0.0, 0.0, 38.0, 38.0);
        assert_eq!(style_for(narrow, band(), 800.0).saturation, 0.0);
        let shrunk = Rect::new(0.0, 0.0, 39.0, 39.0);
        assert_eq!(style_for(shrunk, band(), 800.0).saturation, 50.0);
    }

    #[test]
    fn as_shipped_filter_skips_nothing_on_a_normal_band() {
        let filter = VisibilityFilter::AsShipped;
        assert!(!filter.skips(-500.0, band()));
        assert!(!filter.skips(5_000.0, band()));
        // Only an inverted band trips it.
        let inverted = DocumentBand { top: 100.0, bottom: 0.0 };
        assert!(filter.skips(50.0, inverted));
    }

    #[test]
    fn corrected_filter_skips_outside_the_band() {
        let filter = VisibilityFilter::Corrected;
        assert!(filter.skips(-1.0, band()));
        assert!(filter.skips(801.0, band()));
        assert!(!filter.skips(400.0, band()));
    }

    #[test]
    fn restyle_writes_every_rendered_badge() {
        let geometry = FakeGeometry {
            band: band(),
            height: 800.0,
            badges: HashMap::from([
                (SlotKey::Story(1), badge_at(100.0)),
                (SlotKey::Story(2), badge_at(2_000.0)),
            ]),
        };
        let mut styles = HashMap::new();
        let keys = [SlotKey::Story(1), SlotKey::Story(2), SlotKey::Story(3)];

        let count = ViewportStylist::default().restyle(&geometry, keys, &mut styles);

        assert_eq!(count, 2);
        assert!(styles.contains_key(&SlotKey::Story(2)));
        assert!(!styles.contains_key(&SlotKey::Story(3)));
    }

    #[test]
    fn corrected_restyle_leaves_offscreen_badges_alone() {
        let geometry = FakeGeometry {
            band: band(),
            height: 800.0,
            badges: HashMap::from([(SlotKey::Story(1), badge_at(2_000.0))]),
        };
        let mut styles = HashMap::new();

        let count = ViewportStylist::new(VisibilityFilter::Corrected)
            .restyle(&geometry, [SlotKey::Story(1)], &mut styles);

        assert_eq!(count, 0);
        assert!(styles.is_empty());
    }

    #[test]
    fn zero_height_container_styles_nothing() {
        let snapshot = ViewportSnapshot {
            band: band(),
            container_height: 0.0,
            badges: vec![(SlotKey::Story(1), badge_at(10.0))],
        };
        assert!(compute_styles(&snapshot, VisibilityFilter::AsShipped).is_empty());
    }

    proptest! {
        #[test]
        fn styling_is_deterministic(
            tops in prop::collection::vec(-2_000.0f32..5_000.0, 0..40),
            widths in prop::collection::vec(20.0f32..40.0, 40),
            band_top in -3_000.0f32..0.0,
            height in 1.0f32..2_000.0,
        ) {
            let snapshot = ViewportSnapshot {
                band: DocumentBand { top: band_top, bottom: band_top + height },
                container_height: height,
                badges: tops
                    .iter()
                    .zip(&widths)
                    .enumerate()
                    .map(|(i, (&top, &width))| (SlotKey::Story(i as u64), Rect::new(0.0, top, width, width)))
                    .collect(),
            };

            let first = compute_styles(&snapshot, VisibilityFilter::AsShipped);
            let second = compute_styles(&snapshot, VisibilityFilter::AsShipped);
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.len(), snapshot.badges.len());
            for (_, style) in first {
                prop_assert!(style.scale <= 1.0);
                prop_assert!(style.opacity <= 1.0);
            }
        }
    }
}
