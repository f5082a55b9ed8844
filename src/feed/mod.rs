//! Feed core: batch loading, viewport styling, the story panel animation
//! and the scroll driver tying them together. Nothing in here touches the
//! GUI toolkit; layout comes in through [`stylist::GeometryProvider`] and
//! frames through [`panel::FrameScheduler`].

pub mod comments;
pub mod coordinator;
pub mod loader;
pub mod panel;
pub mod stylist;

pub use comments::{CommentFetcher, CommentThread};
pub use coordinator::{ScrollCoordinator, ScrollMetrics};
pub use loader::{BatchLoader, ItemFetcher};
pub use panel::{FrameScheduler, PanelAnimator, PanelSurface, Phase};
pub use stylist::{DocumentBand, GeometryProvider, ItemStyle, Rect, ViewportStylist, VisibilityFilter};
