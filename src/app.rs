use chrono::{DateTime, Utc};
use egui::{Align2, Color32, CornerRadius, FontId, RichText, ScrollArea, Sense, Stroke, Ui};
use std::collections::HashMap;
use std::sync::mpsc::Receiver;
use tracing::{error, info};

use crate::config::FeedConfig;
use crate::error::FetchError;
use crate::feed::stylist::BADGE_SIZE;
use crate::feed::{
    BatchLoader, CommentThread, DocumentBand, FrameScheduler, GeometryProvider, ItemStyle,
    PanelAnimator, PanelSurface, Phase, ScrollCoordinator, ScrollMetrics, ViewportStylist,
};
use crate::fetch::{FetchEvent, Fetcher};
use crate::models::{time_ago, Comment, Item, ItemId, Slot, SlotKey};
use crate::theme::AppTheme;

enum Bootstrap {
    Loading,
    Ready,
    Failed(FetchError),
}

/// Layout recorded while painting the previous frame.
#[derive(Debug, Default)]
struct FrameGeometry {
    band: DocumentBand,
    container_height: f32,
    badges: HashMap<SlotKey, crate::feed::Rect>,
}

impl GeometryProvider for FrameGeometry {
    fn document_band(&self) -> DocumentBand {
        self.band
    }

    fn container_height(&self) -> f32 {
        self.container_height
    }

    fn badge_rect(&self, key: SlotKey) -> Option<crate::feed::Rect> {
        self.badges.get(&key).copied()
    }
}

#[derive(Debug, Default)]
struct PanelView {
    item: Option<Item>,
    offset: f32,
    opacity: f32,
}

/// Panel surface for one animator call: rendering a story also opens its
/// comment thread.
struct PanelTarget<'a> {
    view: &'a mut PanelView,
    comments: &'a mut CommentThread,
    fetcher: &'a mut Fetcher,
}

impl PanelSurface for PanelTarget<'_> {
    fn render_content(&mut self, item: &Item) {
        self.view.item = Some(item.clone());
        self.comments.open(&item.child_ids, &mut *self.fetcher);
    }

    fn set_opacity(&mut self, opacity: f32) {
        self.view.opacity = opacity;
    }

    fn set_offset(&mut self, offset: f32) {
        self.view.offset = offset;
    }
}

/// Each scheduled tick is one repainted frame.
struct RepaintScheduler<'a>(&'a egui::Context);

impl FrameScheduler for RepaintScheduler<'_> {
    fn schedule_tick(&mut self) {
        self.0.request_repaint();
    }
}

#[derive(Debug)]
enum CardAction {
    Open(Item),
    Retry(ItemId),
    Visit(String),
}

pub struct FeedApp {
    theme: AppTheme,
    fetcher: Fetcher,
    events: Receiver<FetchEvent>,
    bootstrap: Bootstrap,
    coordinator: ScrollCoordinator,
    styles: HashMap<SlotKey, ItemStyle>,
    geometry: FrameGeometry,
    last_scroll_top: Option<f32>,
    animator: PanelAnimator,
    panel: PanelView,
    comments: CommentThread,
}

impl FeedApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: &FeedConfig,
        mut fetcher: Fetcher,
        events: Receiver<FetchEvent>,
    ) -> Self {
        let theme = AppTheme::dark();
        theme.apply_to_ctx(&cc.egui_ctx);

        fetcher.set_repaint_context(cc.egui_ctx.clone());
        fetcher.fetch_top_ids();

        let coordinator = ScrollCoordinator::new(
            BatchLoader::new(config.batch_size.get()),
            ViewportStylist::new(config.visibility_filter.into()),
            config.load_threshold,
        );
        let animator = PanelAnimator::new(config.width);
        let panel = PanelView {
            item: None,
            offset: animator.state().offset,
            opacity: 0.0,
        };

        Self {
            theme,
            fetcher,
            events,
            bootstrap: Bootstrap::Loading,
            coordinator,
            styles: HashMap::new(),
            geometry: FrameGeometry::default(),
            last_scroll_top: None,
            animator,
            panel,
            comments: CommentThread::new(config.comment_cap()),
        }
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                FetchEvent::TopIds(Ok(ids)) => {
                    let start = self.coordinator.bootstrap(ids, &mut self.fetcher);
                    info!(?start, "feed bootstrapped");
                    self.bootstrap = Bootstrap::Ready;
                }
                FetchEvent::TopIds(Err(err)) => {
                    error!(error = %err, "could not load top stories");
                    self.bootstrap = Bootstrap::Failed(err);
                }
                FetchEvent::Item { id, outcome } => {
                    self.coordinator
                        .on_item_loaded(id, outcome, &self.geometry, &mut self.styles);
                }
                FetchEvent::Comment {
                    generation,
                    id,
                    outcome,
                } => {
                    self.comments
                        .complete(generation, id, outcome, &mut self.fetcher);
                }
            }
        }
    }

    fn open_story(&mut self, item: &Item, ctx: &egui::Context) {
        let mut target = PanelTarget {
            view: &mut self.panel,
            comments: &mut self.comments,
            fetcher: &mut self.fetcher,
        };
        self.animator.open(item, &mut target, &mut RepaintScheduler(ctx));
    }

    fn step_panel(&mut self, ctx: &egui::Context) {
        self.animator.set_container_width(ctx.screen_rect().width());
        if !self.animator.tick_due() {
            return;
        }
        let mut target = PanelTarget {
            view: &mut self.panel,
            comments: &mut self.comments,
            fetcher: &mut self.fetcher,
        };
        self.animator.tick(&mut target, &mut RepaintScheduler(ctx));
    }

    fn render_header(&self, ctx: &egui::Context) {
        let header = self.coordinator.header();
        let response = egui::TopBottomPanel::top("header")
            .exact_height(header.height)
            .show_separator_line(false)
            .frame(
                egui::Frame::new()
                    .fill(self.theme.header_background)
                    .inner_margin(egui::Margin::symmetric(16, 12)),
            )
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.add_space(8.0 * header.title_scale);
                    ui.label(
                        RichText::new("Hacker News")
                            .size(32.0 * header.title_scale)
                            .strong()
                            .color(Color32::WHITE),
                    );
                    ui.label(
                        RichText::new("Top Stories")
                            .size(16.0 * header.title_scale)
                            .color(Color32::WHITE),
                    );
                });
            });

        if header.raised {
            let rect = response.response.rect;
            let shadow = egui::Rect::from_min_max(
                egui::pos2(rect.left(), rect.bottom()),
                egui::pos2(rect.right(), rect.bottom() + 6.0),
            );
            ctx.layer_painter(egui::LayerId::new(egui::Order::Middle, egui::Id::new("header-shadow")))
                .rect_filled(shadow, 0.0, self.theme.header_shadow);
        }
    }

    fn render_feed(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let failure = match &self.bootstrap {
                Bootstrap::Ready => None,
                Bootstrap::Loading => {
                    ui.centered_and_justified(|ui| ui.spinner());
                    return;
                }
                Bootstrap::Failed(err) => Some(err.to_string()),
            };

            let Some(message) = failure else {
                self.render_stories(ui);
                return;
            };

            let mut retry = false;
            ui.vertical_centered(|ui| {
                ui.add_space(40.0);
                ui.label(RichText::new(message).color(self.theme.error));
                ui.add_space(8.0);
                retry = ui.button("Retry").clicked();
            });
            if retry {
                self.bootstrap = Bootstrap::Loading;
                self.fetcher.fetch_top_ids();
            }
        });
    }

    fn render_stories(&mut self, ui: &mut Ui) {
        let ctx = ui.ctx().clone();
        let screen = ctx.screen_rect();
        let now = Utc::now();
        let mut badges = HashMap::new();
        let mut action = None;

        let output = ScrollArea::vertical()
            .id_salt("feed")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for (id, slot) in self.coordinator.loader().slots() {
                    let key = SlotKey::Story(id);
                    let style = self.styles.get(&key).copied().unwrap_or_default();
                    let (badge, card_action) = story_card(ui, &self.theme, id, slot, style, now);
                    badges.insert(key, badge);
                    if card_action.is_some() {
                        action = card_action;
                    }
                }
                if self.coordinator.loader().is_exhausted() {
                    ui.add_space(16.0);
                    ui.vertical_centered(|ui| {
                        ui.label(RichText::new("That's all for now").color(self.theme.secondary_text));
                    });
                }
                ui.add_space(16.0);
            });

        self.geometry = FrameGeometry {
            band: DocumentBand {
                top: screen.top(),
                bottom: screen.bottom(),
            },
            container_height: output.inner_rect.height(),
            badges,
        };

        let scroll_top = output.state.offset.y;
        if self.last_scroll_top != Some(scroll_top) {
            self.last_scroll_top = Some(scroll_top);
            let metrics = ScrollMetrics {
                scroll_top,
                scroll_height: output.content_size.y,
                viewport_height: output.inner_rect.height(),
            };
            let outcome = self.coordinator.on_scroll(
                metrics,
                &self.geometry,
                &mut self.styles,
                &mut self.fetcher,
            );
            if outcome.styled > 0 {
                ctx.request_repaint();
            }
        }

        match action {
            Some(CardAction::Open(item)) => self.open_story(&item, &ctx),
            Some(CardAction::Retry(id)) => {
                self.coordinator.loader_mut().retry(id, &mut self.fetcher);
            }
            Some(CardAction::Visit(url)) => open_link(&url),
            None => {}
        }
    }

    fn render_panel(&mut self, ctx: &egui::Context) {
        if self.animator.phase() == Phase::Closed {
            return;
        }
        let Some(item) = &self.panel.item else {
            return;
        };

        let screen = ctx.screen_rect();
        let now = Utc::now();
        let opacity = self.panel.opacity.clamp(0.0, 1.0);
        let mut close = false;
        let mut visit = None;

        egui::Area::new(egui::Id::new("story-details"))
            .order(egui::Order::Foreground)
            .constrain(false)
            .fixed_pos(egui::pos2(screen.left() + self.panel.offset, screen.top()))
            .show(ctx, |ui| {
                egui::Frame::new()
                    .fill(self.theme.panel_background.gamma_multiply(opacity))
                    .inner_margin(16.0)
                    .show(ui, |ui| {
                        ui.set_min_size(screen.size() - egui::vec2(32.0, 32.0));
                        ui.set_max_width(screen.width() - 32.0);

                        ui.horizontal(|ui| {
                            ui.heading(RichText::new(&item.title).color(self.theme.highlight));
                            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                                close = ui.button("✕").clicked();
                            });
                        });
                        ui.label(
                            RichText::new(format!(
                                "{} points by {} {}",
                                item.score,
                                item.submitter,
                                time_ago(item.submitted_at, now)
                            ))
                            .color(self.theme.secondary_text),
                        );
                        if let (Some(url), Some(host)) = (&item.url, item.host()) {
                            if ui.link(host).clicked() {
                                visit = Some(url.clone());
                            }
                        }
                        ui.separator();

                        ScrollArea::vertical()
                            .id_salt("story-details-comments")
                            .auto_shrink([false, false])
                            .show(ui, |ui| {
                                if self.comments.is_empty() {
                                    ui.label(RichText::new("No comments yet").color(self.theme.secondary_text));
                                }
                                for (_, slot) in self.comments.slots() {
                                    comment_card(ui, &self.theme, slot, now);
                                }
                            });
                    });
            });

        if let Some(url) = visit {
            open_link(&url);
        }
        if close {
            self.animator.close(&mut RepaintScheduler(ctx));
        }
    }
}

impl eframe::App for FeedApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();
        self.step_panel(ctx);

        self.render_header(ctx);
        self.render_feed(ctx);
        self.render_panel(ctx);
    }
}

fn open_link(url: &str) {
    if let Err(e) = open::that(url) {
        error!(url, error = %e, "failed to open link");
    }
}

/// Paints one story row and returns the badge rect plus any action taken.
fn story_card(
    ui: &mut Ui,
    theme: &AppTheme,
    id: ItemId,
    slot: &Slot<Item>,
    style: ItemStyle,
    now: DateTime<Utc>,
) -> (crate::feed::Rect, Option<CardAction>) {
    let mut action = None;

    // The card sense is registered first so the link and Retry button stay on top of it.
    let card = ui.scope_builder(egui::UiBuilder::new().sense(Sense::click()), |ui| {
        ui.style_mut().interaction.selectable_labels = false;
        egui::Frame::new()
            .fill(theme.card_background)
            .corner_radius(CornerRadius::same(8))
            .stroke(Stroke::new(1.0, theme.separator))
            .inner_margin(12.0)
            .outer_margin(egui::vec2(8.0, 4.0))
            .show(ui, |ui| {
                ui.set_width(ui.available_width());
                ui.horizontal(|ui| {
                    // The cell keeps its full size so rows don't move as badges shrink.
                    let (cell, _) = ui.allocate_exact_size(egui::vec2(BADGE_SIZE, BADGE_SIZE), Sense::hover());
                    let size = style.badge_size().max(0.0);
                    let badge = egui::Rect::from_center_size(cell.center(), egui::vec2(size, size));
                    let score = match slot {
                        Slot::Ready(item) => item.score.to_string(),
                        _ => "-".to_string(),
                    };
                    ui.painter().circle_filled(badge.center(), size / 2.0, theme.badge_color(&style));
                    ui.painter().text(
                        badge.center(),
                        Align2::CENTER_CENTER,
                        score,
                        FontId::proportional((14.0 * style.scale).max(1.0)),
                        Color32::BLACK,
                    );
                    ui.add_space(12.0);

                    ui.vertical(|ui| match slot {
                        Slot::Loading => {
                            ui.label(RichText::new("...").size(16.0).color(theme.title_color(&style)));
                            ui.label(RichText::new("by ...").color(theme.secondary_text));
                        }
                        Slot::Ready(item) => {
                            ui.horizontal_wrapped(|ui| {
                                ui.label(
                                    RichText::new(&item.title)
                                        .size(16.0)
                                        .strong()
                                        .color(theme.title_color(&style)),
                                );
                                if let (Some(url), Some(host)) = (&item.url, item.host()) {
                                    if ui.link(RichText::new(format!("({})", host)).italics()).clicked() {
                                        action = Some(CardAction::Visit(url.clone()));
                                    }
                                }
                            });
                            ui.label(
                                RichText::new(format!(
                                    "by {} {} · {} comments",
                                    item.submitter,
                                    time_ago(item.submitted_at, now),
                                    item.descendants
                                ))
                                .color(theme.secondary_text),
                            );
                        }
                        Slot::Failed(err) => {
                            ui.label(RichText::new(err.summary()).color(theme.error));
                            if ui.small_button("Retry").clicked() {
                                action = Some(CardAction::Retry(id));
                            }
                        }
                    });

                    badge
                })
                .inner
            })
            .inner
    });

    if card.response.clicked() && action.is_none() {
        if let Slot::Ready(item) = slot {
            action = Some(CardAction::Open(item.clone()));
        }
    }

    let badge = card.inner;
    let rect = crate::feed::Rect::new(badge.left(), badge.top(), badge.width(), badge.height());
    (rect, action)
}

fn comment_card(ui: &mut Ui, theme: &AppTheme, slot: &Slot<Comment>, now: DateTime<Utc>) {
    egui::Frame::new()
        .fill(theme.card_background)
        .corner_radius(CornerRadius::same(6))
        .stroke(Stroke::new(1.0, theme.separator))
        .inner_margin(10.0)
        .outer_margin(egui::vec2(0.0, 4.0))
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            match slot {
                Slot::Loading => {
                    ui.label(RichText::new("Loading comment...").italics().color(theme.secondary_text));
                }
                Slot::Ready(comment) => {
                    ui.label(
                        RichText::new(format!("{} {}", comment.author, time_ago(comment.submitted_at, now)))
                            .color(theme.secondary_text),
                    );
                    ui.label(comment.plain_text());
                }
                Slot::Failed(err) => {
                    ui.label(RichText::new(format!("Comment unavailable: {}", err.summary())).color(theme.error));
                }
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::{Event, Modifiers, PointerButton, Pos2, RawInput};

    fn story(id: ItemId, url: Option<&str>) -> Item {
        Item {
            id,
            title: "Show HN: a tiny feed".to_string(),
            score: 42,
            submitter: "pg".to_string(),
            submitted_at: Utc::now(),
            url: url.map(str::to_string),
            child_ids: Vec::new(),
            deleted: false,
            dead: false,
            descendants: 0,
        }
    }

    fn input(events: Vec<Event>) -> RawInput {
        RawInput {
            screen_rect: Some(egui::Rect::from_min_size(Pos2::ZERO, egui::vec2(640.0, 240.0))),
            events,
            ..Default::default()
        }
    }

    fn button(pos: Pos2, pressed: bool) -> Event {
        Event::PointerButton {
            pos,
            button: PointerButton::Primary,
            pressed,
            modifiers: Modifiers::default(),
        }
    }

    /// Lays the card out, then presses and releases the pointer at `pos`.
    fn click_card(ctx: &egui::Context, slot: &Slot<Item>, pos: Pos2) -> Option<CardAction> {
        let theme = AppTheme::dark();
        let now = Utc::now();
        let frames = [
            vec![],
            vec![Event::PointerMoved(pos), button(pos, true)],
            vec![button(pos, false)],
        ];

        let mut action = None;
        for events in frames {
            let _ = ctx.run(input(events), |ctx| {
                egui::CentralPanel::default().show(ctx, |ui| {
                    let (_, card_action) = story_card(ui, &theme, 7, slot, ItemStyle::default(), now);
                    if card_action.is_some() {
                        action = card_action;
                    }
                });
            });
        }
        action
    }

    fn sweep(slot: &Slot<Item>) -> Vec<CardAction> {
        let ctx = egui::Context::default();
        let mut actions = Vec::new();
        for y in (0..120).step_by(4) {
            for x in (0..640).step_by(8) {
                if let Some(action) = click_card(&ctx, slot, Pos2::new(x as f32, y as f32)) {
                    actions.push(action);
                }
            }
        }
        actions
    }

    #[test]
    fn failed_card_can_be_retried() {
        let actions = sweep(&Slot::Failed(FetchError::Missing(7)));
        assert!(actions.iter().any(|a| matches!(a, CardAction::Retry(7))), "{:?}", actions);
        assert!(!actions.iter().any(|a| matches!(a, CardAction::Open(_))));
    }

    #[test]
    fn host_link_and_card_body_are_both_clickable() {
        let actions = sweep(&Slot::Ready(story(7, Some("https://www.example.com/post"))));
        assert!(
            actions
                .iter()
                .any(|a| matches!(a, CardAction::Visit(url) if url == "https://www.example.com/post")),
            "{:?}",
            actions
        );
        assert!(actions.iter().any(|a| matches!(a, CardAction::Open(item) if item.id == 7)));
    }

    #[test]
    fn loading_card_ignores_clicks() {
        assert!(sweep(&Slot::Loading).is_empty());
    }
}
