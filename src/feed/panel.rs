//! Slide-in story panel.
//!
//! The panel rests off-screen to the right. Opening eases its horizontal
//! offset toward 0, closing eases it back past the container edge. Each tick
//! moves a tenth of the remaining distance, and the loop ends once the panel
//! is within half a unit of its target.

use tracing::{debug, info};

use crate::models::Item;

pub const EASING: f32 = 0.1;
pub const CONVERGENCE_EPSILON: f32 = 0.5;
/// Extra distance past the container edge where a closed panel rests.
pub const OFFSCREEN_MARGIN: f32 = 100.0;

/// Requests one more animation frame.
pub trait FrameScheduler {
    fn schedule_tick(&mut self);
}

/// Write access to the panel being animated.
pub trait PanelSurface {
    fn render_content(&mut self, item: &Item);
    fn set_opacity(&mut self, opacity: f32);
    fn set_offset(&mut self, offset: f32);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Closed,
    Opening,
    Open,
    Closing,
}

impl Phase {
    pub fn is_animating(self) -> bool {
        matches!(self, Phase::Opening | Phase::Closing)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelState {
    pub phase: Phase,
    pub offset: f32,
    pub opacity: f32,
}

#[derive(Debug, Clone)]
pub struct PanelAnimator {
    state: PanelState,
    container_width: f32,
    tick_scheduled: bool,
}

impl PanelAnimator {
    pub fn new(container_width: f32) -> Self {
        Self {
            state: PanelState {
                phase: Phase::Closed,
                offset: container_width + OFFSCREEN_MARGIN,
                opacity: 0.0,
            },
            container_width,
            tick_scheduled: false,
        }
    }

    pub fn state(&self) -> PanelState {
        self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn tick_due(&self) -> bool {
        self.tick_scheduled
    }

    /// Resting offset of a closed panel.
    pub fn offscreen_offset(&self) -> f32 {
        self.container_width + OFFSCREEN_MARGIN
    }

    pub fn set_container_width(&mut self, width: f32) {
        if (width - self.container_width).abs() < f32::EPSILON {
            return;
        }
        self.container_width = width;
        if self.state.phase == Phase::Closed {
            self.state.offset = self.offscreen_offset();
        }
    }

    fn target(&self) -> f32 {
        match self.state.phase {
            Phase::Opening | Phase::Open => 0.0,
            Phase::Closing | Phase::Closed => self.offscreen_offset(),
        }
    }

    /// Renders `item` and starts sliding the panel in. Returns `false` when
    /// the panel is already open or opening.
    pub fn open<S, F>(&mut self, item: &Item, surface: &mut S, scheduler: &mut F) -> bool
    where
        S: PanelSurface + ?Sized,
        F: FrameScheduler + ?Sized,
    {
        if matches!(self.state.phase, Phase::Opening | Phase::Open) {
            return false;
        }

        info!(id = item.id, from = self.state.offset, "opening story panel");
        surface.render_content(item);

        self.state.opacity = 1.0;
        surface.set_opacity(1.0);
        self.state.phase = Phase::Opening;
        self.request_tick(scheduler);
        true
    }

    /// Starts sliding the panel out. Closing while the panel is still
    /// opening turns the running loop around instead of starting a second.
    pub fn close<F>(&mut self, scheduler: &mut F) -> bool
    where
        F: FrameScheduler + ?Sized,
    {
        if !matches!(self.state.phase, Phase::Opening | Phase::Open) {
            return false;
        }

        info!(from = self.state.offset, "closing story panel");
        self.state.phase = Phase::Closing;
        self.request_tick(scheduler);
        true
    }

    /// One animation frame. Returns the phase after the step.
    pub fn tick<S, F>(&mut self, surface: &mut S, scheduler: &mut F) -> Phase
    where
        S: PanelSurface + ?Sized,
        F: FrameScheduler + ?Sized,
    {
        self.tick_scheduled = false;
        if !self.state.phase.is_animating() {
            return self.state.phase;
        }

        let target = self.target();
        let mut offset = self.state.offset + (target - self.state.offset) * EASING;

        if (offset - target).abs() <= CONVERGENCE_EPSILON {
            offset = target;
            self.state.phase = match self.state.phase {
                Phase::Opening => Phase::Open,
                _ => Phase::Closed,
            };
            if self.state.phase == Phase::Closed {
                self.state.opacity = 0.0;
                surface.set_opacity(0.0);
            }
            debug!(phase = ?self.state.phase, "panel settled");
        } else {
            self.request_tick(scheduler);
        }

        self.state.offset = offset;
        surface.set_offset(offset);
        self.state.phase
    }

    // One pending tick per loop at most.
    fn request_tick<F>(&mut self, scheduler: &mut F)
    where
        F: FrameScheduler + ?Sized,
    {
        if !self.tick_scheduled {
            self.tick_scheduled = true;
            scheduler.schedule_tick();
        }
    }
}

/// Scheduler driven by hand in tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct VirtualClock {
    pending: usize,
    pub max_pending: usize,
}

#[cfg(test)]
impl VirtualClock {
    /// Consumes one pending tick, if any.
    pub fn advance(&mut self) -> bool {
        if self.pending == 0 {
            return false;
        }
        self.pending -= 1;
        true
    }
}

#[cfg(test)]
impl FrameScheduler for VirtualClock {
    fn schedule_tick(&mut self) {
        self.pending += 1;
        self.max_pending = self.max_pending.max(self.pending);
    }
}
