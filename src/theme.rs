use egui::{Color32, Stroke};

use crate::feed::stylist::{BADGE_HUE, BADGE_LIGHTNESS};
use crate::feed::ItemStyle;

pub struct AppTheme {
    pub background: Color32,
    pub card_background: Color32,
    pub header_background: Color32,
    pub header_shadow: Color32,
    pub panel_background: Color32,
    pub text: Color32,
    pub secondary_text: Color32,
    pub highlight: Color32,
    pub separator: Color32,
    pub error: Color32,
}

impl AppTheme {
    pub fn dark() -> Self {
        Self {
            background: Color32::from_rgb(18, 18, 18),
            card_background: Color32::from_rgb(30, 30, 30),
            header_background: Color32::from_rgb(255, 102, 0), // HN orange
            header_shadow: Color32::from_black_alpha(140),
            panel_background: Color32::from_rgb(24, 24, 24),
            text: Color32::from_rgb(240, 240, 240),
            secondary_text: Color32::from_rgb(180, 180, 180),
            highlight: Color32::from_rgb(255, 153, 51),
            separator: Color32::from_rgb(60, 60, 60),
            error: Color32::from_rgb(239, 83, 80),
        }
    }

    pub fn apply_to_ctx(&self, ctx: &egui::Context) {
        let mut visuals = egui::Visuals::dark();
        visuals.panel_fill = self.background;
        visuals.window_fill = self.panel_background;
        visuals.override_text_color = Some(self.text);
        visuals.widgets.noninteractive.bg_stroke = Stroke::new(1.0, self.separator);
        ctx.set_visuals(visuals);
    }

    /// Fill of a score badge for the given style.
    pub fn badge_color(&self, style: &ItemStyle) -> Color32 {
        hsl(BADGE_HUE, style.saturation, BADGE_LIGHTNESS)
    }

    /// Title color faded by the style's opacity.
    pub fn title_color(&self, style: &ItemStyle) -> Color32 {
        self.text.gamma_multiply(style.opacity.clamp(0.0, 1.0))
    }
}

/// Converts CSS-style `hsl(h, s%, l%)` to a color. Saturation and lightness
/// are clamped to 0..=100 the way a browser clamps them.
pub fn hsl(hue: f32, saturation: f32, lightness: f32) -> Color32 {
    let s = (saturation / 100.0).clamp(0.0, 1.0);
    let l = (lightness / 100.0).clamp(0.0, 1.0);
    let h = hue.rem_euclid(360.0) / 60.0;

    let chroma = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = chroma * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = l - chroma / 2.0;

    let channel = |v: f32| ((v + m) * 255.0).round() as u8;
    Color32::from_rgb(channel(r), channel(g), channel(b))
}
