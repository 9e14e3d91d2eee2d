use egui::{self, Color32, CornerRadius, Stroke};

const BG: Color32 = Color32::from_rgb(0x2b, 0x2b, 0x2b);
const PANEL: Color32 = Color32::from_rgb(0x31, 0x33, 0x35);
const WIDGET: Color32 = Color32::from_rgb(0x3c, 0x3f, 0x41);
const WIDGET_HOVER: Color32 = Color32::from_rgb(0x4b, 0x4f, 0x52);
const ACCENT: Color32 = Color32::from_rgb(0x2a, 0x5a, 0x9e);
const TEXT: Color32 = Color32::from_rgb(0xe0, 0xe0, 0xe0);

/// Dark theme matching the player's black video area.
pub fn apply_theme(ctx: &egui::Context) {
    let mut visuals = egui::Visuals::dark();

    visuals.window_fill = PANEL;
    visuals.panel_fill = BG;
    visuals.extreme_bg_color = Color32::from_rgb(0x1e, 0x1e, 0x1e);
    visuals.selection.bg_fill = ACCENT;
    visuals.override_text_color = Some(TEXT);

    let radius = CornerRadius::same(3);
    visuals.widgets.inactive.bg_fill = WIDGET;
    visuals.widgets.inactive.weak_bg_fill = WIDGET;
    visuals.widgets.inactive.corner_radius = radius;
    visuals.widgets.hovered.bg_fill = WIDGET_HOVER;
    visuals.widgets.hovered.weak_bg_fill = WIDGET_HOVER;
    visuals.widgets.hovered.corner_radius = radius;
    visuals.widgets.active.bg_fill = ACCENT;
    visuals.widgets.active.weak_bg_fill = ACCENT;
    visuals.widgets.active.corner_radius = radius;
    visuals.widgets.noninteractive.bg_stroke = Stroke::new(1.0, WIDGET);

    ctx.set_visuals(visuals);

    let mut style = (*ctx.style()).clone();
    style.spacing.item_spacing = egui::vec2(8.0, 6.0);
    style.spacing.button_padding = egui::vec2(10.0, 4.0);
    ctx.set_style(style);
}
