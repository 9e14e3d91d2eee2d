use egui::{self, Color32, FontId, RichText};
use rp_common::{MAX_PLAYBACK_RATE, MIN_PLAYBACK_RATE};

#[derive(Clone, Debug, PartialEq)]
pub enum TransportAction {
    Play,
    Pause,
    Stop,
    PrevFrame,
    NextFrame,
    Seek(i64),
    Speed(f32),
}

/// Mirror of the player state, refreshed by app.rs before rendering.
pub struct TransportPanelState {
    pub enabled: bool,
    pub position_ms: i64,
    pub length_ms: i64,
    pub time_label: String,
    pub speed: f32,
    pub speed_label: String,
    pub action: Option<TransportAction>,
}

impl Default for TransportPanelState {
    fn default() -> Self {
        Self {
            enabled: false,
            position_ms: 0,
            length_ms: 0,
            time_label: "0:00 / 0:00".to_string(),
            speed: 1.0,
            speed_label: "1.0x".to_string(),
            action: None,
        }
    }
}

const TIME_COLOR: Color32 = Color32::from_rgb(0xcc, 0xcc, 0xcc);

pub fn show_transport_panel(ui: &mut egui::Ui, state: &mut TransportPanelState) {
    state.action = None;

    // Row 6: buttons, timeline, time
    ui.horizontal(|ui| {
        ui.add_enabled_ui(state.enabled, |ui| {
            if ui.button("Play").clicked() {
                state.action = Some(TransportAction::Play);
            }
            if ui.button("Pause").clicked() {
                state.action = Some(TransportAction::Pause);
            }
            if ui.button("Stop").clicked() {
                state.action = Some(TransportAction::Stop);
            }
            if ui.button("<< Frame").clicked() {
                state.action = Some(TransportAction::PrevFrame);
            }
            if ui.button("Frame >>").clicked() {
                state.action = Some(TransportAction::NextFrame);
            }

            let label_width = 90.0;
            ui.spacing_mut().slider_width = (ui.available_width() - label_width).max(80.0);
            let mut position = state.position_ms as f64;
            let max = state.length_ms.max(1) as f64;
            let response = ui.add(
                egui::Slider::new(&mut position, 0.0..=max)
                    .show_value(false)
                    .trailing_fill(true),
            );
            if response.changed() {
                state.action = Some(TransportAction::Seek(position.round() as i64));
            }
        });

        ui.label(
            RichText::new(&state.time_label)
                .font(FontId::monospace(12.0))
                .color(TIME_COLOR),
        );
    });

    // Row 7: speed
    ui.horizontal(|ui| {
        ui.label("Playback Speed:");
        let label_width = 50.0;
        ui.spacing_mut().slider_width = (ui.available_width() - label_width).max(80.0);
        let mut speed = state.speed;
        let response = ui.add(
            egui::Slider::new(&mut speed, MIN_PLAYBACK_RATE..=MAX_PLAYBACK_RATE)
                .step_by(0.1)
                .show_value(false),
        );
        if response.changed() {
            state.action = Some(TransportAction::Speed(speed));
        }
        ui.label(&state.speed_label);
    });
}
