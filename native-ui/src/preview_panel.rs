use egui::{self, Color32, FontId, Pos2, Rect, Vec2};
use rp_player::VideoFrame;
use tracing::warn;

/// GPU texture holding the most recent video frame.
#[derive(Default)]
pub struct PreviewPanelState {
    texture: Option<egui::TextureHandle>,
    size: [usize; 2],
    /// The loaded video plays in the backend's own window.
    pub external_playback: bool,
}

impl PreviewPanelState {
    /// Upload `frame`, reusing the texture while the size is unchanged.
    pub fn update_frame(&mut self, ctx: &egui::Context, frame: &VideoFrame) {
        let size = [frame.width as usize, frame.height as usize];
        if frame.rgba.len() != size[0] * size[1] * 4 {
            warn!(
                "Dropping frame with {} bytes for {}x{}",
                frame.rgba.len(),
                size[0],
                size[1]
            );
            return;
        }

        let image = egui::ColorImage::from_rgba_unmultiplied(size, &frame.rgba);
        match self.texture {
            Some(ref mut texture) if self.size == size => {
                texture.set(image, egui::TextureOptions::LINEAR);
            }
            _ => {
                self.texture = Some(ctx.load_texture("video-frame", image, egui::TextureOptions::LINEAR));
                self.size = size;
            }
        }
    }

    pub fn clear(&mut self) {
        self.texture = None;
        self.size = [0, 0];
    }

    /// Text shown in the video area while no frame is displayed.
    pub fn placeholder(&self) -> &'static str {
        if self.external_playback {
            "Playback runs in the libvlc video window"
        } else {
            "No video loaded"
        }
    }
}

/// Largest rect with the video's aspect ratio centred in `area`.
pub fn fit_rect(area: Rect, width: usize, height: usize) -> Rect {
    if width == 0 || height == 0 || area.width() <= 0.0 || area.height() <= 0.0 {
        return area;
    }
    let scale = (area.width() / width as f32).min(area.height() / height as f32);
    let size = Vec2::new(width as f32 * scale, height as f32 * scale);
    Rect::from_center_size(area.center(), size)
}

const BG_COLOR: Color32 = Color32::from_rgb(0x0a, 0x0a, 0x0a);
const PLACEHOLDER_COLOR: Color32 = Color32::from_rgb(0x55, 0x55, 0x55);

pub fn show_preview_panel(ui: &mut egui::Ui, state: &PreviewPanelState) {
    let area = ui.available_rect_before_wrap();
    ui.allocate_rect(area, egui::Sense::hover());
    let painter = ui.painter_at(area);
    painter.rect_filled(area, 0.0, BG_COLOR);

    match state.texture {
        Some(ref texture) => {
            let rect = fit_rect(area, state.size[0], state.size[1]);
            let uv = Rect::from_min_max(Pos2::new(0.0, 0.0), Pos2::new(1.0, 1.0));
            painter.image(texture.id(), rect, uv, Color32::WHITE);
        }
        None => {
            painter.text(
                area.center(),
                egui::Align2::CENTER_CENTER,
                state.placeholder(),
                FontId::proportional(16.0),
                PLACEHOLDER_COLOR,
            );
        }
    }
}
