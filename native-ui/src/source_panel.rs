use egui::{self, Color32, RichText};
use rp_common::{FormatOption, MAX_OUTPUT_FPS, MIN_OUTPUT_FPS};

// ---------------------------------------------------------------------------
// Action enum -- polled by app.rs each frame
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub enum SourceAction {
    PasteUrl,
    RefreshInfo,
    ChooseTempFolder,
    Generate,
    ShowInstructions,
}

// ---------------------------------------------------------------------------
// Resolution selector
// ---------------------------------------------------------------------------

/// Read-only list of fetched renditions with one selected entry.
#[derive(Default)]
pub struct ResolutionSelector {
    options: Vec<FormatOption>,
    selected: Option<usize>,
}

impl ResolutionSelector {
    /// Replace the entries and select the last (highest) one.
    pub fn set_formats(&mut self, formats: Vec<FormatOption>) {
        self.selected = formats.len().checked_sub(1);
        self.options = formats;
    }

    pub fn clear(&mut self) {
        self.options.clear();
        self.selected = None;
    }

    pub fn options(&self) -> &[FormatOption] {
        &self.options
    }

    pub fn selected(&self) -> Option<&FormatOption> {
        self.selected.and_then(|i| self.options.get(i))
    }

    pub fn select(&mut self, index: usize) {
        if index < self.options.len() {
            self.selected = Some(index);
        }
    }

    fn selected_text(&self) -> String {
        self.selected().map(FormatOption::label).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Panel state
// ---------------------------------------------------------------------------

pub struct SourcePanelState {
    pub url: String,
    pub resolutions: ResolutionSelector,
    pub output_fps: u32,
    pub keep_reversed: bool,
    /// A job is running; Refresh and Generate are disabled.
    pub busy: bool,
    pub action: Option<SourceAction>,
}

impl SourcePanelState {
    pub fn new(output_fps: u32, keep_reversed: bool) -> Self {
        Self {
            url: String::new(),
            resolutions: ResolutionSelector::default(),
            output_fps,
            keep_reversed,
            busy: false,
            action: None,
        }
    }
}

const HINT_COLOR: Color32 = Color32::from_rgb(0x88, 0x88, 0x88);

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

pub fn show_source_panel(ui: &mut egui::Ui, state: &mut SourcePanelState) {
    state.action = None;

    // Row 1: URL + clipboard + info + folder
    ui.horizontal(|ui| {
        ui.label("YouTube URL:");
        let edit = egui::TextEdit::singleline(&mut state.url)
            .hint_text(RichText::new("https://www.youtube.com/watch?v=...").color(HINT_COLOR))
            .desired_width(ui.available_width() * 0.5);
        let response = ui.add(edit);
        show_url_context_menu(&response, state);

        if ui.button("Paste").clicked() {
            state.action = Some(SourceAction::PasteUrl);
        }
        if ui
            .add_enabled(!state.busy, egui::Button::new("Refresh Info"))
            .clicked()
        {
            state.action = Some(SourceAction::RefreshInfo);
        }
        if ui
            .add_enabled(!state.busy, egui::Button::new("Choose Temp Folder"))
            .clicked()
        {
            state.action = Some(SourceAction::ChooseTempFolder);
        }
    });

    // Row 2: resolution, fps, keep
    ui.horizontal(|ui| {
        ui.label("Resolution:");
        let mut selected = state.resolutions.selected;
        egui::ComboBox::from_id_salt("resolution")
            .width(180.0)
            .selected_text(state.resolutions.selected_text())
            .show_ui(ui, |ui| {
                for (i, option) in state.resolutions.options().iter().enumerate() {
                    ui.selectable_value(&mut selected, Some(i), option.label());
                }
            });
        if let Some(i) = selected {
            state.resolutions.select(i);
        }

        ui.add_space(12.0);
        ui.label("Output FPS:");
        ui.add(
            egui::Slider::new(&mut state.output_fps, MIN_OUTPUT_FPS..=MAX_OUTPUT_FPS)
                .suffix(" FPS"),
        );

        ui.add_space(12.0);
        ui.checkbox(&mut state.keep_reversed, "Do not delete reversed video");
    });

    // Row 3: generate + instructions
    ui.horizontal(|ui| {
        if ui
            .add_enabled(!state.busy, egui::Button::new("Generate Reversed Video"))
            .clicked()
        {
            state.action = Some(SourceAction::Generate);
        }
        if ui.button("Instructions").clicked() {
            state.action = Some(SourceAction::ShowInstructions);
        }
    });
}

/// Right-click menu on the URL field. Cut and Copy act on the whole text.
fn show_url_context_menu(response: &egui::Response, state: &mut SourcePanelState) {
    response.context_menu(|ui| {
        if ui.button("Cut").clicked() {
            ui.ctx().copy_text(std::mem::take(&mut state.url));
            ui.close_menu();
        }
        if ui.button("Copy").clicked() {
            ui.ctx().copy_text(state.url.clone());
            ui.close_menu();
        }
        if ui.button("Paste").clicked() {
            state.action = Some(SourceAction::PasteUrl);
            ui.close_menu();
        }
        if ui.button("Clear").clicked() {
            state.url.clear();
            ui.close_menu();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetched_formats_fill_selector_and_select_highest() {
        let mut selector = ResolutionSelector::default();
        let formats = vec![
            FormatOption::new(144, "160"),
            FormatOption::new(480, "135"),
            FormatOption::new(720, "136"),
        ];
        selector.set_formats(formats.clone());

        assert_eq!(selector.options(), formats.as_slice());
        assert_eq!(selector.selected(), Some(&formats[2]));
        assert_eq!(selector.selected_text(), "720p (id=136)");
    }

    #[test]
    fn refetch_replaces_entries() {
        let mut selector = ResolutionSelector::default();
        selector.set_formats(vec![FormatOption::new(360, "18"), FormatOption::new(720, "22")]);
        selector.select(0);
        selector.set_formats(vec![FormatOption::new(240, "133")]);

        assert_eq!(selector.options().len(), 1);
        assert_eq!(selector.selected().unwrap().format_id, "133");
    }

    #[test]
    fn empty_list_selects_nothing() {
        let mut selector = ResolutionSelector::default();
        selector.set_formats(Vec::new());
        assert!(selector.selected().is_none());
        assert_eq!(selector.selected_text(), "");
    }

    #[test]
    fn out_of_range_select_is_ignored() {
        let mut selector = ResolutionSelector::default();
        selector.set_formats(vec![FormatOption::new(360, "18")]);
        selector.select(5);
        assert_eq!(selector.selected().unwrap().height, 360);

        selector.clear();
        assert!(selector.options().is_empty());
        assert!(selector.selected().is_none());
    }
}
