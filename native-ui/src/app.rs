use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use eframe::egui;
use rp_common::{clamp_output_fps, ProgressState, Stage, ToolPaths};
use rp_download::VideoSource;
use rp_encoder::SystemRunner;
use rp_player::{FfmpegBackend, MediaBackend, PlaybackState, Transport};
use rp_settings::{Preferences, Session};
use tracing::{error, info, warn};

use crate::job::{spawn_fetch, spawn_generate, GenerateRequest, JobEvent, JobHandle, Notify, Pipeline};
use crate::preview_panel::PreviewPanelState;
use crate::source_panel::{SourceAction, SourcePanelState};
use crate::transport_panel::{TransportAction, TransportPanelState};

const INSTRUCTIONS: &str = "\
The video is reversed in two steps to keep timestamps sane:
1) Reverse the frames and zero the timestamps
2) Re-encode at your chosen FPS

If you pick a lower FPS than the original, the final video is shorter.
If you pick a higher one, it can be longer.
No audio track is kept.

Use the timeline slider and the << Frame / Frame >> buttons to step through it.
Space toggles play/pause, F11 toggles fullscreen.";

/// Everything resolved at startup.
pub struct AppConfig {
    pub prefs_path: PathBuf,
    pub prefs: Preferences,
    pub session: Session,
    pub tools: ToolPaths,
    pub source: Arc<dyn VideoSource>,
}

pub struct ReversePlayerApp {
    prefs_path: PathBuf,
    prefs: Preferences,
    session: Session,
    pipeline: Pipeline,

    pub source_panel: SourcePanelState,
    pub transport_panel: TransportPanelState,
    pub preview: PreviewPanelState,
    transport: Transport,
    progress: ProgressState,
    speed: f32,

    job: Option<JobHandle>,
    error_dialog: Option<String>,
    show_instructions: bool,
    fullscreen: bool,
}

fn make_backend(tools: &ToolPaths) -> Box<dyn MediaBackend> {
    #[cfg(feature = "vlc")]
    {
        match rp_player::VlcBackend::new() {
            Ok(backend) => return Box::new(backend),
            Err(e) => warn!("libvlc unavailable, falling back to ffmpeg playback: {}", e),
        }
    }
    Box::new(FfmpegBackend::new(tools.ffmpeg.clone(), tools.ffprobe.clone()))
}

impl ReversePlayerApp {
    pub fn new(config: AppConfig) -> Self {
        let AppConfig {
            prefs_path,
            prefs,
            session,
            tools,
            source,
        } = config;

        let source_panel = SourcePanelState::new(clamp_output_fps(prefs.output_fps), prefs.keep_reversed_video);
        let transport = Transport::new(make_backend(&tools));

        Self {
            prefs_path,
            prefs,
            session,
            pipeline: Pipeline {
                source,
                runner: Arc::new(SystemRunner),
                tools,
            },
            source_panel,
            transport_panel: TransportPanelState::default(),
            preview: PreviewPanelState::default(),
            transport,
            progress: ProgressState::new(),
            speed: 1.0,
            job: None,
            error_dialog: None,
            show_instructions: false,
            fullscreen: false,
        }
    }

    fn notify(ctx: &egui::Context) -> Notify {
        let ctx = ctx.clone();
        Arc::new(move || ctx.request_repaint())
    }

    fn is_busy(&self) -> bool {
        self.job.is_some()
    }

    fn show_error(&mut self, message: String) {
        error!("{}", message);
        self.progress.log(message.clone());
        self.error_dialog = Some(message);
    }

    // -----------------------------------------------------------------------
    // Source actions
    // -----------------------------------------------------------------------

    fn paste_url(&mut self) {
        let text = arboard::Clipboard::new().and_then(|mut clipboard| clipboard.get_text());
        match text {
            Ok(text) => self.source_panel.url = text.trim().to_string(),
            Err(e) => warn!("Clipboard paste failed: {}", e),
        }
    }

    fn refresh_info(&mut self, ctx: &egui::Context) {
        if self.is_busy() {
            return;
        }
        let url = self.source_panel.url.trim().to_string();
        if url.is_empty() {
            self.progress.log("Please enter a URL first.");
            return;
        }

        self.source_panel.resolutions.clear();
        self.progress.log("Fetching format info...");
        info!("Fetching formats for {}", url);
        self.job = Some(spawn_fetch(self.pipeline.clone(), url, Self::notify(ctx)));
    }

    fn choose_temp_folder(&mut self) {
        if self.is_busy() {
            return;
        }
        let Some(dir) = rfd::FileDialog::new().set_title("Choose Temp Folder").pick_folder() else {
            return;
        };

        match Session::create(Some(&dir)) {
            Ok(session) => {
                self.unload_video();
                let previous = std::mem::replace(&mut self.session, session);
                previous.finish(self.source_panel.keep_reversed);
                self.prefs.temp_folder = Some(dir.clone());
                self.progress.log(format!("Temp folder set to: {}", dir.display()));
            }
            Err(e) => self.show_error(format!("Cannot use {}: {}", dir.display(), e)),
        }
    }

    fn generate(&mut self, ctx: &egui::Context) {
        if self.is_busy() {
            return;
        }
        let url = self.source_panel.url.trim().to_string();
        if url.is_empty() {
            self.progress.log("No URL specified.");
            return;
        }
        let Some(format) = self.source_panel.resolutions.selected().cloned() else {
            self.progress.log("No resolution selected.");
            return;
        };

        self.unload_video();
        if let Err(e) = self.session.prepare() {
            self.show_error(format!("Cannot prepare working folder: {}", e));
            return;
        }

        let request = GenerateRequest {
            url,
            format_id: format.format_id,
            original: self.session.original_path(),
            output: self.session.reversed_path(),
            fps: clamp_output_fps(self.source_panel.output_fps),
        };
        info!(
            "Generating {} at {} fps (format {})",
            request.output.display(),
            request.fps,
            request.format_id
        );

        self.progress.set(0.0, Stage::Downloading.label());
        self.job = Some(spawn_generate(self.pipeline.clone(), request, Self::notify(ctx)));
    }

    fn process_source_actions(&mut self, ctx: &egui::Context) {
        let Some(action) = self.source_panel.action.take() else { return };
        match action {
            SourceAction::PasteUrl => self.paste_url(),
            SourceAction::RefreshInfo => self.refresh_info(ctx),
            SourceAction::ChooseTempFolder => self.choose_temp_folder(),
            SourceAction::Generate => self.generate(ctx),
            SourceAction::ShowInstructions => self.show_instructions = true,
        }
    }

    // -----------------------------------------------------------------------
    // Job events
    // -----------------------------------------------------------------------

    fn poll_job(&mut self) {
        let Some(ref job) = self.job else { return };
        let finished = job.is_finished();
        let events = job.drain();

        for event in events {
            self.handle_job_event(event);
        }
        if finished {
            self.job = None;
        }
    }

    fn handle_job_event(&mut self, event: JobEvent) {
        match event {
            JobEvent::Formats(formats) => self.source_panel.resolutions.set_formats(formats),
            JobEvent::Progress(stage, percent) => self.progress.set(percent, stage.label()),
            JobEvent::Status(text) => {
                info!("{}", text);
                self.progress.log(text);
            }
            JobEvent::Ready { path, fps } => self.load_video(&path, fps),
            JobEvent::Failed(message) => self.show_error(message),
        }
    }

    // -----------------------------------------------------------------------
    // Playback
    // -----------------------------------------------------------------------

    fn load_video(&mut self, path: &Path, fps: u32) {
        if !path.is_file() {
            self.show_error("No reversed file found.".to_string());
            return;
        }
        match self.transport.load(path, fps) {
            Ok(_) => {
                self.transport.set_speed(self.speed);
                self.progress.set(100.0, Stage::Done.label());
                self.progress.log("Reversed video ready. Press Play.");
            }
            Err(e) => self.show_error(format!("Cannot open reversed video: {}", e)),
        }
    }

    fn unload_video(&mut self) {
        self.transport.unload();
        self.preview.clear();
    }

    fn pump_player(&mut self, ctx: &egui::Context) {
        if let Some(frame) = self.transport.poll_frame() {
            self.preview.update_frame(ctx, &frame);
        }

        match self.transport.state() {
            PlaybackState::Playing => ctx.request_repaint(),
            PlaybackState::Idle => {}
            // Pick up the frame decoded after a seek or load.
            _ => ctx.request_repaint_after(Duration::from_millis(30)),
        }
    }

    fn sync_transport_panel(&mut self) {
        let panel = &mut self.transport_panel;
        panel.enabled = self.transport.is_loaded();
        panel.position_ms = self.transport.time_ms();
        panel.length_ms = self.transport.length_ms();
        panel.time_label = self.transport.time_label();
        panel.speed = self.speed;
        panel.speed_label = format!("{:.1}x", self.speed);
        self.preview.external_playback = self.transport.renders_externally();
        self.source_panel.busy = self.job.is_some();
    }

    fn process_transport_actions(&mut self) {
        let Some(action) = self.transport_panel.action.take() else { return };
        match action {
            TransportAction::Play => self.transport.play(),
            TransportAction::Pause => self.transport.pause(),
            TransportAction::Stop => self.transport.stop(),
            TransportAction::PrevFrame => self.transport.prev_frame(),
            TransportAction::NextFrame => self.transport.next_frame(),
            TransportAction::Seek(ms) => self.transport.scrub(ms),
            TransportAction::Speed(rate) => self.speed = self.transport.set_speed(rate),
        }
    }

    fn toggle_fullscreen(&mut self, ctx: &egui::Context) {
        self.fullscreen = !self.fullscreen;
        ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(self.fullscreen));
    }

    fn process_keyboard_shortcuts(&mut self, ctx: &egui::Context) {
        if ctx.input(|i| i.key_pressed(egui::Key::F11)) {
            self.toggle_fullscreen(ctx);
        }
        if self.fullscreen && ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.toggle_fullscreen(ctx);
        }

        // Only handle the rest when no text input is focused
        if ctx.wants_keyboard_input() {
            return;
        }
        if ctx.input(|i| i.key_pressed(egui::Key::Space)) {
            self.transport.toggle_play_pause();
        }
    }

    // -----------------------------------------------------------------------
    // Windows
    // -----------------------------------------------------------------------

    fn show_windows(&mut self, ctx: &egui::Context) {
        if self.show_instructions {
            egui::Window::new("Instructions")
                .collapsible(false)
                .resizable(false)
                .open(&mut self.show_instructions)
                .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
                .show(ctx, |ui| {
                    ui.set_max_width(420.0);
                    ui.label(INSTRUCTIONS);
                });
        }

        if let Some(message) = self.error_dialog.clone() {
            let mut close = false;
            egui::Window::new("Error")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
                .show(ctx, |ui| {
                    ui.set_max_width(420.0);
                    ui.label(message);
                    ui.add_space(8.0);
                    if ui.button("OK").clicked() {
                        close = true;
                    }
                });
            if close {
                self.error_dialog = None;
            }
        }
    }
}

impl eframe::App for ReversePlayerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // 1. Input, worker events, decoded frames
        self.process_keyboard_shortcuts(ctx);
        self.poll_job();
        self.pump_player(ctx);
        self.sync_transport_panel();

        // 2. Menu
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("View", |ui| {
                    if ui.button("Toggle Fullscreen").clicked() {
                        self.toggle_fullscreen(ctx);
                        ui.close_menu();
                    }
                });
            });
        });

        // 3. Source rows and progress
        egui::TopBottomPanel::top("source_panel").show(ctx, |ui| {
            ui.add_space(4.0);
            crate::source_panel::show_source_panel(ui, &mut self.source_panel);
            ui.add_space(4.0);
            ui.label(self.progress.label());
            ui.add(egui::ProgressBar::new(self.progress.fraction()).desired_height(10.0));
            ui.add_space(4.0);
        });

        // 4. Transport rows at the bottom
        egui::TopBottomPanel::bottom("transport_panel").show(ctx, |ui| {
            ui.add_space(4.0);
            crate::transport_panel::show_transport_panel(ui, &mut self.transport_panel);
            ui.add_space(4.0);
        });

        // 5. Video
        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                crate::preview_panel::show_preview_panel(ui, &self.preview);
            });

        self.show_windows(ctx);

        // 6. Actions
        self.process_source_actions(ctx);
        self.process_transport_actions();
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if self.job.is_some() {
            warn!("Exiting while a job is still running");
        }
        self.unload_video();

        let keep = self.source_panel.keep_reversed;
        self.prefs.record_exit(&self.session, keep, self.source_panel.output_fps);
        if let Err(e) = self.prefs.save(&self.prefs_path) {
            error!("Could not save preferences: {}", e);
        }

        self.session.finish(keep);
        info!("Reverse player closed");
    }
}
