mod app;
mod job;
mod preview_panel;
mod source_panel;
mod theme;
mod transport_panel;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use rp_common::ToolPaths;
use rp_download::YtDlp;
use rp_settings::{Preferences, Session};
use tracing_subscriber::EnvFilter;

use app::{AppConfig, ReversePlayerApp};

pub const WINDOW_TITLE: &str = "Reversed Video Player (no audio) - Two Step Approach";

#[derive(Parser, Debug)]
#[command(name = "reverse-player", version, about = "Download a video, reverse it and play it back")]
struct Args {
    /// Preferences file (default: <config dir>/reverse-player/settings.json)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// yt-dlp executable
    #[arg(long)]
    yt_dlp: Option<PathBuf>,

    /// ffmpeg executable
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// ffprobe executable
    #[arg(long, default_value = "ffprobe")]
    ffprobe: PathBuf,
}

fn build_config(args: &Args) -> anyhow::Result<AppConfig> {
    let prefs_path = match args.settings {
        Some(ref path) => path.clone(),
        None => rp_settings::default_path().context("Cannot locate the preferences file")?,
    };
    let prefs = Preferences::load(&prefs_path);

    let session = Session::create(prefs.temp_folder.as_deref())
        .context("Cannot create a working folder")?;

    let ytdlp = YtDlp::locate(args.yt_dlp.as_deref());
    let tools = ToolPaths {
        yt_dlp: ytdlp.program().to_path_buf(),
        ffmpeg: args.ffmpeg.clone(),
        ffprobe: args.ffprobe.clone(),
    };
    tracing::info!(
        "Tools: yt-dlp={} ffmpeg={} ffprobe={}",
        tools.yt_dlp.display(),
        tools.ffmpeg.display(),
        tools.ffprobe.display()
    );

    Ok(AppConfig {
        prefs_path,
        prefs,
        session,
        tools,
        source: Arc::new(ytdlp),
    })
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Reverse player starting...");

    let config = build_config(&args)?;
    let app = ReversePlayerApp::new(config);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(WINDOW_TITLE)
            .with_inner_size([1100.0, 780.0])
            .with_min_inner_size([760.0, 520.0]),
        ..Default::default()
    };

    eframe::run_native(
        WINDOW_TITLE,
        options,
        Box::new(|cc| {
            theme::apply_theme(&cc.egui_ctx);
            Ok(Box::new(app))
        }),
    )
    .map_err(|e| anyhow::anyhow!("UI failed: {e}"))
}
