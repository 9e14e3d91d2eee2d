//! yt-dlp process wrapper
//!
//! Format listing uses `--dump-json`; downloads run with `--newline` so each
//! progress update arrives on its own stdout line.

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use rp_common::FormatOption;
use tracing::{debug, info, warn};

use crate::formats::select_formats;
use crate::progress::{parse_progress_line, ProgressFilter};
use crate::{validate_url, DownloadError, VideoSource};

/// Number of trailing stderr lines kept for error messages.
const STDERR_TAIL: usize = 20;

/// Find yt-dlp executable, checking common install locations
pub fn find_ytdlp() -> Option<PathBuf> {
    if let Ok(output) = Command::new("yt-dlp").arg("--version").output() {
        if output.status.success() {
            return Some(PathBuf::from("yt-dlp"));
        }
    }

    // On Windows, check common Python user install locations
    #[cfg(windows)]
    {
        for var in ["APPDATA", "LOCALAPPDATA"] {
            let Ok(base) = std::env::var(var) else { continue };
            let python_dir = if var == "APPDATA" {
                PathBuf::from(&base).join("Python")
            } else {
                PathBuf::from(&base).join("Programs").join("Python")
            };
            if let Ok(entries) = std::fs::read_dir(python_dir) {
                for entry in entries.flatten() {
                    let exe = entry.path().join("Scripts").join("yt-dlp.exe");
                    if exe.exists() {
                        return Some(exe);
                    }
                }
            }
        }
    }

    None
}

/// Find deno executable for yt-dlp JavaScript runtime
pub fn find_deno() -> Option<PathBuf> {
    if let Ok(output) = Command::new("deno").arg("--version").output() {
        if output.status.success() {
            return Some(PathBuf::from("deno"));
        }
    }
    None
}

/// Build yt-dlp args with deno runtime if available
pub fn get_deno_args() -> Vec<String> {
    match find_deno() {
        Some(deno_path) => vec![
            "--js-runtimes".to_string(),
            format!("deno:{}", deno_path.to_string_lossy()),
        ],
        None => vec![],
    }
}

/// yt-dlp backed [`VideoSource`].
#[derive(Clone, Debug)]
pub struct YtDlp {
    program: PathBuf,
    extra_args: Vec<String>,
}

impl YtDlp {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            extra_args: get_deno_args(),
        }
    }

    /// Use an explicit executable if given, otherwise search for one.
    pub fn locate(explicit: Option<&Path>) -> Self {
        let program = explicit
            .map(Path::to_path_buf)
            .or_else(find_ytdlp)
            .unwrap_or_else(|| PathBuf::from("yt-dlp"));
        Self::new(program)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.extra_args);
        cmd
    }

    /// Arguments for the metadata query.
    pub fn list_args(url: &str) -> Vec<String> {
        vec![
            "--dump-json".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            url.trim().to_string(),
        ]
    }

    /// Arguments for downloading one format to an exact path.
    pub fn download_args(url: &str, format_id: &str, dest: &Path) -> Vec<String> {
        // `-o` is an output template; literal percent signs must be doubled.
        let template = dest.to_string_lossy().replace('%', "%%");
        vec![
            "-f".to_string(),
            format_id.to_string(),
            "-o".to_string(),
            template,
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--newline".to_string(),
            "--progress".to_string(),
            "--force-overwrites".to_string(),
            "--no-part".to_string(),
            url.trim().to_string(),
        ]
    }
}

fn spawn_error(e: std::io::Error) -> DownloadError {
    if e.kind() == std::io::ErrorKind::NotFound {
        DownloadError::YtDlpNotFound
    } else {
        DownloadError::Io(e)
    }
}

fn last_line(text: &str) -> String {
    text.lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("Unknown error")
        .to_string()
}

impl VideoSource for YtDlp {
    fn list_formats(&self, url: &str) -> Result<Vec<FormatOption>, DownloadError> {
        validate_url(url)?;

        let args = Self::list_args(url);
        debug!("yt-dlp args: {:?}", args);

        let output = self
            .command()
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(spawn_error)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("yt-dlp metadata query failed: {}", stderr.trim());
            return Err(DownloadError::Failed(last_line(&stderr)));
        }

        // With --no-playlist a single JSON document is printed; take the first line
        // in case a wrapper prints extra documents.
        let stdout = String::from_utf8_lossy(&output.stdout);
        let json_line = stdout
            .lines()
            .find(|l| l.trim_start().starts_with('{'))
            .unwrap_or("");
        let info: serde_json::Value = serde_json::from_str(json_line)?;

        let formats = select_formats(&info);
        if formats.is_empty() {
            return Err(DownloadError::NoFormats);
        }

        info!("Found {} formats for {}", formats.len(), url.trim());
        Ok(formats)
    }

    fn download(
        &self,
        url: &str,
        format_id: &str,
        dest: &Path,
        on_progress: &mut dyn FnMut(f32),
    ) -> Result<(), DownloadError> {
        validate_url(url)?;

        let args = Self::download_args(url, format_id, dest);
        info!("Downloading: {} (format {}) to {:?}", url.trim(), format_id, dest);
        debug!("yt-dlp args: {:?}", args);

        let mut child = self
            .command()
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        // Drain stderr on its own thread so a chatty process can't block on a full pipe.
        let stderr_thread = child.stderr.take().map(|stderr| {
            thread::spawn(move || {
                let mut tail: Vec<String> = Vec::new();
                for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                    if tail.len() == STDERR_TAIL {
                        tail.remove(0);
                    }
                    tail.push(line);
                }
                tail.join("\n")
            })
        });

        let mut filter = ProgressFilter::new();
        if let Some(stdout) = child.stdout.take() {
            for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                if let Some(pct) = parse_progress_line(&line) {
                    if let Some(pct) = filter.accept(pct) {
                        on_progress(pct);
                    }
                } else if line.contains("Destination") || line.contains("Merging") {
                    info!("[yt-dlp] {}", line);
                } else if !line.is_empty() && !line.starts_with('[') {
                    debug!("[yt-dlp] {}", line);
                }
            }
        }

        let status = child.wait()?;
        let stderr = stderr_thread
            .and_then(|t| t.join().ok())
            .unwrap_or_default();

        if !status.success() {
            warn!("yt-dlp failed ({}): {}", status, stderr);
            return Err(DownloadError::Failed(last_line(&stderr)));
        }

        if !dest.exists() {
            return Err(DownloadError::Failed(format!(
                "yt-dlp did not produce {}",
                dest.display()
            )));
        }

        if let Some(pct) = filter.finish() {
            on_progress(pct);
        }
        info!("Download complete: {}", dest.display());
        Ok(())
    }
}
