//! Background jobs
//!
//! Format listing and the download + reversal pipeline run on a worker thread.
//! The worker reports through a crossbeam channel that the UI drains every
//! frame; after each send it wakes the UI through the `notify` callback.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use rp_common::{FormatOption, Stage, ToolPaths};
use rp_download::{validate_url, VideoSource};
use rp_encoder::{ProcessRunner, Reverser};
use tracing::{error, info};

/// Messages from the worker to the UI thread.
#[derive(Clone, Debug, PartialEq)]
pub enum JobEvent {
    Formats(Vec<FormatOption>),
    Progress(Stage, f32),
    Status(String),
    Ready { path: PathBuf, fps: u32 },
    Failed(String),
}

/// Wakes the UI after the worker sent an event.
pub type Notify = Arc<dyn Fn() + Send + Sync>;

/// External tools a job drives.
#[derive(Clone)]
pub struct Pipeline {
    pub source: Arc<dyn VideoSource>,
    pub runner: Arc<dyn ProcessRunner>,
    pub tools: ToolPaths,
}

/// Everything the generate job needs, captured when the button is pressed.
#[derive(Clone, Debug)]
pub struct GenerateRequest {
    pub url: String,
    pub format_id: String,
    pub original: PathBuf,
    pub output: PathBuf,
    pub fps: u32,
}

/// A running worker. The app holds at most one.
pub struct JobHandle {
    rx: Receiver<JobEvent>,
    thread: Option<JoinHandle<()>>,
}

impl JobHandle {
    /// Events sent since the last call.
    pub fn drain(&self) -> Vec<JobEvent> {
        self.rx.try_iter().collect()
    }

    /// The worker has returned. Events it sent may still be queued.
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    #[cfg(test)]
    pub fn wait(mut self) -> Vec<JobEvent> {
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        self.drain()
    }
}

fn spawn(name: &str, notify: Notify, work: impl FnOnce(&mut dyn FnMut(JobEvent)) + Send + 'static) -> JobHandle {
    let (tx, rx) = channel::unbounded::<JobEvent>();
    let name = name.to_string();

    let thread = thread::Builder::new().name(name.clone()).spawn(move || {
        let mut emit = |event: JobEvent| send(&tx, &notify, event);
        work(&mut emit);
    });

    match thread {
        Ok(thread) => JobHandle {
            rx,
            thread: Some(thread),
        },
        Err(e) => {
            error!("Failed to start {} worker: {}", name, e);
            let (tx, rx) = channel::bounded(1);
            let _ = tx.send(JobEvent::Failed(format!("Could not start worker: {}", e)));
            JobHandle { rx, thread: None }
        }
    }
}

fn send(tx: &Sender<JobEvent>, notify: &Notify, event: JobEvent) {
    if tx.send(event).is_ok() {
        notify();
    }
}

/// List the renditions of `url` in the background.
pub fn spawn_fetch(pipeline: Pipeline, url: String, notify: Notify) -> JobHandle {
    spawn("rp-formats", notify, move |emit| fetch_formats(pipeline.source.as_ref(), &url, emit))
}

/// Download and reverse in the background.
pub fn spawn_generate(pipeline: Pipeline, request: GenerateRequest, notify: Notify) -> JobHandle {
    spawn("rp-generate", notify, move |emit| run_generate(&pipeline, &request, emit))
}

pub fn fetch_formats(source: &dyn VideoSource, url: &str, emit: &mut dyn FnMut(JobEvent)) {
    let result = validate_url(url).and_then(|()| source.list_formats(url.trim()));
    match result {
        Ok(formats) => {
            info!("{} resolutions available", formats.len());
            emit(JobEvent::Formats(formats));
            emit(JobEvent::Status("Format info loaded.".to_string()));
        }
        Err(e) => {
            error!("Format listing failed: {}", e);
            emit(JobEvent::Failed(format!("Error loading formats: {}", e)));
        }
    }
}

/// Download, then reverse in two steps. Stops at the first failure.
pub fn run_generate(pipeline: &Pipeline, request: &GenerateRequest, emit: &mut dyn FnMut(JobEvent)) {
    emit(JobEvent::Progress(Stage::Downloading, 0.0));
    let downloaded = pipeline.source.download(
        request.url.trim(),
        &request.format_id,
        &request.original,
        &mut |pct| emit(JobEvent::Progress(Stage::Downloading, pct)),
    );
    if let Err(e) = downloaded {
        error!("Download failed: {}", e);
        emit(JobEvent::Failed(format!("Download error: {}", e)));
        return;
    }

    emit(JobEvent::Status("Download done. Now reversing in two steps...".to_string()));
    emit(JobEvent::Progress(Stage::Reversing(1), 0.0));

    let reverser = Reverser::new(pipeline.runner.clone(), pipeline.tools.clone());
    let reversed = reverser.reverse(&request.original, &request.output, request.fps, &mut |p| {
        emit(JobEvent::Progress(Stage::Reversing(p.step), p.percent))
    });
    if let Err(e) = reversed {
        error!("Reversal failed: {}", e);
        emit(JobEvent::Failed(format!("Reverse/fps error: {}", e)));
        return;
    }

    emit(JobEvent::Progress(Stage::Done, 100.0));
    emit(JobEvent::Ready {
        path: request.output.clone(),
        fps: request.fps,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use rp_common::ProgressState;
    use rp_download::DownloadError;
    use rp_encoder::ProcessOutput;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted yt-dlp stand-in.
    struct MockSource {
        formats: Vec<FormatOption>,
        progress: Vec<f32>,
        fail_download: bool,
        downloads: Mutex<Vec<(String, String, PathBuf)>>,
    }

    impl MockSource {
        fn new(progress: Vec<f32>) -> Self {
            Self {
                formats: vec![
                    FormatOption::new(360, "18"),
                    FormatOption::new(720, "22"),
                    FormatOption::new(1080, "137"),
                ],
                progress,
                fail_download: false,
                downloads: Mutex::new(Vec::new()),
            }
        }
    }

    impl VideoSource for MockSource {
        fn list_formats(&self, _url: &str) -> Result<Vec<FormatOption>, DownloadError> {
            Ok(self.formats.clone())
        }

        fn download(
            &self,
            url: &str,
            format_id: &str,
            dest: &Path,
            on_progress: &mut dyn FnMut(f32),
        ) -> Result<(), DownloadError> {
            self.downloads
                .lock()
                .push((url.to_string(), format_id.to_string(), dest.to_path_buf()));
            if self.fail_download {
                return Err(DownloadError::Failed("HTTP Error 403: Forbidden".to_string()));
            }
            for pct in &self.progress {
                on_progress(*pct);
            }
            Ok(())
        }
    }

    /// ffprobe/ffmpeg stand-in that always succeeds, or fails ffmpeg calls.
    struct MockRunner {
        fail_ffmpeg: bool,
        programs: Mutex<Vec<String>>,
    }

    impl ProcessRunner for MockRunner {
        fn run(
            &self,
            program: &Path,
            _args: &[String],
            on_stderr: &mut dyn FnMut(&str),
        ) -> std::io::Result<ProcessOutput> {
            let program = program.to_string_lossy().to_string();
            self.programs.lock().push(program.clone());
            if program == "ffprobe" {
                return Ok(ProcessOutput {
                    success: true,
                    code: Some(0),
                    stdout: r#"{"streams":[{"width":2,"height":2,"r_frame_rate":"10/1"}],"format":{"duration":"4.0"}}"#
                        .to_string(),
                    ..Default::default()
                });
            }
            on_stderr("frame=   5 fps=0.0 q=-1.0 size=0kB time=00:00:02.00 bitrate=N/A");
            Ok(ProcessOutput {
                success: !self.fail_ffmpeg,
                code: Some(if self.fail_ffmpeg { 1 } else { 0 }),
                stderr_tail: if self.fail_ffmpeg { "Invalid data found".to_string() } else { String::new() },
                ..Default::default()
            })
        }
    }

    fn tools() -> ToolPaths {
        ToolPaths {
            yt_dlp: PathBuf::from("yt-dlp"),
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }

    fn pipeline(source: MockSource, fail_ffmpeg: bool) -> (Pipeline, Arc<MockRunner>) {
        let runner = Arc::new(MockRunner {
            fail_ffmpeg,
            programs: Mutex::new(Vec::new()),
        });
        let pipeline = Pipeline {
            source: Arc::new(source),
            runner: runner.clone(),
            tools: tools(),
        };
        (pipeline, runner)
    }

    fn request(dir: &Path) -> GenerateRequest {
        GenerateRequest {
            url: " https://www.youtube.com/watch?v=abc ".to_string(),
            format_id: "22".to_string(),
            original: dir.join("original.mp4"),
            output: dir.join("reversed_final.mp4"),
            fps: 12,
        }
    }

    fn collect(f: impl FnOnce(&mut dyn FnMut(JobEvent))) -> Vec<JobEvent> {
        let mut events = Vec::new();
        f(&mut |e| events.push(e));
        events
    }

    #[test]
    fn download_progress_reaches_progress_state_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let steps: Vec<f32> = (0..=20).map(|i| i as f32 * 5.0).collect();
        let (pipeline, _) = pipeline(MockSource::new(steps.clone()), false);

        let events = collect(|emit| run_generate(&pipeline, &request(dir.path()), emit));

        let mut state = ProgressState::new();
        let mut observed = Vec::new();
        for event in &events {
            if let JobEvent::Progress(Stage::Downloading, pct) = event {
                state.set(*pct, Stage::Downloading.label());
                observed.push(state.percent());
            }
        }

        // Leading 0 from the job start, then the source's stream unchanged.
        assert_eq!(observed[0], 0.0);
        assert_eq!(&observed[1..], steps.as_slice());
        assert!(observed.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(state.label(), "Downloading... (100.0%)");
    }

    #[test]
    fn generate_downloads_then_reverses_then_reports_ready() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, runner) = pipeline(MockSource::new(vec![50.0, 100.0]), false);
        let req = request(dir.path());

        let events = collect(|emit| run_generate(&pipeline, &req, emit));

        assert!(events.contains(&JobEvent::Progress(Stage::Reversing(1), 50.0)));
        assert!(events.contains(&JobEvent::Progress(Stage::Reversing(2), 0.0)));
        assert_eq!(
            events.last().unwrap(),
            &JobEvent::Ready {
                path: req.output.clone(),
                fps: 12
            }
        );
        assert_eq!(
            runner.programs.lock().clone(),
            vec!["ffprobe", "ffmpeg", "ffprobe", "ffmpeg"]
        );
    }

    #[test]
    fn download_failure_stops_before_ffmpeg() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = MockSource::new(vec![]);
        source.fail_download = true;
        let (pipeline, runner) = pipeline(source, false);

        let events = collect(|emit| run_generate(&pipeline, &request(dir.path()), emit));

        match events.last().unwrap() {
            JobEvent::Failed(msg) => assert!(msg.starts_with("Download error:"), "{msg}"),
            other => panic!("unexpected last event {other:?}"),
        }
        assert!(runner.programs.lock().is_empty());
    }

    #[test]
    fn reversal_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, _) = pipeline(MockSource::new(vec![100.0]), true);

        let events = collect(|emit| run_generate(&pipeline, &request(dir.path()), emit));

        assert!(!events.iter().any(|e| matches!(e, JobEvent::Ready { .. })));
        match events.last().unwrap() {
            JobEvent::Failed(msg) => {
                assert!(msg.starts_with("Reverse/fps error:"), "{msg}");
                assert!(msg.contains("Invalid data found"), "{msg}");
            }
            other => panic!("unexpected last event {other:?}"),
        }
    }

    #[test]
    fn fetch_rejects_non_http_urls() {
        let source = MockSource::new(vec![]);
        let events = collect(|emit| fetch_formats(&source, "ftp://example.com/v", emit));
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], JobEvent::Failed(msg) if msg.contains("http")));
    }

    #[test]
    fn spawned_fetch_delivers_formats_and_wakes_ui() {
        let (pipeline, _) = pipeline(MockSource::new(vec![]), false);
        let wakeups = Arc::new(AtomicUsize::new(0));
        let counter = wakeups.clone();
        let notify: Notify = Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let handle = spawn_fetch(pipeline, "https://youtu.be/abc".to_string(), notify);
        let events = handle.wait();

        match &events[0] {
            JobEvent::Formats(formats) => {
                let heights: Vec<u32> = formats.iter().map(|f| f.height).collect();
                assert_eq!(heights, vec![360, 720, 1080]);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(wakeups.load(Ordering::SeqCst), events.len());
    }

    #[test]
    fn spawned_generate_records_download_target() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(MockSource::new(vec![100.0]));
        let pipeline = Pipeline {
            source: source.clone(),
            runner: Arc::new(MockRunner {
                fail_ffmpeg: false,
                programs: Mutex::new(Vec::new()),
            }),
            tools: tools(),
        };
        let req = request(dir.path());

        let handle = spawn_generate(pipeline, req.clone(), Arc::new(|| {}));
        let events = handle.wait();

        assert!(matches!(events.last(), Some(JobEvent::Ready { .. })));
        let downloads = source.downloads.lock().clone();
        assert_eq!(
            downloads,
            vec![(
                "https://www.youtube.com/watch?v=abc".to_string(),
                "22".to_string(),
                req.original.clone()
            )]
        );
    }
}
