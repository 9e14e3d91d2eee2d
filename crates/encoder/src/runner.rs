use std::io::{BufReader, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;

use tracing::debug;

/// Number of trailing stderr lines kept in [`ProcessOutput::stderr_tail`].
const STDERR_TAIL: usize = 20;

/// Result of a finished process.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    /// Last few stderr lines, newline separated.
    pub stderr_tail: String,
}

impl ProcessOutput {
    /// Last non-empty stderr line, for short error messages.
    pub fn last_error_line(&self) -> String {
        self.stderr_tail
            .lines()
            .rev()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| match self.code {
                Some(code) => format!("exit code {}", code),
                None => "terminated by signal".to_string(),
            })
    }
}

/// Runs an external program to completion.
pub trait ProcessRunner: Send + Sync {
    /// Run `program` with `args`, calling `on_stderr` for every stderr line.
    ///
    /// Both `\n` and `\r` terminate a line, since ffmpeg redraws its status
    /// line with carriage returns.
    fn run(
        &self,
        program: &Path,
        args: &[String],
        on_stderr: &mut dyn FnMut(&str),
    ) -> std::io::Result<ProcessOutput>;
}

impl<T: ProcessRunner + ?Sized> ProcessRunner for std::sync::Arc<T> {
    fn run(
        &self,
        program: &Path,
        args: &[String],
        on_stderr: &mut dyn FnMut(&str),
    ) -> std::io::Result<ProcessOutput> {
        (**self).run(program, args, on_stderr)
    }
}

/// [`ProcessRunner`] backed by `std::process::Command`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(
        &self,
        program: &Path,
        args: &[String],
        on_stderr: &mut dyn FnMut(&str),
    ) -> std::io::Result<ProcessOutput> {
        debug!("exec: {} {:?}", program.display(), args);

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout_thread = child.stdout.take().map(|mut stdout| {
            thread::spawn(move || {
                let mut buf = String::new();
                let _ = stdout.read_to_string(&mut buf);
                buf
            })
        });

        let mut tail: Vec<String> = Vec::new();
        if let Some(stderr) = child.stderr.take() {
            for_each_line(BufReader::new(stderr), |line| {
                on_stderr(line);
                if tail.len() == STDERR_TAIL {
                    tail.remove(0);
                }
                tail.push(line.to_string());
            })?;
        }

        let status = child.wait()?;
        let stdout = stdout_thread
            .and_then(|t| t.join().ok())
            .unwrap_or_default();

        Ok(ProcessOutput {
            success: status.success(),
            code: status.code(),
            stdout,
            stderr_tail: tail.join("\n"),
        })
    }
}

/// Split a byte stream on `\n` and `\r`, skipping empty lines.
fn for_each_line<R: Read>(mut reader: R, mut f: impl FnMut(&str)) -> std::io::Result<()> {
    let mut pending: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        for &byte in &chunk[..n] {
            if byte == b'\n' || byte == b'\r' {
                if !pending.is_empty() {
                    f(&*String::from_utf8_lossy(&pending));
                    pending.clear();
                }
            } else {
                pending.push(byte);
            }
        }
    }

    if !pending.is_empty() {
        f(&*String::from_utf8_lossy(&pending));
    }
    Ok(())
}
