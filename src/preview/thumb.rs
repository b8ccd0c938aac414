// Thumbnail rendering through ffmpeg
//
// Video: one frame at a fixed offset, scaled to a bounded width.
// Audio: a fixed-size waveform picture.
// Both write to a temp name first and rename, so a half-written jpg never
// sits at the cache path.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use crate::constants::{STDERR_TAIL_LINES, TOOL_POLL_INTERVAL_MS};
use crate::error::{ShelfError, Result};
use super::MediaTool;

/// `MediaTool` backed by an ffmpeg executable.
#[derive(Debug, Clone)]
pub struct FfmpegTool {
    binary: PathBuf,
    timeout: Duration,
}

impl FfmpegTool {
    /// Use the resolved ffmpeg (env override, sidecar, PATH).
    pub fn new(timeout: Duration) -> Self {
        Self::with_binary(crate::tools::ffmpeg_path(), timeout)
    }

    pub fn with_binary(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self { binary: binary.into(), timeout }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Run ffmpeg with `args`, writing to a temp file that is renamed onto `output`.
    fn render(&self, args: Vec<std::ffi::OsString>, tmp_path: &Path, output: &Path) -> Result<()> {
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut cmd = Command::new(&self.binary);
        cmd.args(&args).arg(tmp_path);

        if let Err(e) = run_with_timeout(&mut cmd, self.timeout) {
            let _ = std::fs::remove_file(tmp_path);
            return Err(e);
        }

        std::fs::rename(tmp_path, output)?;

        let size = std::fs::metadata(output).map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            let _ = std::fs::remove_file(output);
            return Err(ShelfError::PreviewFailed(format!(
                "ffmpeg produced an empty file for {}",
                output.display()
            )));
        }

        Ok(())
    }
}

impl MediaTool for FfmpegTool {
    fn extract_frame(&self, source: &Path, output: &Path, offset_secs: f64, max_width: u32) -> Result<()> {
        let tmp_path = output.with_extension("tmp.jpg");
        let seek_time = format_duration(offset_secs);
        let scale_filter = format!("scale={}:-1", max_width);

        // Seek before input; a clip shorter than the offset is left to ffmpeg's clamping
        let args = vec![
            "-y".into(),
            "-v".into(), "error".into(),
            "-ss".into(), seek_time.into(),
            "-i".into(), source.as_os_str().to_owned(),
            "-vframes".into(), "1".into(),
            "-vf".into(), scale_filter.into(),
        ];

        self.render(args, &tmp_path, output)
    }

    fn render_waveform(&self, source: &Path, output: &Path, width: u32, height: u32, color: &str) -> Result<()> {
        let tmp_path = output.with_extension("tmp.jpg");
        let filter = format!("showwavespic=s={}x{}:colors={}", width, height, color);

        let args = vec![
            "-y".into(),
            "-v".into(), "error".into(),
            "-i".into(), source.as_os_str().to_owned(),
            "-filter_complex".into(), filter.into(),
            "-frames:v".into(), "1".into(),
        ];

        self.render(args, &tmp_path, output)
    }
}

/// Spawn `cmd`, wait up to `timeout`, kill it if it overruns.
/// Non-zero exit, spawn failure and timeout all come back as `PreviewFailed`.
/// stderr is drained on its own thread so a chatty child never blocks on the pipe.
pub fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> Result<()> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ShelfError::PreviewFailed(format!("could not launch {:?}: {}", cmd.get_program(), e)))?;

    let stderr_reader = child.stderr.take().map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    });

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait()? {
            Some(status) => break status,
            None if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ShelfError::PreviewFailed(format!(
                    "{:?} timed out after {:?}",
                    cmd.get_program(),
                    timeout
                )));
            }
            None => std::thread::sleep(Duration::from_millis(TOOL_POLL_INTERVAL_MS)),
        }
    };

    if !status.success() {
        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .map(|buf| stderr_tail(&buf))
            .unwrap_or_default();
        return Err(ShelfError::PreviewFailed(format!(
            "{:?} exited with {}: {}",
            cmd.get_program(),
            status,
            stderr
        )));
    }

    Ok(())
}

/// Last few lines of a tool's stderr, enough to explain a failure.
fn stderr_tail(buf: &[u8]) -> String {
    let text = String::from_utf8_lossy(buf);
    let lines: Vec<&str> = text.trim().lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

/// Format seconds as HH:MM:SS.mmm for ffmpeg.
fn format_duration(seconds: f64) -> String {
    let hours = (seconds / 3600.0) as u32;
    let minutes = ((seconds % 3600.0) / 60.0) as u32;
    let secs = seconds % 60.0;
    format!("{:02}:{:02}:{:06.3}", hours, minutes, secs)
}
