//! FFmpeg subprocess handling for audio conversion

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;

use super::batch::CancelToken;

/// Result of a file conversion
#[derive(Debug, Clone)]
pub struct ConversionResult {
    /// Path to the converted output file
    pub output_path: PathBuf,
    /// Original input file path
    pub input_path: PathBuf,
    /// Whether conversion was successful
    pub success: bool,
    /// Error message if conversion failed
    pub error: Option<String>,
}

impl ConversionResult {
    fn succeeded(input_path: &Path, output_path: &Path) -> Self {
        Self {
            output_path: output_path.to_path_buf(),
            input_path: input_path.to_path_buf(),
            success: true,
            error: None,
        }
    }

    pub(crate) fn failed(input_path: &Path, output_path: &Path, error: String) -> Self {
        Self {
            output_path: output_path.to_path_buf(),
            input_path: input_path.to_path_buf(),
            success: false,
            error: Some(error),
        }
    }
}

/// Something that can turn one input file into one output file.
///
/// The batch loop only talks to this trait, so tests can swap in a
/// recording fake instead of spawning processes.
pub trait Encoder: Send + Sync {
    fn encode(&self, input_path: &Path, output_path: &Path, cancel: &CancelToken)
        -> ConversionResult;
}

/// Encoder backed by an ffmpeg binary on disk
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    ffmpeg_path: PathBuf,
}

impl FfmpegEncoder {
    pub fn new(ffmpeg_path: PathBuf) -> Self {
        Self { ffmpeg_path }
    }
}

impl Encoder for FfmpegEncoder {
    fn encode(
        &self,
        input_path: &Path,
        output_path: &Path,
        cancel: &CancelToken,
    ) -> ConversionResult {
        convert_file(&self.ffmpeg_path, input_path, output_path, cancel)
    }
}

/// Derive the output file name from an input path.
///
/// Drops the last three characters of the file name and appends `mp3`.
/// This assumes a three character extension: `track01.m4a` becomes
/// `track01.mp3`, but `song.aa` becomes `songmp3`. Names shorter than
/// three characters are replaced entirely.
pub fn output_file_name(input_path: &Path) -> Option<String> {
    let name = input_path.file_name()?.to_string_lossy();
    let keep = name.chars().count().saturating_sub(3);
    let stem: String = name.chars().take(keep).collect();
    Some(format!("{}mp3", stem))
}

/// Full output path for an input file inside the output directory
pub fn output_path_for(input_path: &Path, output_dir: &Path) -> Option<PathBuf> {
    output_file_name(input_path).map(|name| output_dir.join(name))
}

/// Convert a single audio file to MP3 using ffmpeg
///
/// Runs `ffmpeg -y -i <input> <output>` and blocks until the process exits.
/// stdout is captured and thrown away. The exit status decides success and
/// the last stderr line becomes the error message. The wait goes through
/// `cancel` so a cancel can kill the process.
pub fn convert_file(
    ffmpeg_path: &Path,
    input_path: &Path,
    output_path: &Path,
    cancel: &CancelToken,
) -> ConversionResult {
    // -y : overwrite output without asking
    // -i : input file
    log::info!(
        "{} -y -i {} {}",
        ffmpeg_path.display(),
        input_path.display(),
        output_path.display()
    );

    let child = Command::new(ffmpeg_path)
        .arg("-y")
        .arg("-i")
        .arg(input_path)
        .arg(output_path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn();

    let mut child = match child {
        Ok(child) => child,
        Err(e) => {
            let error_msg = format!("Failed to spawn ffmpeg: {}", e);
            log::error!("Conversion error: {}", error_msg);
            return ConversionResult::failed(input_path, output_path, error_msg);
        }
    };

    // Drain both pipes while waiting so a chatty ffmpeg never blocks on a
    // full pipe buffer
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let stdout_reader = thread::spawn(move || read_pipe(stdout));
    let stderr_reader = thread::spawn(move || read_pipe(stderr));

    let status = cancel.wait_for_child(&mut child);
    let _ = stdout_reader.join();
    let stderr = stderr_reader.join().unwrap_or_default();

    handle_ffmpeg_result(status, &stderr, input_path, output_path)
}

fn read_pipe(pipe: Option<impl Read>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf);
    }
    buf
}

/// Handle ffmpeg command result and convert to ConversionResult
fn handle_ffmpeg_result(
    result: std::io::Result<ExitStatus>,
    stderr: &[u8],
    input_path: &Path,
    output_path: &Path,
) -> ConversionResult {
    match result {
        Ok(status) => {
            if status.success() {
                log::debug!("Successfully converted: {}", input_path.display());
                ConversionResult::succeeded(input_path, output_path)
            } else {
                let stderr = String::from_utf8_lossy(stderr);
                let error_msg = format!(
                    "ffmpeg exited with {}: {}",
                    status,
                    stderr
                        .lines()
                        .rev()
                        .find(|l| !l.trim().is_empty())
                        .unwrap_or("Unknown error")
                );
                log::warn!("Conversion failed: {}", error_msg);
                ConversionResult::failed(input_path, output_path, error_msg)
            }
        }
        Err(e) => {
            let error_msg = format!("Failed to wait for ffmpeg: {}", e);
            log::error!("Conversion error: {}", error_msg);
            ConversionResult::failed(input_path, output_path, error_msg)
        }
    }
}
