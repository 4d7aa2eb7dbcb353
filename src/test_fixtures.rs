//! Test fixtures for conversion tests
//!
//! Provides a recording fake encoder, a shell script standing in for
//! ffmpeg, and helpers to lay out input files on disk.

#![cfg(test)]

use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};

use crate::conversion::{CancelToken, ConversionResult, Encoder};

static FIXTURES_DIR: OnceLock<PathBuf> = OnceLock::new();
#[cfg(unix)]
static FAKE_FFMPEG: OnceLock<PathBuf> = OnceLock::new();

/// Get the fixtures directory, creating it if necessary
pub fn fixtures_dir() -> &'static Path {
    FIXTURES_DIR.get_or_init(|| {
        let dir = std::env::temp_dir().join(format!(
            "audio_converter_test_fixtures_{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).expect("Failed to create fixtures directory");
        dir
    })
}

/// Shell script that behaves like `ffmpeg -y -i <input> <output>`
///
/// Every call appends its arguments to `invocations.log` in the output
/// directory. Inputs whose name contains `fail` exit 1 with an ffmpeg-like
/// stderr line; names containing `slow` write their pid to
/// `<input name>.pid` in the output directory and hang for 30 seconds.
#[cfg(unix)]
const FAKE_FFMPEG_SCRIPT: &str = r#"#!/bin/sh
out_dir=$(dirname "$4")
echo "$1 $2 $3 $4" >> "$out_dir/invocations.log"
case "$(basename "$3")" in
  *fail*)
    echo "ffmpeg version fake" >&2
    echo "$3: Invalid data found when processing input" >&2
    exit 1
    ;;
  *slow*)
    echo $$ > "$out_dir/$(basename "$3").pid"
    exec sleep 30
    ;;
esac
echo "size=N/A time=00:00:01.00 bitrate=N/A"
echo "encoded" > "$4"
exit 0
"#;

/// Path to the fake ffmpeg script, written once per test process
#[cfg(unix)]
pub fn fake_ffmpeg() -> &'static Path {
    FAKE_FFMPEG.get_or_init(|| {
        use std::os::unix::fs::PermissionsExt;

        let path = fixtures_dir().join("ffmpeg");
        std::fs::write(&path, FAKE_FFMPEG_SCRIPT).expect("Failed to write fake ffmpeg");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("Failed to make fake ffmpeg executable");
        path
    })
}

/// Lines the fake ffmpeg appended for runs into `output_dir`
pub fn read_invocations(output_dir: &Path) -> Vec<String> {
    std::fs::read_to_string(output_dir.join("invocations.log"))
        .map(|s| s.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Pid of the fake ffmpeg hanging on `input_name`, once it has started
#[cfg(unix)]
pub fn wait_for_slow_pid(output_dir: &Path, input_name: &str) -> i32 {
    let pid_file = output_dir.join(format!("{}.pid", input_name));
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(pid) = std::fs::read_to_string(&pid_file)
            .ok()
            .and_then(|s| s.trim().parse().ok())
        {
            return pid;
        }
        assert!(Instant::now() < deadline, "fake ffmpeg never started");
        std::thread::sleep(Duration::from_millis(10));
    }
}

/// Whether a process with this pid still exists
#[cfg(unix)]
pub fn process_exists(pid: i32) -> bool {
    unsafe { libc::kill(pid, 0) == 0 }
}

/// Create empty files with the given names and return their paths
pub fn make_input_files(dir: &Path, names: &[&str]) -> Vec<PathBuf> {
    names
        .iter()
        .map(|name| {
            let path = dir.join(name);
            std::fs::write(&path, b"not really audio").expect("Failed to create input file");
            path
        })
        .collect()
}

/// Encoder that records every invocation instead of running anything
pub struct RecordingEncoder {
    calls: Mutex<Vec<(PathBuf, PathBuf)>>,
    failing: Vec<PathBuf>,
    cancel_on_call: Option<usize>,
    block_until_cancelled: bool,
}

impl RecordingEncoder {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failing: Vec::new(),
            cancel_on_call: None,
            block_until_cancelled: false,
        }
    }

    /// Report failure for this input
    pub fn failing_on(mut self, input: &Path) -> Self {
        self.failing.push(input.to_path_buf());
        self
    }

    /// Cancel the run while the n-th call (zero based) is encoding
    pub fn cancelling_on(mut self, call: usize) -> Self {
        self.cancel_on_call = Some(call);
        self
    }

    /// Hang inside every call until the run is cancelled
    pub fn blocking_until_cancelled(mut self) -> Self {
        self.block_until_cancelled = true;
        self
    }

    pub fn invocations(&self) -> Vec<(PathBuf, PathBuf)> {
        self.calls.lock().unwrap().clone()
    }

    /// Wait until at least `count` calls happened
    pub fn wait_for_invocations(&self, count: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while self.calls.lock().unwrap().len() < count {
            assert!(Instant::now() < deadline, "encoder was never invoked");
            std::thread::sleep(Duration::from_millis(5));
        }
    }
}

impl Encoder for RecordingEncoder {
    fn encode(
        &self,
        input_path: &Path,
        output_path: &Path,
        cancel: &CancelToken,
    ) -> ConversionResult {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((input_path.to_path_buf(), output_path.to_path_buf()));
            calls.len() - 1
        };

        if self.cancel_on_call == Some(call) {
            cancel.cancel();
        }
        if self.block_until_cancelled {
            while !cancel.is_cancelled() {
                std::thread::sleep(Duration::from_millis(5));
            }
        }

        let success = !self.failing.iter().any(|p| p == input_path);
        ConversionResult {
            output_path: output_path.to_path_buf(),
            input_path: input_path.to_path_buf(),
            success,
            error: (!success).then(|| "simulated encoder failure".to_string()),
        }
    }
}
