//! Audio conversion module
//!
//! Runs the external ffmpeg binary once per input file, strictly one file
//! at a time, on a background worker.

mod background;
mod batch;
mod ffmpeg;

pub use background::{ConversionEvent, RunHandle, start_conversion};
pub use batch::{BatchSummary, CancelToken, ConversionJob, RunId};
pub use ffmpeg::{ConversionResult, Encoder, FfmpegEncoder};

use std::path::{Path, PathBuf};

const FFMPEG_BINARY: &str = if cfg!(windows) { "ffmpeg.exe" } else { "ffmpeg" };

/// Get the path to the ffmpeg binary
///
/// Lookup order:
/// 1. An explicit override from the app settings
/// 2. CARGO_MANIFEST_DIR/resources/bin/ffmpeg (development)
/// 3. The app bundle's Resources/bin/ffmpeg, or resources/bin next to the executable
/// 4. ffmpeg on PATH
pub fn get_ffmpeg_path(override_path: Option<&Path>) -> Result<PathBuf, String> {
    if let Some(path) = override_path {
        if path.is_file() {
            log::debug!("Using configured ffmpeg: {:?}", path);
            return Ok(path.to_path_buf());
        }
        log::warn!("Configured ffmpeg {:?} does not exist, searching defaults", path);
    }

    // Try CARGO_MANIFEST_DIR first (development mode)
    if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
        let dev_path = PathBuf::from(manifest_dir)
            .join("resources")
            .join("bin")
            .join(FFMPEG_BINARY);

        if dev_path.is_file() {
            log::debug!("Found ffmpeg at development path: {:?}", dev_path);
            return Ok(dev_path);
        }
    }

    // Try relative to current executable (release mode)
    if let Ok(exe_path) = std::env::current_exe()
        && let Some(exe_dir) = exe_path.parent()
    {
        // macOS app bundle: Contents/MacOS/../Resources/bin/ffmpeg
        let bundle_path = exe_dir
            .join("..")
            .join("Resources")
            .join("bin")
            .join(FFMPEG_BINARY);
        if bundle_path.is_file() {
            log::debug!("Found ffmpeg at bundle path: {:?}", bundle_path);
            return Ok(bundle_path);
        }

        let local_path = exe_dir.join("resources").join("bin").join(FFMPEG_BINARY);
        if local_path.is_file() {
            log::debug!("Found ffmpeg at local path: {:?}", local_path);
            return Ok(local_path);
        }
    }

    if let Some(path) = find_on_path(FFMPEG_BINARY) {
        log::debug!("Found ffmpeg on PATH: {:?}", path);
        return Ok(path);
    }

    Err("ffmpeg binary not found. Expected at resources/bin/ffmpeg or on PATH".to_string())
}

fn find_on_path(binary: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(binary))
        .find(|candidate| candidate.is_file())
}

/// Locate ffmpeg and verify that it is executable
pub fn verify_ffmpeg(override_path: Option<&Path>) -> Result<PathBuf, String> {
    let path = get_ffmpeg_path(override_path)?;

    // On Unix, check if executable
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let metadata = std::fs::metadata(&path)
            .map_err(|e| format!("Failed to get ffmpeg metadata: {}", e))?;
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(format!("ffmpeg at {:?} is not executable", path));
        }
    }

    log::info!("ffmpeg verified at: {:?}", path);
    Ok(path)
}
