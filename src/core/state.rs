//! Application state types
//!
//! Contains shared state types used across the application:
//! - AppSettings: Global application preferences
//! - AppState: Selection, run status and status message for the window
//! - Transition / Effect: The only way AppState changes

use gpui::Global;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use super::selection::{DropResolution, Selection};
use crate::conversion::{BatchSummary, ConversionEvent, ConversionJob, RunId};

/// Application-wide settings
///
/// Persisted to ~/Library/Application Support/Audio Converter/app_settings.json
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Explicit ffmpeg binary to use instead of the bundled one
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,
    /// Kill the running ffmpeg process when a run is cancelled
    #[serde(default = "default_true")]
    pub interrupt_encoder_on_cancel: bool,
    /// Restore the last output folder on launch
    #[serde(default)]
    pub remember_output_dir: bool,
    #[serde(default)]
    pub last_output_dir: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            interrupt_encoder_on_cancel: true,
            remember_output_dir: false,
            last_output_dir: None,
        }
    }
}

impl Global for AppSettings {}

impl AppSettings {
    const SETTINGS_FILE: &'static str = "app_settings.json";

    /// Get the app data directory (~/Library/Application Support/Audio Converter/)
    fn get_app_data_dir() -> Result<PathBuf, String> {
        let data_dir =
            dirs::data_dir().ok_or_else(|| "Could not determine data directory".to_string())?;

        let app_dir = data_dir.join("Audio Converter");

        // Create directory if it doesn't exist
        if !app_dir.exists() {
            std::fs::create_dir_all(&app_dir)
                .map_err(|e| format!("Failed to create app data directory: {}", e))?;
        }

        Ok(app_dir)
    }

    /// Load app settings from disk, or return defaults if not found
    pub fn load() -> Self {
        let result = Self::get_app_data_dir()
            .and_then(|dir| Self::load_from(&dir.join(Self::SETTINGS_FILE)));
        match result {
            Ok(settings) => {
                log::debug!("Loaded app settings from disk");
                settings
            }
            Err(e) => {
                log::debug!("Using default app settings: {}", e);
                Self::default()
            }
        }
    }

    fn load_from(settings_path: &Path) -> Result<Self, String> {
        if !settings_path.exists() {
            return Err("Settings file not found".to_string());
        }

        let contents = std::fs::read_to_string(settings_path)
            .map_err(|e| format!("Failed to read settings: {}", e))?;

        serde_json::from_str(&contents).map_err(|e| format!("Failed to parse settings: {}", e))
    }

    /// Save app settings to disk
    pub fn save(&self) -> Result<(), String> {
        let app_dir = Self::get_app_data_dir()?;
        self.save_to(&app_dir.join(Self::SETTINGS_FILE))
    }

    fn save_to(&self, settings_path: &Path) -> Result<(), String> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;

        std::fs::write(settings_path, json)
            .map_err(|e| format!("Failed to write settings: {}", e))?;

        log::debug!("Saved app settings to {:?}", settings_path);
        Ok(())
    }

    /// Output folder to restore on launch, if remembering is enabled and
    /// the folder still exists
    pub fn restored_output_dir(&self) -> Option<PathBuf> {
        if !self.remember_output_dir {
            return None;
        }
        self.last_output_dir.clone().filter(|dir| dir.is_dir())
    }
}

/// Whether a conversion is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Idle,
    Running {
        run_id: RunId,
        finished: usize,
        failed: usize,
        total: usize,
    },
}

/// Text shown next to the start/stop button
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusMessage {
    AddInputFiles,
    SetOutputFolder,
    /// ffmpeg missing or the worker could not start
    StartFailed(String),
    Converting {
        finished: usize,
        failed: usize,
        total: usize,
    },
    Completed(BatchSummary),
    Cancelled,
    /// The worker went away without finishing the run
    WorkerStopped,
    /// Some dropped items were not accepted
    DropIgnored(usize),
}

impl StatusMessage {
    /// Messages that need the user's attention
    pub fn is_error(&self) -> bool {
        match self {
            StatusMessage::AddInputFiles
            | StatusMessage::SetOutputFolder
            | StatusMessage::StartFailed(_)
            | StatusMessage::WorkerStopped
            | StatusMessage::DropIgnored(_) => true,
            StatusMessage::Completed(summary) => summary.failed > 0,
            StatusMessage::Converting { failed, .. } => *failed > 0,
            StatusMessage::Cancelled => false,
        }
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusMessage::AddInputFiles => write!(f, "Please add input files"),
            StatusMessage::SetOutputFolder => write!(f, "Please set the output folder"),
            StatusMessage::StartFailed(e) => write!(f, "Cannot start: {}", e),
            StatusMessage::Converting {
                finished,
                failed,
                total,
            } => {
                if *failed > 0 {
                    write!(f, "Converting {}/{} ({} failed) ...", finished, total, failed)
                } else {
                    write!(f, "Converting {}/{} ...", finished, total)
                }
            }
            StatusMessage::Completed(summary) => {
                if summary.failed > 0 {
                    write!(
                        f,
                        "Conversion complete: {} converted, {} failed",
                        summary.succeeded, summary.failed
                    )
                } else {
                    write!(f, "Conversion complete")
                }
            }
            StatusMessage::Cancelled => write!(f, "Conversion cancelled"),
            StatusMessage::WorkerStopped => write!(f, "Conversion stopped unexpectedly"),
            StatusMessage::DropIgnored(1) => write!(f, "1 dropped item was ignored"),
            StatusMessage::DropIgnored(n) => write!(f, "{} dropped items were ignored", n),
        }
    }
}

/// Inputs to the state machine
#[derive(Debug, Clone)]
pub enum Transition {
    InputsDropped(DropResolution<Vec<PathBuf>>),
    OutputDropped(DropResolution<Option<PathBuf>>),
    /// Output folder restored from settings
    OutputRestored(PathBuf),
    /// The start/stop button (start while running means stop)
    StartStopPressed,
    /// The run could not be launched after all
    StartFailed { run_id: RunId, error: String },
    Conversion(ConversionEvent),
    /// The run's event channel closed
    WorkerExited { run_id: RunId },
}

/// What the caller has to do after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    StartRun(ConversionJob),
    CancelRun(RunId),
    /// The accepted output folder changed
    OutputChanged(PathBuf),
}

/// Everything the window shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub selection: Selection,
    pub run: RunStatus,
    pub message: Option<StatusMessage>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            selection: Selection::default(),
            run: RunStatus::Idle,
            message: None,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.run, RunStatus::Running { .. })
    }

    pub fn running_id(&self) -> Option<RunId> {
        match self.run {
            RunStatus::Running { run_id, .. } => Some(run_id),
            RunStatus::Idle => None,
        }
    }

    /// Apply one transition
    pub fn apply(&mut self, transition: Transition) -> Effect {
        match transition {
            Transition::InputsDropped(resolution) => {
                self.selection.replace_inputs(resolution.accepted);
                self.note_rejections(resolution.rejected.len());
                Effect::None
            }
            Transition::OutputDropped(resolution) => {
                self.note_rejections(resolution.rejected.len());
                match resolution.accepted {
                    Some(dir) => {
                        self.selection.set_output_dir(dir.clone());
                        Effect::OutputChanged(dir)
                    }
                    None => Effect::None,
                }
            }
            Transition::OutputRestored(dir) => {
                self.selection.set_output_dir(dir);
                Effect::None
            }
            Transition::StartStopPressed => self.start_or_stop(),
            Transition::StartFailed { run_id, error } => {
                if self.running_id() == Some(run_id) {
                    log::error!("Run {} failed to start: {}", run_id, error);
                    self.run = RunStatus::Idle;
                    self.message = Some(StatusMessage::StartFailed(error));
                }
                Effect::None
            }
            Transition::Conversion(event) => {
                self.on_conversion_event(event);
                Effect::None
            }
            Transition::WorkerExited { run_id } => {
                if self.running_id() == Some(run_id) {
                    log::error!("Run {} worker exited before completing", run_id);
                    self.run = RunStatus::Idle;
                    self.message = Some(StatusMessage::WorkerStopped);
                }
                Effect::None
            }
        }
    }

    fn note_rejections(&mut self, rejected: usize) {
        // Never clobber the progress line of a running conversion
        if self.is_running() {
            return;
        }
        self.message = (rejected > 0).then_some(StatusMessage::DropIgnored(rejected));
    }

    fn start_or_stop(&mut self) -> Effect {
        if let Some(run_id) = self.running_id() {
            self.run = RunStatus::Idle;
            self.message = Some(StatusMessage::Cancelled);
            return Effect::CancelRun(run_id);
        }

        if self.selection.inputs().is_empty() {
            self.message = Some(StatusMessage::AddInputFiles);
            return Effect::None;
        }
        let Some(output_dir) = self.selection.output_dir() else {
            self.message = Some(StatusMessage::SetOutputFolder);
            return Effect::None;
        };

        let job = ConversionJob {
            run_id: RunId::new(),
            inputs: self.selection.inputs().to_vec(),
            output_dir: output_dir.to_path_buf(),
        };
        let total = job.total();
        self.run = RunStatus::Running {
            run_id: job.run_id,
            finished: 0,
            failed: 0,
            total,
        };
        self.message = Some(StatusMessage::Converting {
            finished: 0,
            failed: 0,
            total,
        });
        Effect::StartRun(job)
    }

    fn on_conversion_event(&mut self, event: ConversionEvent) {
        if self.running_id() != Some(event.run_id()) {
            log::debug!("Ignoring event from stale run {}", event.run_id());
            return;
        }

        match event {
            ConversionEvent::FileStarted { index, input, .. } => {
                log::debug!("Converting #{}: {}", index + 1, input.display());
            }
            ConversionEvent::FileFailed { input, error, .. } => {
                log::warn!("Could not convert {}: {}", input.display(), error);
            }
            ConversionEvent::Progress {
                run_id,
                finished,
                failed,
                total,
                ..
            } => {
                self.run = RunStatus::Running {
                    run_id,
                    finished,
                    failed,
                    total,
                };
                self.message = Some(StatusMessage::Converting {
                    finished,
                    failed,
                    total,
                });
            }
            ConversionEvent::Completed { summary, .. } => {
                self.run = RunStatus::Idle;
                self.message = Some(StatusMessage::Completed(summary));
            }
        }
    }
}
