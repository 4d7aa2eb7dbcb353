//! ConverterView component - The main application window
//!
//! This is the root view of the application, containing:
//! - Header with the Tips button
//! - Input drop zone (dropped .m4a files)
//! - Output drop zone (destination folder)
//! - Status bar with the start/stop button

mod drops;
mod render;
mod run;

use std::sync::mpsc;

use gpui::{Context, FocusHandle};

use crate::conversion::{ConversionEvent, RunHandle};
use crate::core::{AppSettings, AppState, Transition};

/// Shown by the Tips button and menu item
pub(crate) const TIPS_MESSAGE: &str = "Avoid duplicate file names: files with the same name \
overwrite each other's output.\n\nIf you are asked whether Audio Converter may access a folder \
during conversion, please allow it.";

/// The main converter view
///
/// Handles:
/// - External drag-drop from Finder onto either drop zone
/// - Starting and cancelling runs
/// - Draining worker events on the UI thread
pub struct ConverterView {
    /// Selection, run status and status message
    pub(crate) state: AppState,
    /// Handle of the worker for the current run
    pub(crate) active_run: Option<RunHandle>,
    /// Cancelled worker that may still be finishing its current file
    pub(crate) stopping_run: Option<RunHandle>,
    /// Latest drop started on each zone; older resolutions are ignored
    pub(crate) input_drop_seq: u64,
    pub(crate) output_drop_seq: u64,
    /// Events from the current run's worker
    pub(crate) event_rx: Option<mpsc::Receiver<ConversionEvent>>,
    /// Whether the event polling loop is alive
    pub(crate) polling_active: bool,
    /// Whether we've subscribed to appearance changes
    pub(crate) appearance_subscription_set: bool,
    /// Focus handle for receiving actions (None in tests)
    pub(crate) focus_handle: Option<FocusHandle>,
    /// Whether we need to grab initial focus (for menu items to work)
    pub(crate) needs_initial_focus: bool,
    /// Show the tips alert on next render
    pub(crate) pending_tips: bool,
}

impl ConverterView {
    pub fn new(cx: &mut Context<Self>) -> Self {
        let settings = cx.global::<AppSettings>().clone();
        let mut view = Self::with_settings(&settings);
        view.focus_handle = Some(cx.focus_handle());
        view.needs_initial_focus = true;
        view
    }

    fn with_settings(settings: &AppSettings) -> Self {
        let mut state = AppState::new();
        if let Some(dir) = settings.restored_output_dir() {
            log::info!("Restored output folder {}", dir.display());
            state.apply(Transition::OutputRestored(dir));
        }

        Self {
            state,
            active_run: None,
            stopping_run: None,
            input_drop_seq: 0,
            output_drop_seq: 0,
            event_rx: None,
            polling_active: false,
            appearance_subscription_set: false,
            focus_handle: None,
            needs_initial_focus: false,
            pending_tips: false,
        }
    }

    /// Create a new ConverterView for testing (without GPUI context)
    #[cfg(test)]
    pub fn new_for_test(settings: &AppSettings) -> Self {
        Self::with_settings(settings)
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Show the output folder in the file manager
    pub fn reveal_output_dir(&self) {
        match self.state.selection.output_dir() {
            Some(dir) => {
                if let Err(e) = crate::actions::open_in_file_manager(dir) {
                    log::error!("{}", e);
                }
            }
            None => log::info!("No output folder set yet"),
        }
    }
}
