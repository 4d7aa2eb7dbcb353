//! Core application logic and state
//!
//! This module contains:
//! - Application-wide settings (persisted preferences)
//! - The window state machine (selection, run status, status message)
//! - Drop resolution for the input and output targets

mod selection;
mod state;

pub use selection::{
    DropResolution, DroppedPath, ItemProvider, RejectReason, RejectedItem, Selection,
    resolve_input_drop, resolve_output_drop,
};
pub use state::{AppSettings, AppState, Effect, RunStatus, StatusMessage, Transition};
