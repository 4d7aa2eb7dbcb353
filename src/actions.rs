//! Application-wide actions
//!
//! Actions that can be triggered from menus or keyboard shortcuts.

use gpui::actions;
use std::path::Path;
use std::process::Command;

// Define actions for menu items
actions!(
    app,
    [
        Quit,
        About,
        ShowTips,
        StartStop,
        RevealOutputDir,
        OpenLogFolder,
        ToggleInterruptOnCancel,
        ToggleRememberOutputDir,
    ]
);

/// Show a folder in Finder (or the platform's file manager)
pub fn open_in_file_manager(path: &Path) -> Result<(), String> {
    let opener = if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(windows) {
        "explorer"
    } else {
        "xdg-open"
    };

    Command::new(opener)
        .arg(path)
        .spawn()
        .map(|_| ())
        .map_err(|e| format!("Failed to open {}: {}", path.display(), e))
}
