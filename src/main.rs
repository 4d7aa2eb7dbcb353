//! Audio Converter - GPUI Application
//!
//! A small desktop utility that batch converts dropped .m4a files to MP3
//! by running ffmpeg once per file.

mod actions;
mod conversion;
mod core;
mod logging;
mod ui;

#[cfg(test)]
mod test_fixtures;

use actions::{
    About, OpenLogFolder, Quit, RevealOutputDir, ShowTips, StartStop, ToggleInterruptOnCancel,
    ToggleRememberOutputDir,
};
use core::AppSettings;
use gpui::{
    App, Application, Bounds, KeyBinding, Menu, MenuItem, WindowBounds, WindowOptions,
    prelude::*, px, size,
};
use ui::components::{AboutBox, ConverterView};

/// Build the application menus with current settings state
fn build_menus(settings: &AppSettings) -> Vec<Menu> {
    // Use checkmark prefix when enabled
    let interrupt_label = if settings.interrupt_encoder_on_cancel {
        "✓ Interrupt ffmpeg on Cancel"
    } else {
        "Interrupt ffmpeg on Cancel"
    };

    let remember_label = if settings.remember_output_dir {
        "✓ Remember Output Folder"
    } else {
        "Remember Output Folder"
    };

    vec![
        Menu {
            name: "Audio Converter".into(),
            items: vec![
                MenuItem::action("About Audio Converter", About),
                MenuItem::action("Tips", ShowTips),
                MenuItem::separator(),
                MenuItem::action("Quit", Quit),
            ],
        },
        Menu {
            name: "Convert".into(),
            items: vec![
                MenuItem::action("Start / Stop", StartStop),
                MenuItem::separator(),
                MenuItem::action("Reveal Output Folder", RevealOutputDir),
            ],
        },
        Menu {
            name: "Options".into(),
            items: vec![
                MenuItem::action(interrupt_label, ToggleInterruptOnCancel),
                MenuItem::action(remember_label, ToggleRememberOutputDir),
                MenuItem::separator(),
                MenuItem::action("Open Log Folder", OpenLogFolder),
            ],
        },
    ]
}

/// Persist the settings and refresh the menu checkmarks
fn settings_changed(cx: &mut App) {
    let settings = cx.global::<AppSettings>();
    if let Err(e) = settings.save() {
        log::warn!("Failed to save settings: {}", e);
    }
    let menus = build_menus(settings);
    cx.set_menus(menus);
}

fn main() {
    if logging::init_logging().is_none() {
        eprintln!("Logging to file is unavailable");
    }
    log::info!("Audio Converter {} starting", env!("CARGO_PKG_VERSION"));

    Application::new().run(|cx: &mut App| {
        // Load app settings from disk (or use defaults)
        cx.set_global(AppSettings::load());

        // Register action handlers
        cx.on_action(|_: &Quit, cx| cx.quit());
        cx.on_action(|_: &About, cx| {
            AboutBox::open(cx);
        });
        cx.on_action(|_: &OpenLogFolder, _cx| {
            if let Err(e) = logging::open_log_directory() {
                log::error!("{}", e);
            }
        });
        cx.on_action(|_: &ToggleInterruptOnCancel, cx| {
            let settings = cx.global_mut::<AppSettings>();
            settings.interrupt_encoder_on_cancel = !settings.interrupt_encoder_on_cancel;
            log::info!(
                "Interrupt ffmpeg on cancel: {}",
                settings.interrupt_encoder_on_cancel
            );
            settings_changed(cx);
        });
        cx.on_action(|_: &ToggleRememberOutputDir, cx| {
            let settings = cx.global_mut::<AppSettings>();
            settings.remember_output_dir = !settings.remember_output_dir;
            if !settings.remember_output_dir {
                settings.last_output_dir = None;
            }
            log::info!("Remember output folder: {}", settings.remember_output_dir);
            settings_changed(cx);
        });

        // ShowTips, StartStop and RevealOutputDir are handled by the
        // ConverterView via on_action in render(), since it holds the focus.

        // Bind keyboard shortcuts
        cx.bind_keys([
            KeyBinding::new("cmd-q", Quit, None),
            KeyBinding::new("cmd-enter", StartStop, None),
        ]);

        // Set up the initial application menu
        let settings = cx.global::<AppSettings>();
        cx.set_menus(build_menus(settings));

        // Open the main window
        let bounds = Bounds::centered(None, size(px(440.), px(640.)), cx);

        let opened = cx.open_window(
            WindowOptions {
                window_bounds: Some(WindowBounds::Windowed(bounds)),
                window_min_size: Some(size(px(360.), px(520.))),
                titlebar: Some(gpui::TitlebarOptions {
                    title: Some("Audio Converter".into()),
                    appears_transparent: false,
                    traffic_light_position: None,
                }),
                ..Default::default()
            },
            |_window, cx| cx.new(ConverterView::new),
        );

        if let Err(e) = opened {
            log::error!("Failed to open main window: {}", e);
            cx.quit();
            return;
        }

        // Quit once the last window (main or About) is closed
        cx.on_window_closed(|cx| {
            if cx.windows().is_empty() {
                cx.quit();
            }
        })
        .detach();

        cx.activate(true);
    });
}
