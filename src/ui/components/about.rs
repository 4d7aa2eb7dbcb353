//! About window component

use gpui::{
    Bounds, Context, Render, SharedString, Window, WindowBounds, WindowHandle, WindowOptions, div,
    prelude::*, px, size,
};

use crate::ui::Theme;

/// The About window content
pub struct AboutBox;

impl AboutBox {
    pub fn new(_cx: &mut Context<Self>) -> Self {
        Self
    }

    /// Open the About window
    pub fn open(cx: &mut gpui::App) -> Option<WindowHandle<Self>> {
        let bounds = Bounds::centered(None, size(px(360.), px(200.)), cx);

        cx.open_window(
            WindowOptions {
                window_bounds: Some(WindowBounds::Windowed(bounds)),
                window_min_size: Some(size(px(360.), px(200.))),
                titlebar: Some(gpui::TitlebarOptions {
                    title: Some("About Audio Converter".into()),
                    appears_transparent: false,
                    traffic_light_position: None,
                }),
                ..Default::default()
            },
            |_window, cx| cx.new(AboutBox::new),
        )
        .map_err(|e| log::error!("Failed to open About window: {}", e))
        .ok()
    }
}

/// Credits shown under the version line
const CREDITS: &[&str] = &[
    "Drop .m4a files, pick a folder, press Start.",
    "Each file becomes an .mp3 of the same name.",
    "Encoding is done by FFmpeg (ffmpeg.org).",
];

impl Render for AboutBox {
    fn render(&mut self, window: &mut Window, _cx: &mut Context<Self>) -> impl IntoElement {
        let theme = Theme::from_appearance(window.appearance());
        let version = SharedString::from(format!("Version {}", env!("CARGO_PKG_VERSION")));

        div()
            .size_full()
            .flex()
            .flex_col()
            .justify_center()
            .gap_1()
            .p_6()
            .bg(theme.bg)
            .text_color(theme.text_muted)
            .child(
                div()
                    .text_xl()
                    .font_weight(gpui::FontWeight::BOLD)
                    .text_color(theme.text)
                    .child("Audio Converter"),
            )
            .child(div().text_sm().mb_2().child(version))
            .children(CREDITS.iter().map(|line| div().text_xs().child(*line)))
    }
}
