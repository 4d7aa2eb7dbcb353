//! Rendering implementation for ConverterView

use gpui::{
    Context, ExternalPaths, IntoElement, PromptLevel, Render, SharedString, Window, div,
    prelude::*, px,
};

use crate::actions::{RevealOutputDir, ShowTips, StartStop};
use crate::ui::Theme;
use crate::ui::components::drop_zone::{DropZoneProps, render_drop_zone};
use crate::ui::components::status_bar::{StatusBarProps, render_status_bar};

use super::{ConverterView, TIPS_MESSAGE};

impl ConverterView {
    /// One row per selected input, by file name
    pub(crate) fn input_lines(&self) -> Vec<SharedString> {
        self.state
            .selection
            .inputs()
            .iter()
            .map(|path| {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.display().to_string());
                SharedString::from(name)
            })
            .collect()
    }

    pub(crate) fn output_lines(&self) -> Vec<SharedString> {
        self.state
            .selection
            .output_dir()
            .map(|dir| vec![SharedString::from(dir.display().to_string())])
            .unwrap_or_default()
    }

    fn show_pending_tips(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        if self.pending_tips {
            self.pending_tips = false;
            let _future = window.prompt(
                PromptLevel::Info,
                "Tips",
                Some(TIPS_MESSAGE),
                &["OK"],
                cx,
            );
        }
    }

    fn render_header(&self, theme: &Theme, cx: &mut Context<Self>) -> impl IntoElement + use<> {
        let hover_bg = theme.bg_card_hover;

        div()
            .flex()
            .items_center()
            .justify_between()
            .child(
                div()
                    .text_xl()
                    .font_weight(gpui::FontWeight::BOLD)
                    .child("Audio Converter"),
            )
            .child(
                div()
                    .id("tips-button")
                    .px_3()
                    .py_1()
                    .rounded_md()
                    .bg(theme.bg_card)
                    .text_sm()
                    .text_color(theme.text_muted)
                    .cursor_pointer()
                    .hover(move |s| s.bg(hover_bg))
                    .on_click(cx.listener(|this, _event, _window, cx| {
                        this.pending_tips = true;
                        cx.notify();
                    }))
                    .child("Tips"),
            )
    }
}

impl Render for ConverterView {
    fn render(&mut self, window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        if !self.appearance_subscription_set {
            self.appearance_subscription_set = true;
            cx.observe_window_appearance(window, |_this, _window, cx| {
                cx.notify();
            })
            .detach();
        }

        // Grab initial focus so menu items work immediately
        if self.needs_initial_focus {
            self.needs_initial_focus = false;
            if let Some(ref focus_handle) = self.focus_handle {
                focus_handle.focus(window);
            }
        }

        self.show_pending_tips(window, cx);

        let theme = Theme::from_appearance(window.appearance());

        let header = self.render_header(&theme, cx);

        let input_zone = render_drop_zone(
            DropZoneProps {
                id: "input-drop-zone",
                placeholder: "Drop audio files here",
                lines: self.input_lines(),
                height: px(260.),
                theme,
            },
            cx,
            |this: &mut Self, paths: &ExternalPaths, cx| {
                this.handle_input_drop(paths.paths(), cx);
            },
        );

        let output_zone = render_drop_zone(
            DropZoneProps {
                id: "output-drop-zone",
                placeholder: "Drop the output folder here",
                lines: self.output_lines(),
                height: px(72.),
                theme,
            },
            cx,
            |this: &mut Self, paths: &ExternalPaths, cx| {
                this.handle_output_drop(paths.paths(), cx);
            },
        );

        let status_bar = render_status_bar(
            StatusBarProps {
                message: self.state.message.clone(),
                is_running: self.is_running(),
                theme,
            },
            cx,
            |this: &mut Self, cx| this.toggle_run(cx),
        );

        let on_show_tips = cx.listener(|this, _: &ShowTips, _window, cx| {
            this.pending_tips = true;
            cx.notify();
        });
        let on_start_stop = cx.listener(|this, _: &StartStop, _window, cx| {
            this.toggle_run(cx);
        });
        let on_reveal_output = cx.listener(|this, _: &RevealOutputDir, _window, _cx| {
            this.reveal_output_dir();
        });

        let mut container = div()
            .size_full()
            .flex()
            .flex_col()
            .gap_3()
            .p_6()
            .bg(theme.bg)
            .text_color(theme.text);

        // Track focus if we have a focus handle (not in tests)
        if let Some(ref focus_handle) = self.focus_handle {
            container = container.track_focus(focus_handle);
        }

        container
            .on_action(on_show_tips)
            .on_action(on_start_stop)
            .on_action(on_reveal_output)
            .child(header)
            .child(div().text_sm().text_color(theme.text_muted).child("Input files:"))
            .child(input_zone)
            .child(div().text_sm().text_color(theme.text_muted).child("Output folder:"))
            .child(output_zone)
            .child(div().flex_1())
            .child(status_bar)
    }
}
