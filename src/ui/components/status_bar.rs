//! StatusBar component - Status message on the left, start/stop on the right

use gpui::{Context, IntoElement, SharedString, div, prelude::*};

use crate::core::StatusMessage;
use crate::ui::Theme;

/// Properties for the status bar
pub struct StatusBarProps {
    pub message: Option<StatusMessage>,
    pub is_running: bool,
    pub theme: Theme,
}

impl StatusBarProps {
    pub fn button_label(&self) -> &'static str {
        if self.is_running {
            "Stop"
        } else {
            "Start"
        }
    }
}

/// Render the status bar
///
/// The button toggles: it starts a run when idle and cancels when running.
pub fn render_status_bar<V: 'static, F: Fn(&mut V, &mut Context<V>) + 'static>(
    props: StatusBarProps,
    cx: &mut Context<V>,
    on_button_click: F,
) -> impl IntoElement + use<V, F> {
    let theme = props.theme;
    let label = props.button_label();
    let (button_bg, button_hover) = if props.is_running {
        (theme.danger, theme.danger_hover)
    } else {
        (theme.accent, theme.accent_hover)
    };

    let message = props.message.as_ref().map(|m| {
        div()
            .flex_1()
            .text_sm()
            .text_color(if m.is_error() { theme.danger } else { theme.text_muted })
            .child(SharedString::from(m.to_string()))
    });

    div()
        .flex()
        .items_center()
        .justify_between()
        .gap_4()
        .child(div().flex_1().children(message))
        .child(
            div()
                .id(SharedString::from("start-stop-button"))
                .w_24()
                .h_10()
                .flex()
                .items_center()
                .justify_center()
                .rounded_lg()
                .bg(button_bg)
                .text_color(gpui::white())
                .cursor_pointer()
                .hover(move |s| s.bg(button_hover))
                .on_click(cx.listener(move |view, _event, _window, cx| {
                    on_button_click(view, cx);
                }))
                .child(label),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_label_follows_run_state() {
        let idle = StatusBarProps {
            message: None,
            is_running: false,
            theme: Theme::light(),
        };
        assert_eq!(idle.button_label(), "Start");

        let running = StatusBarProps {
            is_running: true,
            ..idle
        };

        assert_eq!(running.button_label(), "Stop");
    }
}
