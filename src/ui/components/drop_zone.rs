//! DropZone component - A dashed-looking target that accepts Finder drops

use gpui::{Context, ExternalPaths, IntoElement, Pixels, SharedString, div, prelude::*};

use crate::ui::Theme;

/// Properties for a drop zone
pub struct DropZoneProps {
    pub id: &'static str,
    /// Shown when there is nothing to list
    pub placeholder: &'static str,
    /// One row per entry (file names, or the folder path)
    pub lines: Vec<SharedString>,
    pub height: Pixels,
    pub theme: Theme,
}

/// Render a drop zone
///
/// `on_drop` receives the raw paths; resolving them is up to the view.
pub fn render_drop_zone<V: 'static, F: Fn(&mut V, &ExternalPaths, &mut Context<V>) + 'static>(
    props: DropZoneProps,
    cx: &mut Context<V>,
    on_drop: F,
) -> impl IntoElement + use<V, F> {
    let DropZoneProps {
        id,
        placeholder,
        lines,
        height,
        theme,
    } = props;
    let hover_bg = theme.bg_card_hover;

    let content = if lines.is_empty() {
        div()
            .size_full()
            .flex()
            .items_center()
            .justify_center()
            .text_lg()
            .text_color(theme.text_muted)
            .child(placeholder)
    } else {
        div()
            .w_full()
            .flex()
            .flex_col()
            .gap_1()
            .p_3()
            .text_sm()
            .text_color(theme.text)
            .children(lines.into_iter().map(|line| div().truncate().child(line)))
    };

    div()
        .id(SharedString::from(id))
        .w_full()
        .h(height)
        .overflow_y_scroll()
        .rounded_xl()
        .border_2()
        .border_color(theme.accent)
        .bg(theme.bg_card)
        .on_drop(cx.listener(move |view, paths: &ExternalPaths, _window, cx| {
            on_drop(view, paths, cx);
        }))
        .drag_over::<ExternalPaths>(move |style, _, _, _| style.bg(hover_bg))
        .child(content)
}
