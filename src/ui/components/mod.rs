//! Reusable UI components

mod about;
mod converter_view;
mod drop_zone;
mod status_bar;

pub use about::AboutBox;
pub use converter_view::ConverterView;
