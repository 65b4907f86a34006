//! Charts module - Panel data and static rendering

mod plotter;
mod renderer;

pub use plotter::{
    BeatMarker, ChartData, ChartPlotter, ANOMALOUS_COLOR, NORMAL_COLOR, SIGNAL_COLOR,
};
pub use renderer::{ChartLayout, ChartRenderer, RenderError};
