//! Charts module - Chart rendering

pub mod palette;
mod plotter;
mod renderer;

pub use plotter::{ChartPlotter, EMPTY_RANGE_MESSAGE};
pub use renderer::StaticChartRenderer;
