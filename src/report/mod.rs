//! Report and chart output.

pub mod chart;
pub mod generator;

pub use chart::{remove_stale_chart, render_chart, ChartOptions};
pub use generator::*;
