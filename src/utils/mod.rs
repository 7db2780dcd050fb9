//! Utility modules for warehouse_rrt

#[macro_use]
pub mod logging;
pub mod grid_map;
pub mod visualization;

pub use grid_map::*;
pub use logging::{LogSink, NullSink, RecordedEvent, RecordingSink};
pub use visualization::{colors, PlannerPlot};
