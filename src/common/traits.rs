//! Common traits defining the seams between planner components

use std::fmt;
use std::sync::Arc;

use log::Level;

use crate::common::error::PlannerResult;
use crate::common::types::{Coordinate, Point};

/// Trait for sampling-based planners that grow a tree until the goal is hit
pub trait SamplingPlanner<T: Coordinate> {
    /// Run with `workers` threads and return the root-to-goal path
    fn plan(&self, workers: usize) -> PlannerResult<Vec<Point<T>>>;

    /// Set the shared sample budget (`None` for unbounded)
    fn set_max_iterations(&mut self, max_iter: Option<usize>);
}

/// Receiver of diagnostic events emitted by the grid and the planner.
///
/// Components are handed a sink at construction instead of reaching for a
/// process-wide logger. Events never affect planning results.
pub trait EventSink: Send + Sync {
    fn record(&self, target: &'static str, level: Level, message: fmt::Arguments<'_>);

    /// Lets a sink skip formatting for levels it would drop anyway.
    fn enabled(&self, _target: &'static str, _level: Level) -> bool {
        true
    }
}

pub type SharedSink = Arc<dyn EventSink>;
