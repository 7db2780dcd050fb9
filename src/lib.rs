//! warehouse_rrt - multi-threaded RRT path planning on an occupancy grid
//!
//! A rectangular robot is planned across a rasterised 2D workspace with
//! axis-aligned rectangular obstacles. Several worker threads grow one shared
//! Rapidly-exploring Random Tree until a node lands within goal tolerance,
//! then the root-to-goal path is read back out of the tree.

// Core modules
pub mod common;
#[macro_use]
pub mod utils;

// Algorithm modules
pub mod path_planning;
pub mod scenario;

// Re-export common types for convenience
pub use common::{Coordinate, Footprint, Point, WorkspaceBounds};
pub use common::{EventSink, SamplingPlanner, SharedSink};
pub use common::{ConfigError, GridError, PlannerError, PlannerResult};
pub use path_planning::{ConcurrentRrtPlanner, PlanStats, PlannerConfig, PlannerSetup};
pub use utils::{CellState, OccupancyGrid};
