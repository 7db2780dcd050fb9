//! Error types for warehouse_rrt

use thiserror::Error;

/// Rejections reported by the occupancy grid.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    /// Obstacles are axis-aligned rectangles given by exactly four corners.
    #[error("obstacle must be defined by 4 corners, got {corners}")]
    MalformedObstacle { corners: usize },

    /// A mark or query mapped outside the grid extent.
    #[error("cell ({col}, {row}) is outside the {rows}x{cols} grid")]
    OutOfBounds {
        row: i64,
        col: i64,
        rows: usize,
        cols: usize,
    },
}

/// Main error type for planning runs
#[derive(Debug, Error)]
pub enum PlannerError {
    /// Invalid construction or run parameter
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error(transparent)]
    Grid(#[from] GridError),

    /// The iteration or time budget ran out before any node reached the goal
    #[error("no path found after {iterations} samples ({nodes} nodes in tree)")]
    NoPathFound { iterations: usize, nodes: usize },

    /// Termination was signalled but no tree node lies within goal tolerance
    #[error("goal not reachable: none of the {nodes} tree nodes is within tolerance")]
    GoalNotInTree { nodes: usize },

    /// A worker panicked while holding shared planner state
    #[error("planner state poisoned: {0}")]
    LockPoisoned(&'static str),
}

/// Errors raised while loading a scenario description
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read scenario: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse scenario: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Planner(#[from] PlannerError),
}

/// Result type alias for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;
