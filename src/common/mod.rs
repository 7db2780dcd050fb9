//! Common types, traits, and error definitions for warehouse_rrt
//!
//! This module provides the geometry primitives and the seams shared by the
//! grid, the tree and the planner.

pub mod types;
pub mod traits;
pub mod error;

pub use types::*;
pub use traits::*;
pub use error::*;
