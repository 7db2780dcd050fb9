// Path Planning algorithms module

pub mod search_tree;
pub mod concurrent_rrt;
pub mod path_extractor;

pub use search_tree::*;
pub use concurrent_rrt::*;
pub use path_extractor::*;
