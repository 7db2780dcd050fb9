//! Root-to-goal path extraction from a finished search tree

use itertools::Itertools;

use crate::common::{Coordinate, PlannerError, PlannerResult, Point};
use crate::path_planning::search_tree::{NodeId, SearchTree};

/// First node in breadth-first order lying strictly within `tolerance` of `goal`.
///
/// This is the shallowest such node, not necessarily the one nearest to the goal.
pub fn find_goal_node<T: Coordinate>(tree: &SearchTree<T>, goal: &Point<T>, tolerance: f64) -> Option<NodeId> {
    tree.bfs().find(|&id| tree.point(id).distance(goal) < tolerance)
}

/// Backtraces parent links from the goal node and returns the points root first.
pub fn extract_path<T: Coordinate>(
    tree: &SearchTree<T>,
    goal: &Point<T>,
    tolerance: f64,
) -> PlannerResult<Vec<Point<T>>> {
    let target = find_goal_node(tree, goal, tolerance).ok_or(PlannerError::GoalNotInTree { nodes: tree.len() })?;

    let mut path: Vec<Point<T>> = tree
        .path_to_root(target)
        .into_iter()
        .map(|id| tree.point(id))
        .collect();
    path.reverse();
    Ok(path)
}

/// Sum of segment lengths along `path`.
pub fn path_length<T: Coordinate>(path: &[Point<T>]) -> f64 {
    path.iter().tuple_windows().map(|(a, b)| a.distance(b)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> SearchTree<i32> {
        let mut tree = SearchTree::new(Point::new(0, 0));
        let a = tree.insert(NodeId::ROOT, Point::new(30, 40)).unwrap();
        let b = tree.insert(a, Point::new(60, 80)).unwrap();
        tree.insert(b, Point::new(95, 98)).unwrap();
        // Detour branch that also reaches the goal, but deeper.
        let d = tree.insert(NodeId::ROOT, Point::new(0, 50)).unwrap();
        let e = tree.insert(d, Point::new(0, 100)).unwrap();
        let f = tree.insert(e, Point::new(50, 100)).unwrap();
        tree.insert(f, Point::new(99, 100)).unwrap();
        tree
    }

    #[test]
    fn test_extract_path_root_to_goal() {
        let tree = chain();
        let goal = Point::new(100, 100);
        let path = extract_path(&tree, &goal, 15.0).unwrap();

        assert_eq!(path.first(), Some(&Point::new(0, 0)));
        assert_eq!(path.last(), Some(&Point::new(95, 98)));
        assert_eq!(path.len(), 4);
        assert!((path_length(&path[..3]) - 100.0).abs() < 1e-10);
    }

    #[test]
    fn test_shallowest_goal_node_wins() {
        let tree = chain();
        // (99, 100) is closer to the goal but lies one level deeper.
        let id = find_goal_node(&tree, &Point::new(100, 100), 15.0).unwrap();
        assert_eq!(tree.point(id), Point::new(95, 98));
    }

    #[test]
    fn test_missing_goal_is_an_error() {
        let tree = chain();
        let err = extract_path(&tree, &Point::new(500, 500), 15.0).unwrap_err();
        assert!(matches!(err, PlannerError::GoalNotInTree { nodes: 8 }));
    }

    #[test]
    fn test_root_within_tolerance() {
        let tree = SearchTree::new(Point::new(5.0, 5.0));
        let path = extract_path(&tree, &Point::new(6.0, 6.0), 15.0).unwrap();
        assert_eq!(path, vec![Point::new(5.0, 5.0)]);
        assert_eq!(path_length(&path), 0.0);
    }
}
