// occupancy grid definition
// Rasterises the workspace into square cells of the robot's footprint size.

use std::fmt;

use itertools::{iproduct, Itertools, MinMaxResult};
use log::Level;
use nalgebra::DMatrix;

use crate::common::{Coordinate, GridError, PlannerError, PlannerResult, Point, SharedSink, WorkspaceBounds};

const TARGET: &str = "warehouse_rrt::grid";

/// State of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellState {
    #[default]
    Free,
    /// Covered by an obstacle. The only state that blocks validity.
    Occupied,
    /// Holds a tree node. Informational only.
    Visited,
}

impl CellState {
    /// Numeric encoding: free `0`, occupied `-1`, visited `1`.
    pub fn value(self) -> i8 {
        match self {
            CellState::Free => 0,
            CellState::Occupied => -1,
            CellState::Visited => 1,
        }
    }
}

/// Workspace raster indexed `[row = y / dim][col = x / dim]`.
#[derive(Clone)]
pub struct OccupancyGrid<T> {
    bounds: WorkspaceBounds<T>,
    cell_size: T,
    cells: DMatrix<CellState>,
    sink: SharedSink,
}

impl<T: Coordinate> OccupancyGrid<T> {
    /// Builds an all-free grid of `ceil(height/dim)` rows by `ceil(width/dim)` columns.
    pub fn new(bounds: WorkspaceBounds<T>, cell_size: T, sink: SharedSink) -> PlannerResult<Self> {
        let dim = cell_size.to_f64();
        if !(dim > 0.0) {
            return Err(PlannerError::InvalidParameter(format!(
                "cell size must be positive, got {}",
                cell_size
            )));
        }
        let (width, height) = (bounds.width.to_f64(), bounds.height.to_f64());
        if !(width > 0.0 && height > 0.0) {
            return Err(PlannerError::InvalidParameter(format!(
                "workspace must have positive extent, got {}x{}",
                bounds.width, bounds.height
            )));
        }

        let rows = (height / dim).ceil() as usize;
        let cols = (width / dim).ceil() as usize;
        emit!(sink, TARGET, Level::Debug, "grid dimensions: {}x{}, cell size {}", rows, cols, cell_size);

        Ok(Self {
            bounds,
            cell_size,
            cells: DMatrix::from_element(rows, cols, CellState::Free),
            sink,
        })
    }

    pub fn rows(&self) -> usize {
        self.cells.nrows()
    }

    pub fn cols(&self) -> usize {
        self.cells.ncols()
    }

    pub fn cell_size(&self) -> T {
        self.cell_size
    }

    pub fn bounds(&self) -> WorkspaceBounds<T> {
        self.bounds
    }

    /// `(row, col)` of the cell containing `point`.
    pub fn cell_index(&self, point: &Point<T>) -> Result<(usize, usize), GridError> {
        self.index_of(point.x().to_f64(), point.y().to_f64())
    }

    fn index_of(&self, x: f64, y: f64) -> Result<(usize, usize), GridError> {
        let dim = self.cell_size.to_f64();
        let col = (x / dim).floor();
        let row = (y / dim).floor();
        let (rows, cols) = self.cells.shape();

        if row >= 0.0 && col >= 0.0 && (row as usize) < rows && (col as usize) < cols {
            Ok((row as usize, col as usize))
        } else {
            Err(GridError::OutOfBounds {
                row: row as i64,
                col: col as i64,
                rows,
                cols,
            })
        }
    }

    pub fn state_at(&self, row: usize, col: usize) -> Option<CellState> {
        self.cells.get((row, col)).copied()
    }

    /// True iff `point` maps into the grid and its cell is not occupied.
    pub fn is_valid(&self, point: &Point<T>) -> bool {
        self.is_valid_at(point.x().to_f64(), point.y().to_f64())
    }

    /// `is_valid` for a real-valued position, used for sub-step probes.
    pub fn is_valid_at(&self, x: f64, y: f64) -> bool {
        match self.index_of(x, y) {
            Ok(index) => self.cells[index] != CellState::Occupied,
            Err(_) => false,
        }
    }

    /// Sets the state of the cell containing `point`. Out-of-bounds marks are dropped.
    pub fn mark_cell(&mut self, point: &Point<T>, state: CellState) -> Result<(), GridError> {
        self.mark_xy(point.x().to_f64(), point.y().to_f64(), state)
    }

    fn mark_xy(&mut self, x: f64, y: f64, state: CellState) -> Result<(), GridError> {
        match self.index_of(x, y) {
            Ok((row, col)) => {
                self.cells[(row, col)] = state;
                emit!(self.sink, TARGET, Level::Trace, "marked cell at ({}, {}) with value {}", col, row, state.value());
                Ok(())
            }
            Err(err) => {
                emit!(self.sink, TARGET, Level::Warn, "tried to mark cell out of bounds: {}", err);
                Err(err)
            }
        }
    }

    /// Marks the axis-aligned bounding box of four corners as occupied.
    ///
    /// Corner order does not matter. Cells are visited from the lower-left
    /// corner of the box in steps of one cell size, so every cell whose
    /// sampled corner lies inside `[min_x, max_x] x [min_y, max_y]` is marked.
    /// Returns the number of cells that changed to occupied.
    pub fn add_obstacle(&mut self, corners: &[Point<T>]) -> Result<usize, GridError> {
        if corners.len() != 4 {
            let err = GridError::MalformedObstacle { corners: corners.len() };
            emit!(self.sink, TARGET, Level::Error, "rejected obstacle: {}", err);
            return Err(err);
        }

        let (min_x, max_x) = extent(corners.iter().map(|p| p.x().to_f64()));
        let (min_y, max_y) = extent(corners.iter().map(|p| p.y().to_f64()));
        let dim = self.cell_size.to_f64();

        let mut marked = 0;
        for (x, y) in iproduct!(steps(min_x, max_x, dim), steps(min_y, max_y, dim)) {
            let was_occupied = self
                .index_of(x, y)
                .map(|index| self.cells[index] == CellState::Occupied)
                .unwrap_or(true);
            if self.mark_xy(x, y, CellState::Occupied).is_ok() && !was_occupied {
                marked += 1;
            }
        }

        emit!(
            self.sink,
            TARGET,
            Level::Info,
            "obstacle added with top-left: ({}, {}), bottom-right: ({}, {})",
            min_x,
            min_y,
            max_x,
            max_y
        );
        Ok(marked)
    }

    /// Lower-left corner of a cell in workspace coordinates.
    pub fn cell_origin(&self, row: usize, col: usize) -> (f64, f64) {
        let dim = self.cell_size.to_f64();
        (col as f64 * dim, row as f64 * dim)
    }

    /// `(row, col)` of every cell in `state`, row-major.
    pub fn cells_in_state(&self, state: CellState) -> impl Iterator<Item = (usize, usize)> + '_ {
        iproduct!(0..self.rows(), 0..self.cols()).filter(move |&index| self.cells[index] == state)
    }

    pub fn occupied_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.cells_in_state(CellState::Occupied)
    }

    pub fn count(&self, state: CellState) -> usize {
        self.cells.iter().filter(|&&s| s == state).count()
    }
}

impl<T: Coordinate> fmt::Debug for OccupancyGrid<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OccupancyGrid")
            .field("bounds", &self.bounds)
            .field("cell_size", &self.cell_size)
            .field("rows", &self.rows())
            .field("cols", &self.cols())
            .finish()
    }
}

fn extent(values: impl Iterator<Item = f64>) -> (f64, f64) {
    match values.minmax_by(|a, b| a.total_cmp(b)) {
        MinMaxResult::MinMax(min, max) => (min, max),
        MinMaxResult::OneElement(v) => (v, v),
        MinMaxResult::NoElements => (0.0, 0.0),
    }
}

fn steps(min: f64, max: f64, step: f64) -> impl Iterator<Item = f64> + Clone {
    let count = ((max - min) / step).floor() as usize + 1;
    (0..count).map(move |i| min + i as f64 * step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::logging::{NullSink, RecordingSink};
    use rstest::rstest;

    fn grid(width: i32, height: i32, dim: i32) -> OccupancyGrid<i32> {
        OccupancyGrid::new(WorkspaceBounds::new(width, height), dim, NullSink::shared()).unwrap()
    }

    fn square(x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<Point<i32>> {
        vec![
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ]
    }

    #[test]
    fn test_dimensions_round_up() {
        let g = grid(105, 42, 10);
        assert_eq!(g.rows(), 5);
        assert_eq!(g.cols(), 11);
        assert_eq!(g.count(CellState::Free), 55);
    }

    #[test]
    fn test_rejects_non_positive_cell_size() {
        let err = OccupancyGrid::new(WorkspaceBounds::new(10, 10), 0, NullSink::shared()).unwrap_err();
        assert!(matches!(err, PlannerError::InvalidParameter(_)));
    }

    #[rstest]
    #[case(Point::new(15, 15), true)]
    #[case(Point::new(20, 20), false)]
    #[case(Point::new(30, 35), false)]
    #[case(Point::new(49, 49), false)]
    #[case(Point::new(55, 30), true)]
    #[case(Point::new(30, 55), true)]
    #[case(Point::new(-1, 30), false)]
    #[case(Point::new(30, 100), false)]
    #[case(Point::new(99, 99), true)]
    fn test_is_valid_around_obstacle(#[case] point: Point<i32>, #[case] expected: bool) {
        let mut g = grid(100, 100, 10);
        g.add_obstacle(&square(20, 20, 40, 40)).unwrap();
        assert_eq!(g.is_valid(&point), expected);
        assert_eq!(g.is_valid(&point), expected);
    }

    #[test]
    fn test_obstacle_corner_order_is_irrelevant() {
        let mut a = grid(100, 100, 10);
        let mut b = grid(100, 100, 10);
        a.add_obstacle(&square(20, 30, 60, 50)).unwrap();
        b.add_obstacle(&[
            Point::new(60, 50),
            Point::new(20, 30),
            Point::new(20, 50),
            Point::new(60, 30),
        ])
        .unwrap();

        let cells_a: Vec<_> = a.occupied_cells().collect();
        let cells_b: Vec<_> = b.occupied_cells().collect();
        assert_eq!(cells_a, cells_b);
        assert_eq!(cells_a.len(), 5 * 3);
    }

    #[test]
    fn test_every_marked_cell_is_invalid() {
        let mut g = grid(200, 200, 10);
        let marked = g.add_obstacle(&square(35, 10, 95, 70)).unwrap();
        assert_eq!(marked, g.count(CellState::Occupied));
        for (row, col) in g.occupied_cells().collect::<Vec<_>>() {
            let (x, y) = g.cell_origin(row, col);
            assert!(!g.is_valid(&Point::new(x as i32, y as i32)));
        }
    }

    #[test]
    fn test_malformed_obstacle_is_reported() {
        let sink = RecordingSink::new();
        let mut g = OccupancyGrid::new(WorkspaceBounds::new(100, 100), 10, sink.clone()).unwrap();
        let err = g.add_obstacle(&square(0, 0, 10, 10)[..3]).unwrap_err();

        assert_eq!(err, GridError::MalformedObstacle { corners: 3 });
        assert!(sink.contains(Level::Error, "4 corners"));
        assert_eq!(g.count(CellState::Occupied), 0);
    }

    #[test]
    fn test_obstacle_clipped_at_border() {
        let sink = RecordingSink::new();
        let mut g = OccupancyGrid::new(WorkspaceBounds::new(100, 100), 10, sink.clone()).unwrap();
        let marked = g.add_obstacle(&square(80, 80, 120, 90)).unwrap();

        assert_eq!(marked, 2 * 2);
        assert!(sink.count(Level::Warn) > 0);
    }

    #[test]
    fn test_visited_cells_stay_valid() {
        let mut g = grid(100, 100, 10);
        let p = Point::new(42, 17);
        g.mark_cell(&p, CellState::Visited).unwrap();
        assert_eq!(g.state_at(1, 4), Some(CellState::Visited));
        assert!(g.is_valid(&p));
    }

    #[test]
    fn test_mark_out_of_bounds_is_dropped() {
        let mut g = grid(100, 100, 10);
        let err = g.mark_cell(&Point::new(100, 5), CellState::Visited).unwrap_err();
        assert!(matches!(err, GridError::OutOfBounds { row: 0, col: 10, .. }));
        assert_eq!(g.count(CellState::Visited), 0);
    }

    #[test]
    fn test_real_valued_grid() {
        let mut g = OccupancyGrid::new(WorkspaceBounds::new(10.0, 5.0), 0.5, NullSink::shared()).unwrap();
        assert_eq!((g.rows(), g.cols()), (10, 20));
        g.add_obstacle(&[
            Point::new(1.0, 1.0),
            Point::new(2.0, 1.0),
            Point::new(2.0, 2.0),
            Point::new(1.0, 2.0),
        ])
        .unwrap();
        assert!(!g.is_valid(&Point::new(1.2, 1.7)));
        assert!(g.is_valid(&Point::new(0.9, 1.7)));
    }
}
