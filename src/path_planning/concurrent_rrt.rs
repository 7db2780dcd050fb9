//! Multi-threaded RRT (Rapidly-exploring Random Tree) planner
//!
//! A fixed pool of worker threads grows one shared tree over an occupancy
//! grid. Each worker loops:
//!
//! 1. sample a point uniformly over the workspace,
//! 2. find the nearest tree node under the tree lock, then release it,
//! 3. discard samples within one cell of that node on both axes,
//! 4. clamp the sample to `step_size` from the node,
//! 5. walk the segment in cell-sized sub-steps against the grid,
//! 6. re-take the tree lock, insert the node and mark its cell visited,
//! 7. stop everyone once a node lands within goal tolerance.
//!
//! The nearest lookup and the insert are separate critical sections, so two
//! workers may extend the same node with near-duplicate children. Parent links
//! stay consistent because the tree is append-only.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard};
use std::thread;
use std::time::{Duration, Instant};

use log::Level;
use nalgebra::Vector2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Uniform;

use crate::common::{
    Coordinate, Footprint, GridError, PlannerError, PlannerResult, Point, SamplingPlanner, SharedSink,
    WorkspaceBounds,
};
use crate::path_planning::path_extractor::extract_path;
use crate::path_planning::search_tree::{NodeId, SearchTree};
use crate::utils::grid_map::{CellState, OccupancyGrid};

const TARGET: &str = "warehouse_rrt::planner";

/// Configuration for the concurrent RRT planner
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Samples drawn across all workers before giving up
    pub max_iterations: Option<usize>,
    /// Wall-clock budget for one run
    pub time_budget: Option<Duration>,
    /// Worker `i` seeds its generator with `seed + i`; entropy when unset
    pub seed: Option<u64>,
    /// Goal tolerance as a multiple of the cell size
    pub goal_tolerance_factor: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_iterations: Some(200_000),
            time_budget: None,
            seed: None,
            goal_tolerance_factor: 1.5,
        }
    }
}

/// Workspace, robot and endpoints, with the grid built and ready for obstacles.
pub struct PlannerSetup<T> {
    grid: OccupancyGrid<T>,
    start: Point<T>,
    goal: Point<T>,
    step_size: T,
    sink: SharedSink,
}

impl<T: Coordinate> PlannerSetup<T> {
    pub fn new(
        bounds: WorkspaceBounds<T>,
        footprint: Footprint<T>,
        start: Point<T>,
        goal: Point<T>,
        step_size: T,
        sink: SharedSink,
    ) -> PlannerResult<Self> {
        emit!(sink, TARGET, Level::Info, "initializing setup...");

        if !(step_size.to_f64() > 0.0) {
            return Err(PlannerError::InvalidParameter(format!(
                "step size must be positive, got {}",
                step_size
            )));
        }
        let grid = OccupancyGrid::new(bounds, footprint.cell_size(), sink.clone())?;
        if let Err(err) = grid.cell_index(&start) {
            return Err(PlannerError::InvalidParameter(format!("start point {} is outside the workspace: {}", start, err)));
        }
        if grid.cell_index(&goal).is_err() {
            return Err(PlannerError::InvalidParameter(format!("goal point {} is outside the workspace", goal)));
        }

        emit!(sink, TARGET, Level::Debug, "workspace: {}x{}", bounds.width, bounds.height);
        emit!(sink, TARGET, Level::Debug, "start point: {}, target point: {}", start, goal);
        emit!(sink, TARGET, Level::Debug, "robot length: {}, robot width: {}", footprint.length, footprint.width);
        emit!(sink, TARGET, Level::Debug, "step size: {}, unit cell size: {}", step_size, footprint.cell_size());
        emit!(sink, TARGET, Level::Info, "setup complete");

        Ok(Self {
            grid,
            start,
            goal,
            step_size,
            sink,
        })
    }

    /// Rasterises one rectangular obstacle given by its four corners.
    pub fn add_obstacle(&mut self, corners: &[Point<T>]) -> Result<usize, GridError> {
        self.grid.add_obstacle(corners)
    }

    /// Adds every well-formed obstacle and returns how many were accepted.
    /// Malformed ones are reported by the grid and skipped.
    pub fn add_obstacles<'a, I>(&mut self, obstacles: I) -> usize
    where
        I: IntoIterator<Item = &'a [Point<T>]>,
    {
        obstacles
            .into_iter()
            .filter(|corners| self.grid.add_obstacle(corners).is_ok())
            .count()
    }

    pub fn grid(&self) -> &OccupancyGrid<T> {
        &self.grid
    }

    pub fn start(&self) -> Point<T> {
        self.start
    }

    pub fn goal(&self) -> Point<T> {
        self.goal
    }
}

/// Counters gathered over one run.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanStats {
    pub workers: usize,
    /// Tree size including the root
    pub nodes: usize,
    pub samples: usize,
    pub rejected_too_close: usize,
    pub rejected_degenerate: usize,
    pub rejected_blocked: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunStatus {
    Idle,
    Running,
    GoalReached,
    BudgetExhausted,
}

impl RunStatus {
    fn is_terminal(self) -> bool {
        matches!(self, RunStatus::GoalReached | RunStatus::BudgetExhausted)
    }
}

#[derive(Debug)]
struct RunState {
    status: RunStatus,
    live_workers: usize,
    workers: usize,
    elapsed: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    TooClose,
    Degenerate,
    Blocked,
}

enum Extension<T> {
    Added(NodeId, Point<T>),
    Rejected(Rejection),
}

/// Concurrent RRT planner over an occupancy grid
pub struct ConcurrentRrtPlanner<T> {
    config: PlannerConfig,
    bounds: WorkspaceBounds<T>,
    start: Point<T>,
    goal: Point<T>,
    step_size: f64,
    cell_size: f64,
    goal_tolerance: f64,
    tree: Mutex<SearchTree<T>>,
    grid: RwLock<OccupancyGrid<T>>,
    samples: AtomicUsize,
    rejected: [AtomicUsize; 3],
    state: Mutex<RunState>,
    finished: Condvar,
    sink: SharedSink,
}

impl<T: Coordinate> ConcurrentRrtPlanner<T> {
    /// Roots the tree at the start point and marks its cell visited.
    pub fn new(setup: PlannerSetup<T>, config: PlannerConfig) -> PlannerResult<Self> {
        let PlannerSetup {
            mut grid,
            start,
            goal,
            step_size,
            sink,
            ..
        } = setup;

        if !grid.is_valid(&start) {
            return Err(PlannerError::InvalidParameter(format!("start point {} lies inside an obstacle", start)));
        }
        if !grid.is_valid(&goal) {
            emit!(sink, TARGET, Level::Warn, "target point {} lies inside an obstacle", goal);
        }
        if !(config.goal_tolerance_factor > 0.0) {
            return Err(PlannerError::InvalidParameter(format!(
                "goal tolerance factor must be positive, got {}",
                config.goal_tolerance_factor
            )));
        }
        grid.mark_cell(&start, CellState::Visited)?;

        let cell_size = grid.cell_size().to_f64();
        Ok(Self {
            bounds: grid.bounds(),
            start,
            goal,
            step_size: step_size.to_f64(),
            cell_size,
            goal_tolerance: config.goal_tolerance_factor * cell_size,
            config,
            tree: Mutex::new(SearchTree::new(start)),
            grid: RwLock::new(grid),
            samples: AtomicUsize::new(0),
            rejected: Default::default(),
            state: Mutex::new(RunState {
                status: RunStatus::Idle,
                live_workers: 0,
                workers: 0,
                elapsed: Duration::ZERO,
            }),
            finished: Condvar::new(),
            sink,
        })
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn start(&self) -> Point<T> {
        self.start
    }

    pub fn goal(&self) -> Point<T> {
        self.goal
    }

    pub fn goal_tolerance(&self) -> f64 {
        self.goal_tolerance
    }

    pub fn node_count(&self) -> usize {
        self.tree().len()
    }

    /// Read access to the tree, for visualization and inspection after a run.
    ///
    /// The guard holds the tree lock: drop it before calling `run`,
    /// `node_count` or `shortest_path` on the same thread.
    pub fn tree(&self) -> MutexGuard<'_, SearchTree<T>> {
        self.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn grid(&self) -> RwLockReadGuard<'_, OccupancyGrid<T>> {
        self.grid.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hands the finished tree and grid to the caller.
    pub fn into_parts(self) -> (SearchTree<T>, OccupancyGrid<T>) {
        (
            self.tree.into_inner().unwrap_or_else(PoisonError::into_inner),
            self.grid.into_inner().unwrap_or_else(PoisonError::into_inner),
        )
    }

    /// Grows the tree with `workers` threads until the goal is reached or a
    /// budget runs out. Blocks until every worker has stopped.
    ///
    /// A planner runs once; calling `run` again reports the first outcome.
    pub fn run(&self, workers: usize) -> PlannerResult<PlanStats> {
        if workers == 0 {
            return Err(PlannerError::InvalidParameter("worker count must be at least 1".to_string()));
        }
        {
            let mut state = self.lock_state()?;
            match state.status {
                RunStatus::Idle => {
                    state.status = RunStatus::Running;
                    state.live_workers = workers;
                    state.workers = workers;
                }
                RunStatus::Running => {
                    return Err(PlannerError::InvalidParameter("planner is already running".to_string()));
                }
                _ => {
                    drop(state);
                    return self.outcome();
                }
            }
        }

        emit!(self.sink, TARGET, Level::Info, "starting {} worker(s)", workers);
        let started = Instant::now();

        let joined = thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|worker_id| scope.spawn(move || self.worker(worker_id, started)))
                .collect();

            let waited = self.wait_for_termination();
            let panicked = handles.into_iter().filter_map(|h| h.join().err()).count();
            (waited, panicked)
        });

        let elapsed = started.elapsed();
        match joined {
            (Err(err), _) => return Err(err),
            (Ok(_), panicked) if panicked > 0 => {
                emit!(self.sink, TARGET, Level::Error, "{} worker(s) panicked", panicked);
                return Err(PlannerError::LockPoisoned("worker thread panicked"));
            }
            _ => {}
        }
        self.lock_state()?.elapsed = elapsed;
        emit!(self.sink, TARGET, Level::Info, "all workers joined after {:?}", elapsed);
        self.outcome()
    }

    /// Root-to-goal path through the finished tree.
    pub fn shortest_path(&self) -> PlannerResult<Vec<Point<T>>> {
        let tree = self.lock_tree()?;
        match extract_path(&tree, &self.goal, self.goal_tolerance) {
            Ok(path) => {
                emit!(self.sink, TARGET, Level::Info, "extracted path with {} waypoints", path.len());
                Ok(path)
            }
            Err(err) => {
                emit!(self.sink, TARGET, Level::Error, "target node not reachable: {}", err);
                Err(err)
            }
        }
    }

    fn outcome(&self) -> PlannerResult<PlanStats> {
        let (status, workers, elapsed) = {
            let state = self.lock_state()?;
            (state.status, state.workers, state.elapsed)
        };
        let stats = PlanStats {
            workers,
            nodes: self.lock_tree()?.len(),
            samples: self.samples.load(Ordering::Acquire),
            rejected_too_close: self.rejected_count(Rejection::TooClose),
            rejected_degenerate: self.rejected_count(Rejection::Degenerate),
            rejected_blocked: self.rejected_count(Rejection::Blocked),
            elapsed,
        };
        match status {
            RunStatus::GoalReached => Ok(stats),
            _ => Err(PlannerError::NoPathFound {
                iterations: stats.samples,
                nodes: stats.nodes,
            }),
        }
    }

    fn wait_for_termination(&self) -> PlannerResult<RunStatus> {
        let state = self.lock_state()?;
        let state = self
            .finished
            .wait_while(state, |s| !s.status.is_terminal() && s.live_workers > 0)
            .map_err(|_| PlannerError::LockPoisoned("run state"))?;
        if state.status.is_terminal() {
            Ok(state.status)
        } else {
            Err(PlannerError::LockPoisoned("all workers stopped before termination"))
        }
    }

    fn worker(&self, worker_id: usize, started: Instant) {
        let _exit = WorkerExit { planner: self };
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(worker_id as u64)),
            None => StdRng::from_entropy(),
        };
        let sample_x = Uniform::new(0.0, self.bounds.width.to_f64());
        let sample_y = Uniform::new(0.0, self.bounds.height.to_f64());

        emit!(self.sink, TARGET, Level::Debug, "worker {} started running", worker_id);

        while !self.is_terminated() {
            if !self.take_sample(started) {
                emit!(self.sink, TARGET, Level::Warn, "worker {}: planning budget exhausted", worker_id);
                self.signal(RunStatus::BudgetExhausted);
                break;
            }

            let sample = Point::new(T::from_f64(rng.sample(&sample_x)), T::from_f64(rng.sample(&sample_y)));
            emit!(self.sink, TARGET, Level::Trace, "worker {}: sampled point {}", worker_id, sample);

            match self.extend(worker_id, sample) {
                Ok(Extension::Added(id, point)) => {
                    if point.distance(&self.goal) < self.goal_tolerance {
                        emit!(self.sink, TARGET, Level::Info, "worker {}: target reached at node {}", worker_id, id.index());
                        self.signal(RunStatus::GoalReached);
                    }
                }
                Ok(Extension::Rejected(reason)) => {
                    self.rejected[reason as usize].fetch_add(1, Ordering::Relaxed);
                }
                Err(err) => {
                    emit!(self.sink, TARGET, Level::Error, "worker {} stopping: {}", worker_id, err);
                    break;
                }
            }
        }

        emit!(self.sink, TARGET, Level::Debug, "worker {} stopped", worker_id);
    }

    /// Claims one sample from the shared budget.
    fn take_sample(&self, started: Instant) -> bool {
        if matches!(self.config.time_budget, Some(budget) if started.elapsed() >= budget) {
            return false;
        }
        match self.config.max_iterations {
            Some(max) => self
                .samples
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < max).then_some(n + 1))
                .is_ok(),
            None => {
                self.samples.fetch_add(1, Ordering::AcqRel);
                true
            }
        }
    }

    fn extend(&self, worker_id: usize, sample: Point<T>) -> PlannerResult<Extension<T>> {
        let (nearest_id, nearest) = {
            let tree = self.lock_tree()?;
            let (id, _) = tree.nearest(&sample);
            (id, tree.point(id))
        };

        let offset = nearest.offset_to(&sample);
        if offset.x.abs() < self.cell_size && offset.y.abs() < self.cell_size {
            emit!(self.sink, TARGET, Level::Trace, "worker {}: random point too close to nearest node", worker_id);
            return Ok(Extension::Rejected(Rejection::TooClose));
        }

        let mut candidate = sample;
        if self.steer(&nearest, &mut candidate).is_none() {
            return Ok(Extension::Rejected(Rejection::Degenerate));
        }
        if !self.segment_is_clear(&nearest, &candidate)? {
            return Ok(Extension::Rejected(Rejection::Blocked));
        }

        let id = {
            let mut tree = self.lock_tree()?;
            let mut grid = self.grid.write().map_err(|_| PlannerError::LockPoisoned("occupancy grid"))?;
            if !grid.is_valid(&candidate) {
                return Ok(Extension::Rejected(Rejection::Blocked));
            }
            let id = tree.insert(nearest_id, candidate)?;
            grid.mark_cell(&candidate, CellState::Visited)?;
            id
        };

        emit!(self.sink, TARGET, Level::Debug, "worker {}: added point {} at {}", worker_id, id.index(), candidate);
        Ok(Extension::Added(id, candidate))
    }

    /// Pulls `sample` onto the segment from `from` so that it lies at most
    /// `step_size` away. Returns the resulting distance, or `None` when the
    /// two points coincide.
    fn steer(&self, from: &Point<T>, sample: &mut Point<T>) -> Option<f64> {
        let offset = from.offset_to(sample);
        let distance = offset.norm();
        if distance == 0.0 || !distance.is_finite() {
            return None;
        }

        if distance > self.step_size {
            let clamped = from.to_vector() + offset * (self.step_size / distance);
            sample.set_x(T::from_f64(clamped.x));
            sample.set_y(T::from_f64(clamped.y));
            emit!(self.sink, TARGET, Level::Trace, "modified random point to {}", sample);
        }

        let distance = from.distance(sample);
        (distance > 0.0).then_some(distance)
    }

    /// Walks `from -> to` in `floor(distance / cell)` equal sub-steps and checks
    /// every sub-point that is at least one cell away from `from` on some axis.
    /// Segments shorter than a cell are a single check of `to`.
    fn segment_is_clear(&self, from: &Point<T>, to: &Point<T>) -> PlannerResult<bool> {
        let grid = self.grid.read().map_err(|_| PlannerError::LockPoisoned("occupancy grid"))?;

        let offset = from.offset_to(to);
        let steps = (offset.norm() / self.cell_size).floor() as usize;
        if steps == 0 {
            return Ok(grid.is_valid(to));
        }

        let origin = from.to_vector();
        let increment: Vector2<f64> = offset / steps as f64;
        for i in 1..=steps {
            let delta = increment * i as f64;
            if delta.x.abs() < self.cell_size && delta.y.abs() < self.cell_size {
                continue;
            }
            let probe = origin + delta;
            if !grid.is_valid_at(probe.x, probe.y) {
                emit!(self.sink, TARGET, Level::Debug, "path blocked at ({:.1}, {:.1})", probe.x, probe.y);
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn is_terminated(&self) -> bool {
        self.state
            .lock()
            .map(|s| s.status.is_terminal())
            .unwrap_or(true)
    }

    /// Records a terminal status and wakes the coordinator. A goal reached by
    /// a worker still committing its last sample overrides budget exhaustion.
    fn signal(&self, status: RunStatus) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let overrides = match state.status {
            RunStatus::GoalReached => false,
            RunStatus::BudgetExhausted => status == RunStatus::GoalReached,
            RunStatus::Idle | RunStatus::Running => true,
        };
        if overrides {
            state.status = status;
        }
        self.finished.notify_all();
        emit!(self.sink, TARGET, Level::Debug, "notified all workers ({:?})", state.status);
    }

    fn rejected_count(&self, reason: Rejection) -> usize {
        self.rejected[reason as usize].load(Ordering::Relaxed)
    }

    fn lock_tree(&self) -> PlannerResult<MutexGuard<'_, SearchTree<T>>> {
        self.tree.lock().map_err(|_| PlannerError::LockPoisoned("search tree"))
    }

    fn lock_state(&self) -> PlannerResult<MutexGuard<'_, RunState>> {
        self.state.lock().map_err(|_| PlannerError::LockPoisoned("run state"))
    }
}

/// Decrements the live-worker count however a worker leaves its loop.
struct WorkerExit<'a, T> {
    planner: &'a ConcurrentRrtPlanner<T>,
}

impl<T> Drop for WorkerExit<'_, T> {
    fn drop(&mut self) {
        let mut state = self.planner.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.live_workers = state.live_workers.saturating_sub(1);
        self.planner.finished.notify_all();
    }
}

impl<T: Coordinate> SamplingPlanner<T> for ConcurrentRrtPlanner<T> {
    fn plan(&self, workers: usize) -> PlannerResult<Vec<Point<T>>> {
        self.run(workers)?;
        self.shortest_path()
    }

    fn set_max_iterations(&mut self, max_iter: Option<usize>) {
        self.config.max_iterations = max_iter;
    }
}
