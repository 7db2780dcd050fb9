//! Scenario descriptions loaded from YAML
//!
//! A scenario names the workspace, robot, endpoints, obstacles and run
//! parameters, and builds a ready-to-run planner from them.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::common::{ConfigError, Footprint, Point, SharedSink, WorkspaceBounds};
use crate::path_planning::concurrent_rrt::{ConcurrentRrtPlanner, PlannerConfig, PlannerSetup};

/// Workspace extent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    pub width: i32,
    pub height: i32,
}

/// Robot footprint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RobotConfig {
    pub length: i32,
    pub width: i32,
}

/// Run parameters for the planner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// `null` for no sample budget
    #[serde(default = "default_max_iterations")]
    pub max_iterations: Option<usize>,
    #[serde(default)]
    pub time_budget_ms: Option<u64>,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_workers() -> usize {
    1
}

fn default_max_iterations() -> Option<usize> {
    PlannerConfig::default().max_iterations
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            max_iterations: default_max_iterations(),
            time_budget_ms: None,
            seed: None,
        }
    }
}

/// Main scenario description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub workspace: WorkspaceConfig,
    pub robot: RobotConfig,
    pub start: [i32; 2],
    pub goal: [i32; 2],
    pub step_size: i32,
    #[serde(default)]
    pub planner: RunConfig,
    /// Add the two columns of warehouse shelves
    #[serde(default)]
    pub warehouse_shelves: bool,
    /// Extra rectangles, four corners each
    #[serde(default)]
    pub obstacles: Vec<Vec<[i32; 2]>>,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    /// Where to save the result plot; `.svg` saves SVG, anything else PNG
    #[serde(default)]
    pub plot: Option<PathBuf>,
    /// Open an interactive gnuplot window after planning
    #[serde(default)]
    pub show_plot: bool,
}

impl ScenarioConfig {
    /// 1000x1000 warehouse, 10x10 robot, (10, 10) to (950, 950), step 50, one worker.
    pub fn warehouse_default() -> Self {
        Self {
            workspace: WorkspaceConfig { width: 1000, height: 1000 },
            robot: RobotConfig { length: 10, width: 10 },
            start: [10, 10],
            goal: [950, 950],
            step_size: 50,
            planner: RunConfig::default(),
            warehouse_shelves: true,
            obstacles: Vec::new(),
            log_file: None,
            plot: None,
            show_plot: false,
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        Ok(serde_yaml::from_reader(file)?)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// The configured log file with `_<stamp>` appended to its stem, so each
    /// run writes its own file.
    pub fn log_file_for_run(&self, stamp: &str) -> Option<PathBuf> {
        self.log_file.as_ref().map(|path| {
            let stem = path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
            let mut name = format!("{}_{}", stem, stamp);
            if let Some(ext) = path.extension() {
                name.push('.');
                name.push_str(&ext.to_string_lossy());
            }
            path.with_file_name(name)
        })
    }

    pub fn planner_config(&self) -> PlannerConfig {
        PlannerConfig {
            max_iterations: self.planner.max_iterations,
            time_budget: self.planner.time_budget_ms.map(Duration::from_millis),
            seed: self.planner.seed,
            ..Default::default()
        }
    }

    /// Every obstacle this scenario places, shelves first.
    pub fn obstacle_corners(&self) -> Vec<Vec<Point<i32>>> {
        let shelves = self
            .warehouse_shelves
            .then(|| warehouse_shelves(self.workspace.width, self.workspace.height))
            .unwrap_or_default();

        shelves
            .into_iter()
            .map(|corners| corners.to_vec())
            .chain(
                self.obstacles
                    .iter()
                    .map(|corners| corners.iter().copied().map(Point::from).collect()),
            )
            .collect()
    }

    /// Grid and endpoints with all obstacles applied. Malformed obstacles are
    /// reported through `sink` and skipped.
    pub fn build_setup(&self, sink: SharedSink) -> Result<PlannerSetup<i32>, ConfigError> {
        let mut setup = PlannerSetup::new(
            WorkspaceBounds::new(self.workspace.width, self.workspace.height),
            Footprint::new(self.robot.length, self.robot.width),
            Point::from(self.start),
            Point::from(self.goal),
            self.step_size,
            sink,
        )?;
        let obstacles = self.obstacle_corners();
        setup.add_obstacles(obstacles.iter().map(Vec::as_slice));
        Ok(setup)
    }

    pub fn build_planner(&self, sink: SharedSink) -> Result<ConcurrentRrtPlanner<i32>, ConfigError> {
        let setup = self.build_setup(sink)?;
        Ok(ConcurrentRrtPlanner::new(setup, self.planner_config())?)
    }
}

/// Two columns of four shelves each.
///
/// Shelves are `width / 5` wide and `height / 10` tall with a `height / 10`
/// aisle between them. The first column starts at `x = width / 5`, the second
/// at `x = width - 2 * width / 5`.
pub fn warehouse_shelves(width: i32, height: i32) -> Vec<[Point<i32>; 4]> {
    let shelf_width = width / 5;
    let shelf_height = height / 10;
    let aisle = height / 10;

    [shelf_width, width - 2 * shelf_width]
        .into_iter()
        .flat_map(|x1| {
            (0..4).map(move |i| {
                let y1 = i * (shelf_height + aisle) + aisle;
                let y2 = y1 + shelf_height;
                [
                    Point::new(x1, y1),
                    Point::new(x1 + shelf_width, y1),
                    Point::new(x1 + shelf_width, y2),
                    Point::new(x1, y2),
                ]
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::grid_map::CellState;
    use crate::utils::logging::{NullSink, RecordingSink};
    use log::Level;

    #[test]
    fn test_warehouse_shelves_layout() {
        let shelves = warehouse_shelves(1000, 1000);
        assert_eq!(shelves.len(), 8);
        assert_eq!(shelves[0][0], Point::new(200, 100));
        assert_eq!(shelves[0][2], Point::new(400, 200));
        assert_eq!(shelves[3][0], Point::new(200, 700));
        assert_eq!(shelves[4][0], Point::new(600, 100));
        assert_eq!(shelves[7][2], Point::new(800, 800));
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
workspace: { width: 300, height: 200 }
robot: { length: 10, width: 8 }
start: [10, 10]
goal: [280, 180]
step_size: 30
planner:
  workers: 3
  seed: 42
obstacles:
  - [[100, 0], [120, 0], [120, 150], [100, 150]]
"#;
        let config = ScenarioConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.planner.workers, 3);
        assert_eq!(config.planner.max_iterations, Some(200_000));
        assert!(!config.warehouse_shelves);
        assert_eq!(config.obstacles.len(), 1);

        let planner_config = config.planner_config();
        assert_eq!(planner_config.seed, Some(42));
        assert!(planner_config.time_budget.is_none());
    }

    #[test]
    fn test_log_file_is_stamped_per_run() {
        let mut config = ScenarioConfig::warehouse_default();
        assert_eq!(config.log_file_for_run("20240101_120000"), None);

        config.log_file = Some(PathBuf::from("logs/warehouse_rrt.log"));
        assert_eq!(
            config.log_file_for_run("20240101_120000"),
            Some(PathBuf::from("logs/warehouse_rrt_20240101_120000.log"))
        );

        config.log_file = Some(PathBuf::from("run"));
        assert_eq!(config.log_file_for_run("1"), Some(PathBuf::from("run_1")));
    }

    #[test]
    fn test_parse_rejects_missing_fields() {
        let err = ScenarioConfig::from_yaml_str("workspace: { width: 10, height: 10 }").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_malformed_obstacle_is_skipped() {
        let mut config = ScenarioConfig::warehouse_default();
        config.warehouse_shelves = false;
        config.obstacles = vec![
            vec![[100, 100], [200, 100], [200, 200]],
            vec![[300, 300], [350, 300], [350, 350], [300, 350]],
        ];
        let sink = RecordingSink::new();
        let setup = config.build_setup(sink.clone()).unwrap();

        assert!(sink.contains(Level::Error, "4 corners"));
        assert_eq!(setup.grid().count(CellState::Occupied), 6 * 6);
    }

    #[test]
    fn test_default_scenario_builds() {
        let planner = ScenarioConfig::warehouse_default()
            .build_planner(NullSink::shared())
            .unwrap();
        assert_eq!(planner.start(), Point::new(10, 10));
        assert_eq!(planner.goal(), Point::new(950, 950));
        // 8 shelves of 21x11 sampled cells each.
        assert_eq!(planner.grid().count(CellState::Occupied), 8 * 21 * 11);
    }
}
