//! Visualization of a finished planning run
//!
//! Draws obstacle cells, tree edges, start, goal and the extracted path with
//! gnuplot. Everything here reads planner output after the run.

use gnuplot::{AutoOption, AxesCommon, Caption, Color, Figure, LineWidth, PointSize, PointSymbol};

use crate::common::{Coordinate, Point};
use crate::path_planning::search_tree::SearchTree;
use crate::utils::grid_map::OccupancyGrid;

/// Color palette for consistent styling
pub mod colors {
    pub const OBSTACLE: &str = "#654321";
    pub const NODE: &str = "#008080";
    pub const EDGE: &str = "#006666";
    pub const START: &str = "#323232";
    pub const GOAL: &str = "#323232";
    pub const PATH: &str = "#000000";
}

#[derive(Debug, Clone)]
enum Layer {
    Lines {
        x: Vec<f64>,
        y: Vec<f64>,
        color: &'static str,
        width: f64,
        caption: Option<&'static str>,
    },
    Points {
        x: Vec<f64>,
        y: Vec<f64>,
        color: &'static str,
        symbol: char,
        size: f64,
        caption: &'static str,
    },
}

/// Accumulates layers and renders them onto one set of axes.
#[derive(Debug, Clone)]
pub struct PlannerPlot {
    title: String,
    x_range: Option<(f64, f64)>,
    y_range: Option<(f64, f64)>,
    layers: Vec<Layer>,
}

impl PlannerPlot {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            x_range: None,
            y_range: None,
            layers: Vec::new(),
        }
    }

    /// Fix both axis ranges to the workspace extent of `grid`.
    pub fn fit_grid<T: Coordinate>(&mut self, grid: &OccupancyGrid<T>) -> &mut Self {
        let bounds = grid.bounds();
        self.x_range = Some((0.0, bounds.width.to_f64()));
        self.y_range = Some((0.0, bounds.height.to_f64()));
        self
    }

    /// One square marker per occupied cell, at the cell centre.
    pub fn plot_obstacles<T: Coordinate>(&mut self, grid: &OccupancyGrid<T>) -> &mut Self {
        let half = grid.cell_size().to_f64() / 2.0;
        let (x, y): (Vec<f64>, Vec<f64>) = grid
            .occupied_cells()
            .map(|(row, col)| {
                let (x, y) = grid.cell_origin(row, col);
                (x + half, y + half)
            })
            .unzip();

        self.layers.push(Layer::Points {
            x,
            y,
            color: colors::OBSTACLE,
            symbol: 'S',
            size: 0.8,
            caption: "Obstacles",
        });
        self
    }

    /// Every tree edge as its own segment, plus a dot per node.
    pub fn plot_tree<T: Coordinate>(&mut self, tree: &SearchTree<T>) -> &mut Self {
        for (parent, child) in tree.edges() {
            self.layers.push(Layer::Lines {
                x: vec![parent.x().to_f64(), child.x().to_f64()],
                y: vec![parent.y().to_f64(), child.y().to_f64()],
                color: colors::EDGE,
                width: 1.0,
                caption: None,
            });
        }
        let (x, y) = split_xy(tree.iter().map(|(_, node)| node.point()));
        self.layers.push(Layer::Points {
            x,
            y,
            color: colors::NODE,
            symbol: 'O',
            size: 0.3,
            caption: "Tree",
        });
        self
    }

    pub fn plot_path<T: Coordinate>(&mut self, path: &[Point<T>]) -> &mut Self {
        let (x, y) = split_xy(path.iter().copied());
        self.layers.push(Layer::Lines {
            x,
            y,
            color: colors::PATH,
            width: 3.0,
            caption: Some("Path"),
        });
        self
    }

    pub fn plot_start<T: Coordinate>(&mut self, point: Point<T>) -> &mut Self {
        self.plot_marker(point, colors::START, "Start")
    }

    pub fn plot_goal<T: Coordinate>(&mut self, point: Point<T>) -> &mut Self {
        self.plot_marker(point, colors::GOAL, "Goal")
    }

    fn plot_marker<T: Coordinate>(&mut self, point: Point<T>, color: &'static str, caption: &'static str) -> &mut Self {
        self.layers.push(Layer::Points {
            x: vec![point.x().to_f64()],
            y: vec![point.y().to_f64()],
            color,
            symbol: 'O',
            size: 1.5,
            caption,
        });
        self
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Save plot to PNG file
    pub fn save_png(&self, path: &str, width: u32, height: u32) -> Result<(), String> {
        let mut figure = self.render();
        figure.save_to_png(path, width, height).map_err(|e| e.to_string())
    }

    /// Save plot to SVG file
    pub fn save_svg(&self, path: &str, width: u32, height: u32) -> Result<(), String> {
        let mut figure = self.render();
        figure.save_to_svg(path, width, height).map_err(|e| e.to_string())
    }

    /// Open an interactive gnuplot window
    pub fn show(&self) -> Result<(), String> {
        let mut figure = self.render();
        figure.show().map_err(|e| e.to_string()).map(|_| ())
    }

    fn render(&self) -> Figure {
        let mut figure = Figure::new();
        let axes = figure.axes2d();
        axes.set_title(&self.title, &[])
            .set_x_label("X", &[])
            .set_y_label("Y", &[])
            .set_aspect_ratio(AutoOption::Fix(1.0));
        if let Some((min, max)) = self.x_range {
            axes.set_x_range(AutoOption::Fix(min), AutoOption::Fix(max));
        }
        if let Some((min, max)) = self.y_range {
            axes.set_y_range(AutoOption::Fix(min), AutoOption::Fix(max));
        }

        for layer in &self.layers {
            match layer {
                Layer::Lines { x, y, color, width, caption: Some(caption) } => {
                    axes.lines(x, y, &[Caption(*caption), Color(*color), LineWidth(*width)]);
                }
                Layer::Lines { x, y, color, width, caption: None } => {
                    axes.lines(x, y, &[Color(*color), LineWidth(*width)]);
                }
                Layer::Points { x, y, color, symbol, size, caption } => {
                    axes.points(x, y, &[Caption(*caption), Color(*color), PointSymbol(*symbol), PointSize(*size)]);
                }
            }
        }
        figure
    }
}

fn split_xy<T: Coordinate>(points: impl Iterator<Item = Point<T>>) -> (Vec<f64>, Vec<f64>) {
    points.map(|p| (p.x().to_f64(), p.y().to_f64())).unzip()
}
