// Warehouse RRT planning
//
// Usage: warehouse_rrt [scenario.yaml]
// Without an argument the built-in two-column warehouse scenario is planned.
// RUST_LOG controls verbosity (default: info).

use std::env;
use std::error::Error;
use std::fs::{self, File};
use std::path::Path;
use std::process;
use std::time::Instant;

use env_logger::{Env, Target};
use log::{error, info, warn};

use warehouse_rrt::path_planning::path_length;
use warehouse_rrt::scenario::ScenarioConfig;
use warehouse_rrt::utils::{LogSink, PlannerPlot};

fn init_logger(log_file: Option<&Path>) -> std::io::Result<()> {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    if let Some(path) = log_file {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        builder.target(Target::Pipe(Box::new(File::create(path)?)));
    }
    builder.init();
    Ok(())
}

fn run(config: &ScenarioConfig) -> Result<(), Box<dyn Error>> {
    let started = Instant::now();
    let planner = config.build_planner(LogSink::shared())?;
    info!(
        "sample budget: {:?}, time budget: {:?}, seed: {:?}",
        planner.config().max_iterations,
        planner.config().time_budget,
        planner.config().seed
    );

    let outcome = planner.run(config.planner.workers);
    info!("RRT completed in {} milliseconds.", started.elapsed().as_millis());

    let stats = outcome?;
    info!(
        "{} nodes from {} samples with {} worker(s); rejected {} too close, {} degenerate, {} blocked",
        stats.nodes,
        stats.samples,
        stats.workers,
        stats.rejected_too_close,
        stats.rejected_degenerate,
        stats.rejected_blocked
    );

    let path = planner.shortest_path()?;
    println!("path ({} waypoints, length {:.1}):", path.len(), path_length(&path));
    for point in &path {
        println!("  {}", point);
    }

    if config.plot.is_none() && !config.show_plot {
        return Ok(());
    }

    let mut plot = PlannerPlot::new("RRT Tree and Path");
    {
        let grid = planner.grid();
        let tree = planner.tree();
        plot.fit_grid(&*grid)
            .plot_obstacles(&*grid)
            .plot_tree(&*tree)
            .plot_start(planner.start())
            .plot_goal(planner.goal())
            .plot_path(&path);
    }

    if let Some(output) = &config.plot {
        let is_svg = output.extension().map_or(false, |ext| ext.eq_ignore_ascii_case("svg"));
        let output = output.to_string_lossy();
        let saved = if is_svg {
            plot.save_svg(&output, 800, 800)
        } else {
            plot.save_png(&output, 800, 800)
        };
        match saved {
            Ok(()) => info!("plot saved to {}", output),
            Err(e) => warn!("could not save plot: {}", e),
        }
    }
    if config.show_plot {
        if let Err(e) = plot.show() {
            warn!("could not open plot window: {}", e);
        }
    }
    Ok(())
}

fn main() {
    let config = match env::args().nth(1) {
        Some(path) => ScenarioConfig::load(&path),
        None => Ok(ScenarioConfig::warehouse_default()),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(2);
        }
    };

    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    if let Err(e) = init_logger(config.log_file_for_run(&stamp).as_deref()) {
        eprintln!("failed to open log file: {}", e);
        process::exit(2);
    }
    info!("logger initialized and ready to log");

    if let Err(e) = run(&config) {
        error!("planning failed: {}", e);
        process::exit(1);
    }
}
