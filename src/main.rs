//! GA-TSP Solver - Command Line Interface
//!
//! Solves the TSP with a fixed anchor city using a genetic algorithm.

use clap::{Args, Parser, Subcommand};
use ga_tsp_solver::baseline::nearest_neighbor;
use ga_tsp_solver::benchmark::{Benchmark, BenchmarkConfig};
use ga_tsp_solver::genetic::settings::max_distinct_tour_scores;
use ga_tsp_solver::genetic::{Checkpoint, Deadline, GeneticSolver, SeededRandom, Settings, Step, Unbounded};
use ga_tsp_solver::instance::{TspInstance, DEFAULT_EXTENT};
use ga_tsp_solver::solution::Solution;
use ga_tsp_solver::SolveError;
use ga_tsp_solver::visualization::Visualizer;
use indicatif::{ProgressBar, ProgressStyle};

use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "ga-tsp-solver")]
#[command(version = "1.0")]
#[command(about = "Genetic algorithm solver for the TSP with a fixed anchor city")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve one instance
    Solve {
        #[command(flatten)]
        source: InstanceArgs,

        #[command(flatten)]
        ga: GaArgs,

        /// Random seed (non-zero)
        #[arg(short, long, default_value = "1")]
        seed: u64,

        /// Seed word or phrase, hashed to a seed; overrides --seed
        #[arg(long)]
        seed_phrase: Option<String>,

        /// Time limit in seconds. Reaching it aborts the solve without a
        /// result; it does not return the best tour found so far.
        #[arg(short, long)]
        time_limit: Option<f64>,

        /// Output solution to file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Generate SVG/PNG of the tour and the convergence curve
        #[arg(long)]
        visualize: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Run repeated seeded solves on one instance
    Benchmark {
        #[command(flatten)]
        source: InstanceArgs,

        #[command(flatten)]
        ga: GaArgs,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Number of runs
        #[arg(short, long, default_value = "10")]
        runs: usize,

        /// Seed of the first run
        #[arg(long, default_value = "1")]
        first_seed: u64,

        /// Time limit per run
        #[arg(short, long)]
        time_limit: Option<f64>,

        /// Run seeds one after another instead of in parallel
        #[arg(long)]
        sequential: bool,
    },

    /// Analyze an instance
    Analyze {
        #[command(flatten)]
        source: InstanceArgs,
    },

    /// Write a random city file
    Generate {
        /// Number of cities, anchor included
        #[arg(short = 'n', long, default_value = "20")]
        cities: usize,

        /// Placement seed
        #[arg(short, long, default_value = "1")]
        seed: u64,

        /// Cities are placed in [-extent, extent)^2
        #[arg(long, default_value_t = DEFAULT_EXTENT)]
        extent: f64,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// Where the cities come from
#[derive(Args)]
struct InstanceArgs {
    /// Path to a TSP-LIB style city file (last city is the anchor)
    #[arg(short, long)]
    instance: Option<PathBuf>,

    /// Number of random cities when no file is given
    #[arg(short = 'n', long, default_value = "20")]
    cities: usize,

    /// Placement seed for random cities
    #[arg(long, default_value = "1")]
    instance_seed: u64,
}

/// Genetic algorithm settings; flags override the settings file
#[derive(Args)]
struct GaArgs {
    /// JSON settings file
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Gene pool size
    #[arg(long)]
    chromosomes: Option<usize>,

    /// Elite share in percent
    #[arg(long)]
    parents: Option<f64>,

    /// Crossover probability in percent
    #[arg(long)]
    mpc: Option<f64>,

    /// Multi-swap mutation probability in percent
    #[arg(long)]
    multi_mutation: Option<f64>,

    /// Per-gene swap probability inside multi-swap mutation, in percent
    #[arg(long)]
    gene_mutation: Option<f64>,

    /// Stop once the best score is below this percentage of the start
    #[arg(long)]
    stop_at: Option<f64>,

    /// Stop after this many generations without improvement
    #[arg(long)]
    stagnation: Option<usize>,

    /// Allow single mutations that swap a gene with itself
    #[arg(long)]
    no_assured_mutation: bool,

    /// Give up after this many rejected starting populations
    #[arg(long)]
    max_restarts: Option<usize>,
}

impl InstanceArgs {
    fn load(&self) -> TspInstance {
        let loaded = match &self.instance {
            Some(path) => TspInstance::from_file(path),
            None => TspInstance::random(self.cities, self.instance_seed, DEFAULT_EXTENT),
        };
        match loaded {
            Ok(inst) => inst,
            Err(e) => {
                eprintln!("Error loading instance: {}", e);
                std::process::exit(1);
            }
        }
    }

    /// Base path for files derived from the instance
    fn stem(&self, instance: &TspInstance) -> PathBuf {
        match &self.instance {
            Some(path) => path.clone(),
            None => PathBuf::from(&instance.name),
        }
    }
}

impl GaArgs {
    fn settings(&self, number_of_cities: usize) -> Settings {
        let mut settings = match &self.settings {
            Some(path) => match Settings::from_json_file(path) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("Error loading settings: {}", e);
                    std::process::exit(1);
                }
            },
            None => Settings::default(),
        };

        settings.number_of_cities = number_of_cities;
        if let Some(v) = self.chromosomes {
            settings.number_of_chromosomes = v;
        }
        if let Some(v) = self.parents {
            settings.percentage_parents = v;
        }
        if let Some(v) = self.mpc {
            settings.mpc_probability = v;
        }
        if let Some(v) = self.multi_mutation {
            settings.multi_mutation_probability = v;
        }
        if let Some(v) = self.gene_mutation {
            settings.multi_mutation_mutation_probability = v;
        }
        if let Some(v) = self.stop_at {
            settings.percentage_of_initial_to_stop_at = v;
        }
        if let Some(v) = self.stagnation {
            settings.generations_without_progress_to_stop_at = v;
        }
        if self.no_assured_mutation {
            settings.assured_mutation = false;
        }
        if self.max_restarts.is_some() {
            settings.max_restarts = self.max_restarts;
        }

        if let Err(e) = settings.validate() {
            eprintln!("Invalid settings: {}", e);
            std::process::exit(1);
        }
        settings
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Solve {
            source,
            ga,
            seed,
            seed_phrase,
            time_limit,
            output,
            visualize,
            verbose,
        } => {
            solve_instance(&source, &ga, seed, seed_phrase, time_limit, output, visualize, verbose);
        }

        Commands::Benchmark {
            source,
            ga,
            output,
            runs,
            first_seed,
            time_limit,
            sequential,
        } => {
            run_benchmark(&source, &ga, &output, runs, first_seed, time_limit, sequential);
        }

        Commands::Analyze { source } => {
            analyze_instance(&source);
        }

        Commands::Generate {
            cities,
            seed,
            extent,
            output,
        } => {
            generate_instance(cities, seed, extent, &output);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn solve_instance(
    source: &InstanceArgs,
    ga: &GaArgs,
    seed: u64,
    seed_phrase: Option<String>,
    time_limit: Option<f64>,
    output: Option<PathBuf>,
    visualize: bool,
    verbose: bool,
) {
    let instance = source.load();
    let settings = ga.settings(instance.dimension());

    if verbose {
        println!("{}", instance.statistics());
        println!("{:#?}", settings);
    }

    let rng = match &seed_phrase {
        Some(phrase) => SeededRandom::from_phrase(phrase),
        None => match SeededRandom::new(seed) {
            Ok(rng) => rng,
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
    };
    println!("Solving {} (n={}) with seed {}...", instance.name, instance.dimension(), rng.seed());

    let mut solver = match GeneticSolver::new(settings, instance.clone(), rng) {
        Ok(solver) => solver,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let mut checkpoint: Box<dyn Checkpoint> = match time_limit {
        Some(seconds) => Box::new(Deadline::after_secs(seconds)),
        None => Box::new(Unbounded),
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));

    let report = loop {
        match solver.step(&mut checkpoint) {
            Ok(Step::Searching { attempts }) => {
                spinner.set_message(format!("searching for a starting population (attempt {})", attempts));
            }
            Ok(Step::Evolving { generation, best_score }) => {
                spinner.set_message(format!(
                    "generation {}  best {:.4}  ({:.2}% of start)",
                    generation,
                    best_score,
                    solver.percentage_of_initial()
                ));
            }
            Ok(Step::Finished(report)) => break report,
            Err(SolveError::Cancelled { generation }) => {
                spinner.finish_and_clear();
                eprintln!(
                    "Time limit reached at generation {}; the solve was aborted without a result",
                    generation
                );
                std::process::exit(1);
            }
            Err(e) => {
                spinner.finish_and_clear();
                eprintln!("Solve failed: {}", e);
                std::process::exit(1);
            }
        }
    };
    spinner.finish_and_clear();

    let solution = Solution::from_report(&instance, &report);
    let baseline = nearest_neighbor(&instance);

    println!("\n========== Results ==========");
    println!("Best length: {:.4}", report.best_score);
    println!("Start length: {:.4}", report.score_at_start);
    println!("Percentage of initial: {:.2}%", report.percentage_of_initial);
    println!(
        "Generations: {} ({} total, stopped: {})",
        report.generations, report.total_generations, report.stop_reason
    );
    println!("Restarts: {}", report.restarts);
    println!("Time: {:.2} ms", report.elapsed_ms);
    if baseline.cost > 0.0 {
        println!(
            "Nearest neighbour: {:.4} (GA gap {:+.2}%)",
            baseline.cost,
            (report.best_score - baseline.cost) / baseline.cost * 100.0
        );
    }

    if verbose {
        println!("\n{}", solution);
    }

    if let Some(out_path) = output {
        match solution.save_json(&out_path) {
            Ok(()) => println!("\nSolution saved to {:?}", out_path),
            Err(e) => {
                eprintln!("Failed to write output: {}", e);
                std::process::exit(1);
            }
        }
    }

    if visualize {
        let viz = Visualizer::new();
        let stem = source.stem(&instance);

        let svg = viz.generate_svg(&instance, &solution);
        save_figure(&viz, &svg, &stem.with_extension("png"), &stem.with_extension("svg"));

        let convergence = viz.generate_convergence_svg(&report.history, &instance.name);
        save_figure(
            &viz,
            &convergence,
            &stem.with_extension("convergence.png"),
            &stem.with_extension("convergence.svg"),
        );

        let data_path = stem.with_extension("dat");
        match std::fs::write(&data_path, viz.export_plot_data(&instance, &solution)) {
            Ok(()) => println!("Plot data saved to {:?}", data_path),
            Err(e) => eprintln!("Failed to save plot data: {}", e),
        }
    }
}

/// Save as PNG, falling back to SVG when no converter works
fn save_figure(viz: &Visualizer, svg: &str, png_path: &Path, svg_path: &Path) {
    match viz.save_png(svg, png_path) {
        Ok(()) => println!("Visualization saved to {:?}", png_path),
        Err(e) => match viz.save_svg(svg, svg_path) {
            Ok(()) => println!("PNG conversion failed ({}). Saved SVG to {:?}", e, svg_path),
            Err(e) => eprintln!("Failed to save SVG: {}", e),
        },
    }
}

fn run_benchmark(
    source: &InstanceArgs,
    ga: &GaArgs,
    output: &Path,
    runs: usize,
    first_seed: u64,
    time_limit: Option<f64>,
    sequential: bool,
) {
    let instance = source.load();
    let settings = ga.settings(instance.dimension());

    println!("Benchmarking {} (n={}) with {} runs...", instance.name, instance.dimension(), runs);

    if let Err(e) = std::fs::create_dir_all(output) {
        eprintln!("Failed to create output directory: {}", e);
        std::process::exit(1);
    }

    let config = BenchmarkConfig {
        runs,
        first_seed,
        time_limit,
        parallel: !sequential,
        output_dir: output.to_string_lossy().to_string(),
    };

    let mut benchmark = Benchmark::new(config, settings);

    let progress = ProgressBar::new(runs as u64);
    progress.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40} {pos}/{len} runs")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    benchmark.run_with_progress(&instance, || progress.inc(1));
    progress.finish_and_clear();

    let results_path = output.join("results.csv");
    if let Err(e) = benchmark.export_to_csv(&results_path) {
        eprintln!("Failed to export results: {}", e);
        std::process::exit(1);
    }
    println!("\nResults exported to {:?}", results_path);

    let stats_path = output.join("statistics.csv");
    if let Err(e) = benchmark.export_statistics_csv(&stats_path) {
        eprintln!("Failed to export statistics: {}", e);
        std::process::exit(1);
    }
    println!("Statistics exported to {:?}", stats_path);

    let report = benchmark.generate_report();
    println!("\n{}", report);

    let report_path = output.join("report.txt");
    match std::fs::write(&report_path, &report) {
        Ok(()) => println!("Report saved to {:?}", report_path),
        Err(e) => eprintln!("Failed to save report: {}", e),
    }
}

fn analyze_instance(source: &InstanceArgs) {
    let instance = source.load();

    println!("========== Instance Analysis ==========\n");
    println!("{}", instance.statistics());

    let length = instance.dimension().saturating_sub(1);
    println!("Chromosome:");
    println!("  Length: {}", length);
    println!("  Distinct tour lengths at most: {}", max_distinct_tour_scores(length));

    let defaults = Settings::for_cities(instance.dimension());
    match defaults.validate() {
        Ok(()) => println!("  Default settings: valid ({} parents)", defaults.number_of_parents()),
        Err(e) => println!("  Default settings: {}", e),
    }

    let nn = nearest_neighbor(&instance);
    println!("\nQuick Solution Estimate:");
    println!("  Nearest Neighbor: {:.4}", nn.cost);
    println!("  Tour: {:?}", nn.closed_tour());
}

fn generate_instance(cities: usize, seed: u64, extent: f64, output: &Path) {
    if cities == 0 {
        eprintln!("Need at least one city");
        std::process::exit(1);
    }

    let instance = match TspInstance::random(cities, seed, extent) {
        Ok(instance) => instance,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    match instance.save(output) {
        Ok(()) => println!("Wrote {} cities to {:?}", cities, output),
        Err(e) => {
            eprintln!("Failed to write instance: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_time_limit_help_says_it_aborts() {
        let mut cli = Cli::command();
        let solve = cli.find_subcommand_mut("solve").unwrap();
        let help = solve.render_long_help().to_string();
        assert!(help.contains("aborts the solve without a"));
    }

    #[test]
    fn test_cli_parses_solve_with_time_limit() {
        let cli = Cli::try_parse_from(["ga-tsp-solver", "solve", "-n", "12", "--time-limit", "0.5"]).unwrap();
        match cli.command {
            Commands::Solve { time_limit, .. } => assert_eq!(time_limit, Some(0.5)),
            _ => panic!("expected the solve subcommand"),
        }
    }
}
