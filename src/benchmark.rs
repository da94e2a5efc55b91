//! Repeated seeded solves and their statistics.
//!
//! Each run is an independent single-threaded solve with its own seed. Runs
//! may execute in parallel; results are always reported in seed order.

use crate::baseline::nearest_neighbor;
use crate::error::SolveError;
use crate::genetic::{Deadline, GeneticSolver, SeededRandom, Settings, SolveReport, Unbounded};
use crate::instance::TspInstance;
use crate::solution::Solution;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median, Statistics};
use std::fs::File;
use std::path::Path;

/// Result of one seeded solve
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Seed of the random source
    pub seed: u64,
    /// Instance name
    pub instance: String,
    /// Number of cities, anchor included
    pub dimension: usize,
    /// Best tour length
    pub cost: f64,
    /// Best tour length of the starting population
    pub initial_cost: f64,
    /// `100 × cost / initial_cost`
    pub percentage_of_initial: f64,
    /// Generations with progress
    pub generations: usize,
    pub total_generations: usize,
    pub restarts: usize,
    /// Computation time in seconds
    pub time: f64,
    /// Gap to the nearest-neighbour tour in percent (negative is better)
    pub gap_to_baseline: f64,
    pub stop_reason: String,
}

/// A run that produced no result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunFailure {
    pub seed: u64,
    pub error: String,
}

/// Aggregated statistics over all successful runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkStatistics {
    pub instance: String,
    pub runs: usize,
    pub failures: usize,
    pub best_cost: f64,
    pub mean_cost: f64,
    pub median_cost: f64,
    pub worst_cost: f64,
    /// Sample standard deviation, zero for a single run
    pub std_cost: f64,
    pub mean_percentage_of_initial: f64,
    pub mean_generations: f64,
    pub mean_time: f64,
    pub baseline_cost: f64,
    pub mean_gap_to_baseline: f64,
}

/// Benchmark configuration
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Number of seeded runs
    pub runs: usize,
    /// Seed of the first run; later runs count up from it
    pub first_seed: u64,
    /// Wall-clock limit per run in seconds
    pub time_limit: Option<f64>,
    /// Run seeds in parallel
    pub parallel: bool,
    /// Output directory
    pub output_dir: String,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            runs: 10,
            first_seed: 1,
            time_limit: None,
            parallel: true,
            output_dir: "results".to_string(),
        }
    }
}

/// Benchmarking engine
pub struct Benchmark {
    config: BenchmarkConfig,
    settings: Settings,
    results: Vec<RunResult>,
    failures: Vec<RunFailure>,
    baseline: Option<Solution>,
}

impl Benchmark {
    pub fn new(config: BenchmarkConfig, settings: Settings) -> Self {
        Benchmark {
            config,
            settings,
            results: Vec::new(),
            failures: Vec::new(),
            baseline: None,
        }
    }

    /// Seeds of every run, in order
    pub fn seeds(&self) -> Vec<u64> {
        (0..self.config.runs as u64)
            .map(|i| self.config.first_seed.wrapping_add(i).max(1))
            .collect()
    }

    /// Run every seed on `instance`
    pub fn run(&mut self, instance: &TspInstance) {
        self.run_with_progress(instance, || {});
    }

    /// Run every seed on `instance`, calling `on_run` after each finishes
    pub fn run_with_progress<F>(&mut self, instance: &TspInstance, on_run: F)
    where
        F: Fn() + Sync,
    {
        log::info!(
            "Running benchmark on instance {} ({} runs)",
            instance.name,
            self.config.runs
        );

        let baseline = nearest_neighbor(instance);
        let seeds = self.seeds();
        let settings = &self.settings;
        let time_limit = self.config.time_limit;

        let solve_seed = |&seed: &u64| {
            let outcome = run_single(instance, settings, seed, time_limit);
            on_run();
            (seed, outcome)
        };

        let outcomes: Vec<(u64, Result<SolveReport, SolveError>)> = if self.config.parallel {
            seeds.par_iter().map(solve_seed).collect()
        } else {
            seeds.iter().map(solve_seed).collect()
        };

        for (seed, outcome) in outcomes {
            match outcome {
                Ok(report) => self.results.push(record(instance, &baseline, seed, &report)),
                Err(e) => {
                    log::warn!("Run with seed {} failed: {}", seed, e);
                    self.failures.push(RunFailure {
                        seed,
                        error: e.to_string(),
                    });
                }
            }
        }

        self.baseline = Some(baseline);
    }

    /// Statistics over the successful runs, `None` if there are none
    pub fn compute_statistics(&self) -> Option<BenchmarkStatistics> {
        let first = self.results.first()?;
        let baseline = self.baseline.as_ref()?;

        let costs: Vec<f64> = self.results.iter().map(|r| r.cost).collect();
        let percentages: Vec<f64> = self.results.iter().map(|r| r.percentage_of_initial).collect();
        let generations: Vec<f64> = self.results.iter().map(|r| r.generations as f64).collect();
        let times: Vec<f64> = self.results.iter().map(|r| r.time).collect();
        let gaps: Vec<f64> = self.results.iter().map(|r| r.gap_to_baseline).collect();

        let std_cost = if costs.len() < 2 {
            0.0
        } else {
            Statistics::std_dev(costs.iter())
        };

        Some(BenchmarkStatistics {
            instance: first.instance.clone(),
            runs: self.results.len(),
            failures: self.failures.len(),
            best_cost: Statistics::min(costs.iter()),
            mean_cost: Statistics::mean(costs.iter()),
            median_cost: Data::new(costs.clone()).median(),
            worst_cost: Statistics::max(costs.iter()),
            std_cost,
            mean_percentage_of_initial: Statistics::mean(percentages.iter()),
            mean_generations: Statistics::mean(generations.iter()),
            mean_time: Statistics::mean(times.iter()),
            baseline_cost: baseline.cost,
            mean_gap_to_baseline: Statistics::mean(gaps.iter()),
        })
    }

    /// Export per-run results to CSV
    pub fn export_to_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for result in &self.results {
            writer.serialize(result)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Export the aggregated statistics to CSV
    pub fn export_statistics_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        if let Some(stats) = self.compute_statistics() {
            writer.serialize(stats)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Generate summary report
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push_str("========================================\n");
        report.push_str("       GA-TSP Benchmark Report\n");
        report.push_str("========================================\n");
        report.push_str(&format!(
            "Generated: {}\n\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        ));

        report.push_str(&format!(
            "Settings: {} chromosomes, {}% parents, MPC {}%, multi-mutation {}% ({}% per gene), stop at {}% or {} stagnant generations\n\n",
            self.settings.number_of_chromosomes,
            self.settings.percentage_parents,
            self.settings.mpc_probability,
            self.settings.multi_mutation_probability,
            self.settings.multi_mutation_mutation_probability,
            self.settings.percentage_of_initial_to_stop_at,
            self.settings.generations_without_progress_to_stop_at,
        ));

        report.push_str("Runs:\n");
        report.push_str("-".repeat(80).as_str());
        report.push('\n');
        report.push_str(&format!(
            "{:<12} {:>12} {:>12} {:>8} {:>8} {:>10} {:>10}\n",
            "Seed", "Cost", "Start", "% Start", "Gens", "Gap NN%", "Time"
        ));
        report.push_str("-".repeat(80).as_str());
        report.push('\n');

        for result in &self.results {
            report.push_str(&format!(
                "{:<12} {:>12.4} {:>12.4} {:>8.2} {:>8} {:>10.2} {:>10.4}\n",
                result.seed,
                result.cost,
                result.initial_cost,
                result.percentage_of_initial,
                result.generations,
                result.gap_to_baseline,
                result.time
            ));
        }
        for failure in &self.failures {
            report.push_str(&format!("{:<12} failed: {}\n", failure.seed, failure.error));
        }

        report.push_str("-".repeat(80).as_str());
        report.push('\n');

        if let Some(stats) = self.compute_statistics() {
            report.push_str(&format!("\nSummary for {} ({} runs, {} failed):\n", stats.instance, stats.runs, stats.failures));
            report.push_str(&format!("  Best:     {:.4}\n", stats.best_cost));
            report.push_str(&format!("  Mean:     {:.4} ± {:.4}\n", stats.mean_cost, stats.std_cost));
            report.push_str(&format!("  Median:   {:.4}\n", stats.median_cost));
            report.push_str(&format!("  Worst:    {:.4}\n", stats.worst_cost));
            report.push_str(&format!("  Baseline: {:.4} (nearest neighbour)\n", stats.baseline_cost));
            report.push_str(&format!("  Mean gap to baseline: {:.2}%\n", stats.mean_gap_to_baseline));
            report.push_str(&format!("  Mean generations: {:.1}\n", stats.mean_generations));
            report.push_str(&format!("  Mean time: {:.4}s\n", stats.mean_time));
        }

        report
    }

    pub fn results(&self) -> &[RunResult] {
        &self.results
    }

    pub fn failures(&self) -> &[RunFailure] {
        &self.failures
    }
}

/// One seeded solve, optionally under a wall-clock limit
pub fn run_single(
    instance: &TspInstance,
    settings: &Settings,
    seed: u64,
    time_limit: Option<f64>,
) -> Result<SolveReport, SolveError> {
    let rng = SeededRandom::new(seed)?;
    let mut solver = GeneticSolver::new(settings.clone(), instance.clone(), rng)?;
    match time_limit {
        Some(seconds) => solver.run(&mut Deadline::after_secs(seconds)),
        None => solver.run(&mut Unbounded),
    }
}

fn record(instance: &TspInstance, baseline: &Solution, seed: u64, report: &SolveReport) -> RunResult {
    let gap_to_baseline = if baseline.cost > 0.0 {
        (report.best_score - baseline.cost) / baseline.cost * 100.0
    } else {
        0.0
    };

    RunResult {
        seed,
        instance: instance.name.clone(),
        dimension: instance.dimension(),
        cost: report.best_score,
        initial_cost: report.score_at_start,
        percentage_of_initial: report.percentage_of_initial,
        generations: report.generations,
        total_generations: report.total_generations,
        restarts: report.restarts,
        time: report.elapsed_ms / 1000.0,
        gap_to_baseline,
        stop_reason: report.stop_reason.to_string(),
    }
}
