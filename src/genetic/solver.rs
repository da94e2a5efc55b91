//! Convergence controller.
//!
//! A solve runs in two phases:
//!
//! 1. **Search** for a starting population whose elite scores are pairwise
//!    distinct, redrawing the whole population until one is found.
//! 2. **Evolve** generation by generation (reproduce, vary, select
//!    survivors) until the best score drops below the target share of the
//!    starting score or stops improving.
//!
//! [`GeneticSolver::step`] performs one attempt or one generation, so a host
//! loop can interleave the solve with its own work. [`GeneticSolver::run`]
//! drives it to completion and [`spawn_solve`] moves it onto its own thread.

use crate::error::{ConfigError, SolveError};
use crate::genetic::control::{CancellationToken, Checkpoint, Progress, Unbounded};
use crate::genetic::gene_pool::{Chromosome, GenePool};
use crate::genetic::operators::{randomize, vary};
use crate::genetic::random::{RandomSource, SeededRandom};
use crate::genetic::selection::{has_duplicate_elites, reproduce, select_parents, select_survivors};
use crate::genetic::settings::Settings;
use crate::instance::TspInstance;
use serde::Serialize;
use std::fmt;
use std::ops::ControlFlow;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Why the generation loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    /// Best score fell below the requested share of the starting score
    TargetReached,
    /// Too many consecutive generations without strict improvement
    Stagnated,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StopReason::TargetReached => write!(f, "target reached"),
            StopReason::Stagnated => write!(f, "stagnated"),
        }
    }
}

/// Outcome of a finished solve
#[derive(Debug, Clone, Serialize)]
pub struct SolveReport {
    /// Visiting order of every city but the anchor
    pub best_chromosome: Chromosome,
    pub best_score: f64,
    /// Best score of the accepted starting population
    pub score_at_start: f64,
    /// `100 × best_score / score_at_start`
    pub percentage_of_initial: f64,
    /// Generations executed, minus the trailing run without progress
    pub generations: usize,
    pub total_generations: usize,
    /// Starting populations rejected for duplicate elite scores
    pub restarts: usize,
    pub elapsed_ms: f64,
    pub stop_reason: StopReason,
    /// Best score before the first generation and after each one
    pub history: Vec<f64>,
}

/// What a call to [`GeneticSolver::step`] did
#[derive(Debug, Clone)]
pub enum Step {
    /// A starting population was drawn but rejected
    Searching { attempts: usize },
    /// A starting population was accepted or a generation completed
    Evolving { generation: usize, best_score: f64 },
    Finished(SolveReport),
}

#[derive(Debug, Clone, PartialEq)]
enum Phase {
    Searching,
    Evolving,
    Finished(StopReason),
    Failed(SolveError),
}

/// Genetic algorithm over one city set with one random source
pub struct GeneticSolver<R: RandomSource> {
    settings: Settings,
    instance: TspInstance,
    rng: R,
    pool: GenePool,
    phase: Phase,
    attempts: usize,
    generation: usize,
    generations_without_progress: usize,
    best_score_at_start: f64,
    best_score: f64,
    best_chromosome: Chromosome,
    history: Vec<f64>,
    started: Option<Instant>,
    elapsed: Duration,
}

impl<R: RandomSource> GeneticSolver<R> {
    /// Validate settings and cities; no solve work happens here
    pub fn new(settings: Settings, instance: TspInstance, rng: R) -> Result<Self, ConfigError> {
        settings.validate()?;
        settings.validate_cities(&instance.cities)?;

        let pool = GenePool::new(
            settings.number_of_chromosomes,
            settings.chromosome_length(),
            settings.number_of_parents(),
        );

        Ok(GeneticSolver {
            settings,
            instance,
            rng,
            pool,
            phase: Phase::Searching,
            attempts: 0,
            generation: 0,
            generations_without_progress: 0,
            best_score_at_start: f64::INFINITY,
            best_score: f64::INFINITY,
            best_chromosome: Vec::new(),
            history: Vec::new(),
            started: None,
            elapsed: Duration::ZERO,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn instance(&self) -> &TspInstance {
        &self.instance
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn best_score(&self) -> f64 {
        self.best_score
    }

    /// True once the solve either finished or failed
    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Finished(_) | Phase::Failed(_))
    }

    /// `100 × best / start`. A zero-length starting tour counts as 100%.
    pub fn percentage_of_initial(&self) -> f64 {
        if self.best_score_at_start > 0.0 && self.best_score_at_start.is_finite() {
            100.0 * self.best_score / self.best_score_at_start
        } else {
            100.0
        }
    }

    fn progress(&self) -> Progress {
        Progress {
            generation: self.generation,
            attempts: self.attempts,
            best_score: self.best_score,
        }
    }

    /// Run one restart attempt or one generation.
    ///
    /// The checkpoint is consulted first; a `Break` aborts the solve with
    /// [`SolveError::Cancelled`]. Once finished, further calls return the
    /// same report without doing any work. A solve that failed with
    /// [`SolveError::DuplicateElites`] or [`SolveError::Invariant`] stays
    /// failed and keeps returning that error.
    pub fn step<C: Checkpoint + ?Sized>(&mut self, checkpoint: &mut C) -> Result<Step, SolveError> {
        match &self.phase {
            Phase::Finished(reason) => return Ok(Step::Finished(self.report(*reason))),
            Phase::Failed(error) => return Err(error.clone()),
            Phase::Searching | Phase::Evolving => {}
        }

        let started = *self.started.get_or_insert_with(Instant::now);

        if let ControlFlow::Break(()) = checkpoint.check(&self.progress()) {
            log::info!("Solve cancelled at generation {}", self.generation);
            return Err(SolveError::Cancelled {
                generation: self.generation,
            });
        }

        let outcome = match self.phase.clone() {
            Phase::Searching => self.attempt_start(),
            Phase::Evolving => self.evolve(),
            Phase::Finished(reason) => Ok(Step::Finished(self.report(reason))),
            Phase::Failed(error) => Err(error),
        };
        let step = match outcome {
            Ok(step) => step,
            Err(error) => {
                self.phase = Phase::Failed(error.clone());
                return Err(error);
            }
        };

        if let Phase::Finished(reason) = self.phase {
            self.elapsed = started.elapsed();
            log::info!(
                "Solve finished ({}): best {:.4} = {:.2}% of start after {} generations ({} restarts)",
                reason,
                self.best_score,
                self.percentage_of_initial(),
                self.generation,
                self.attempts.saturating_sub(1)
            );
            return Ok(Step::Finished(self.report(reason)));
        }

        Ok(step)
    }

    /// Step until the solve finishes
    pub fn run<C: Checkpoint + ?Sized>(&mut self, checkpoint: &mut C) -> Result<SolveReport, SolveError> {
        loop {
            if let Step::Finished(report) = self.step(checkpoint)? {
                return Ok(report);
            }
        }
    }

    /// Draw a fresh starting population and keep it if its elites are unique
    fn attempt_start(&mut self) -> Result<Step, SolveError> {
        self.attempts += 1;

        for slot in 0..self.pool.len() {
            randomize(self.pool.chromosome_mut(slot), &mut self.rng);
        }
        let best_slot = self.pool.evaluate(&self.instance);
        let best_at_start = self.pool.score(best_slot);

        select_parents(&mut self.pool);

        if has_duplicate_elites(&self.pool) {
            log::debug!("Attempt {}: duplicate elite scores, redrawing", self.attempts);
            if let Some(limit) = self.settings.max_restarts {
                if self.attempts >= limit {
                    return Err(SolveError::DuplicateElites {
                        attempts: self.attempts,
                    });
                }
            }
            return Ok(Step::Searching {
                attempts: self.attempts,
            });
        }

        self.best_score_at_start = best_at_start;
        self.best_score = best_at_start;
        self.best_chromosome = self.pool.chromosome(0).to_vec();
        self.history.push(best_at_start);
        self.phase = Phase::Evolving;

        log::info!(
            "Starting population accepted after {} attempt(s), best score {:.4}",
            self.attempts,
            best_at_start
        );

        self.check_target();
        Ok(Step::Evolving {
            generation: self.generation,
            best_score: self.best_score,
        })
    }

    /// One generation: reproduce, vary, select survivors
    fn evolve(&mut self) -> Result<Step, SolveError> {
        self.generation += 1;

        reproduce(&mut self.pool);
        let variation = vary(&mut self.pool, &self.settings, &mut self.rng).map_err(|e| {
            log::error!("Repair failed at generation {}: {}", self.generation, e);
            SolveError::Invariant(e)
        })?;

        let survivors = select_survivors(&mut self.pool, &self.instance);
        let parents = self.pool.number_of_parents();
        if survivors.promoted < parents {
            log::warn!(
                "Generation {}: only {} of {} parent slots refilled",
                self.generation,
                survivors.promoted,
                parents
            );
        }

        if survivors.best_score < self.best_score {
            self.best_score = survivors.best_score;
            self.best_chromosome = survivors.best_chromosome;
            self.generations_without_progress = 0;
        } else {
            self.generations_without_progress += 1;
        }
        self.history.push(self.best_score);

        log::debug!(
            "Gen {}  best {:.4}  {:.2}% of start  stagnant {}  crossovers {}  redundant {}",
            self.generation,
            self.best_score,
            self.percentage_of_initial(),
            self.generations_without_progress,
            variation.crossovers,
            survivors.redundant
        );

        if self.generations_without_progress >= self.settings.generations_without_progress_to_stop_at {
            self.phase = Phase::Finished(StopReason::Stagnated);
        } else {
            self.check_target();
        }

        Ok(Step::Evolving {
            generation: self.generation,
            best_score: self.best_score,
        })
    }

    /// The generation loop continues while `percentage ≥ target`
    fn check_target(&mut self) {
        if self.percentage_of_initial() < self.settings.percentage_of_initial_to_stop_at {
            self.phase = Phase::Finished(StopReason::TargetReached);
        }
    }

    fn report(&self, stop_reason: StopReason) -> SolveReport {
        SolveReport {
            best_chromosome: self.best_chromosome.clone(),
            best_score: self.best_score,
            score_at_start: self.best_score_at_start,
            percentage_of_initial: self.percentage_of_initial(),
            generations: self.generation - self.generations_without_progress,
            total_generations: self.generation,
            restarts: self.attempts.saturating_sub(1),
            elapsed_ms: self.elapsed.as_secs_f64() * 1000.0,
            stop_reason,
            history: self.history.clone(),
        }
    }
}

/// Solve to completion with a numeric seed
pub fn solve(settings: Settings, instance: TspInstance, seed: u64) -> Result<SolveReport, SolveError> {
    let rng = SeededRandom::new(seed)?;
    GeneticSolver::new(settings, instance, rng)?.run(&mut Unbounded)
}

/// A solve running on its own thread
pub struct SolveHandle {
    handle: JoinHandle<Result<SolveReport, SolveError>>,
    token: CancellationToken,
}

impl SolveHandle {
    /// Ask the solve to stop at its next checkpoint
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the result
    pub fn join(self) -> Result<SolveReport, SolveError> {
        self.handle.join().map_err(|_| SolveError::WorkerPanicked)?
    }
}

/// Run a whole solve on a dedicated thread
pub fn spawn_solve<R>(settings: Settings, instance: TspInstance, rng: R) -> SolveHandle
where
    R: RandomSource + Send + 'static,
{
    let token = CancellationToken::new();
    let mut checkpoint = token.clone();
    let handle = std::thread::spawn(move || {
        GeneticSolver::new(settings, instance, rng)?.run(&mut checkpoint)
    });
    SolveHandle { handle, token }
}
