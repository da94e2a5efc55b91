//! Error types for the GA-TSP solver.
//!
//! Configuration problems are reported before any solve work starts,
//! repair invariant violations are kept apart from ordinary results, and
//! cancellation is an outcome of its own.

use thiserror::Error;

/// Invalid settings or city set, detected before solving.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("number of cities must be at least 2, got {0}")]
    TooFewCities(usize),
    #[error("number of chromosomes must be at least 1, got {0}")]
    TooFewChromosomes(usize),
    #[error("{name} must be a percentage in [0, 100], got {value}")]
    PercentageOutOfRange { name: &'static str, value: f64 },
    #[error("percentage of parents {percentage}% of {chromosomes} chromosomes selects no parent")]
    NoParents { percentage: f64, chromosomes: usize },
    #[error("generations without progress to stop at must be at least 1")]
    NoStagnationLimit,
    #[error("{parents} elites can never have distinct scores: at most {distinct} distinct tour lengths exist for {cities} cities")]
    UnsatisfiableElites { parents: usize, distinct: usize, cities: usize },
    #[error("settings expect {expected} cities but {actual} were supplied")]
    CityCountMismatch { expected: usize, actual: usize },
    #[error("city {index} has a non-finite coordinate")]
    NonFiniteCity { index: usize },
    #[error("random seed must be non-zero")]
    ZeroSeed,
    #[error("cannot read settings: {0}")]
    Io(String),
    #[error("cannot parse settings: {0}")]
    Parse(String),
}

/// Internal consistency failure of the crossover repair step.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RepairError {
    #[error("repair found {duplicates} duplicates but {missing} missing values")]
    CountMismatch { duplicates: usize, missing: usize },
    #[error("interval [{start}, {end}) does not fit a chromosome of length {len}")]
    IntervalOutOfBounds { start: usize, end: usize, len: usize },
}

/// Outcome of a solve that did not produce a result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("internal invariant violated during crossover: {0}")]
    Invariant(#[from] RepairError),
    #[error("solve cancelled at generation {generation}")]
    Cancelled { generation: usize },
    #[error("no population with distinct elite scores after {attempts} attempts")]
    DuplicateElites { attempts: usize },
    #[error("solver thread panicked")]
    WorkerPanicked,
}

/// Failure to load or save a city set.
#[derive(Debug, Error)]
pub enum InstanceError {
    #[error("cannot open file: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("instance contains no cities")]
    Empty,
    #[error("placement extent must be finite and positive, got {0}")]
    InvalidExtent(f64),
}
