//! Genetic algorithm for the TSP with a fixed anchor city.
//!
//! Chromosomes are permutations of every city but the anchor, recombined by
//! interval-swap crossover with repair and varied by transposition
//! mutations. The elite is kept in the first slots of the gene pool.

pub mod control;
pub mod gene_pool;
pub mod operators;
pub mod random;
pub mod selection;
pub mod settings;
pub mod solver;

pub use control::{CancellationToken, Checkpoint, Deadline, Progress, Unbounded};
pub use gene_pool::{goal_function, Chromosome, GenePool};
pub use random::{seed_from_phrase, RandomSource, SeededRandom};
pub use settings::Settings;
pub use solver::{solve, spawn_solve, GeneticSolver, SolveHandle, SolveReport, Step, StopReason};
