//! GA-TSP Solver Library
//!
//! A genetic algorithm for the Traveling Salesman Problem in the plane. The
//! last city of an instance is the anchor every tour starts and ends at;
//! chromosomes are permutations of the remaining cities.
//!
//! # Features
//!
//! - Multi-point (interval swap) crossover with permutation repair
//! - Single-swap and multi-swap mutation
//! - Elitist survivor selection that rejects duplicate scores
//! - Step-wise, run-to-completion and background-thread solving with
//!   cooperative cancellation
//! - Nearest-neighbour baseline, benchmarking and SVG visualization
//!
//! # Example
//!
//! ```no_run
//! use ga_tsp_solver::genetic::{GeneticSolver, SeededRandom, Settings, Unbounded};
//! use ga_tsp_solver::instance::TspInstance;
//! use ga_tsp_solver::solution::Solution;
//!
//! let instance = TspInstance::random(30, 7, 4.0).unwrap();
//! let settings = Settings::for_cities(instance.dimension());
//! let rng = SeededRandom::new(42).unwrap();
//!
//! let mut solver = GeneticSolver::new(settings, instance.clone(), rng).unwrap();
//! let report = solver.run(&mut Unbounded).unwrap();
//!
//! let solution = Solution::from_report(&instance, &report);
//! println!("Tour length: {:.2}", solution.cost);
//! ```

pub mod baseline;
pub mod benchmark;
pub mod error;
pub mod genetic;
pub mod instance;
pub mod solution;
pub mod visualization;

pub use error::{ConfigError, InstanceError, RepairError, SolveError};
pub use genetic::{GeneticSolver, Settings, SolveReport};
pub use instance::{City, TspInstance};
pub use solution::Solution;
