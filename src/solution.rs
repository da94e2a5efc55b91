//! Tour solutions over a city set.
//!
//! A solution stores the visiting order as city indices starting at the
//! anchor; the edge back to the anchor is implied.

use crate::genetic::SolveReport;
use crate::instance::TspInstance;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// A tour over every city of an instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    /// City indices in visiting order, starting at the anchor
    pub tour: Vec<usize>,
    /// Closed tour length
    pub cost: f64,
    /// Algorithm that generated this solution
    pub algorithm: String,
    /// Computation time in seconds
    pub computation_time: f64,
    /// Number of generations (if applicable)
    pub iterations: Option<usize>,
    /// Best length of the starting population (if applicable)
    pub initial_cost: Option<f64>,
}

impl Solution {
    /// Create a solution from a tour that starts at the anchor
    pub fn from_tour(instance: &TspInstance, tour: Vec<usize>, algorithm: &str) -> Self {
        Solution {
            cost: instance.tour_length(&tour),
            tour,
            algorithm: algorithm.to_string(),
            computation_time: 0.0,
            iterations: None,
            initial_cost: None,
        }
    }

    /// Prefix the best chromosome with the anchor
    pub fn from_report(instance: &TspInstance, report: &SolveReport) -> Self {
        let mut tour = Vec::with_capacity(report.best_chromosome.len() + 1);
        tour.push(instance.anchor());
        tour.extend_from_slice(&report.best_chromosome);

        let mut solution = Self::from_tour(instance, tour, "GeneticAlgorithm");
        solution.computation_time = report.elapsed_ms / 1000.0;
        solution.iterations = Some(report.total_generations);
        solution.initial_cost = Some(report.score_at_start);
        solution
    }

    /// The tour with the anchor repeated at the end
    pub fn closed_tour(&self) -> Vec<usize> {
        let mut closed = self.tour.clone();
        if let Some(&first) = self.tour.first() {
            closed.push(first);
        }
        closed
    }

    /// Check that every city is visited exactly once, starting at the anchor
    pub fn is_complete(&self, instance: &TspInstance) -> bool {
        if self.tour.len() != instance.dimension() {
            return false;
        }

        let unique: HashSet<usize> = self.tour.iter().cloned().collect();
        unique.len() == instance.dimension()
            && self.tour.iter().all(|&c| c < instance.dimension())
            && self.tour[0] == instance.anchor()
    }

    /// Improvement over the starting population, in percent
    pub fn improvement(&self) -> Option<f64> {
        self.initial_cost
            .filter(|&initial| initial > 0.0)
            .map(|initial| 100.0 * (initial - self.cost) / initial)
    }

    /// Write the solution as pretty-printed JSON
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }
}

impl std::fmt::Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Solution ({})", self.algorithm)?;
        writeln!(f, "  Cost: {:.4}", self.cost)?;
        if let (Some(initial), Some(improvement)) = (self.initial_cost, self.improvement()) {
            writeln!(f, "  Initial: {:.4} ({:.2}% shorter)", initial, improvement)?;
        }
        writeln!(f, "  Time: {:.4}s", self.computation_time)?;
        if let Some(iter) = self.iterations {
            writeln!(f, "  Generations: {}", iter)?;
        }
        writeln!(f, "  Tour: {:?}", self.closed_tour())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genetic::{solve, Settings};
    use crate::instance::City;

    fn triangle() -> TspInstance {
        TspInstance::new(
            "triangle",
            vec![City::new(0.0, 0.0), City::new(3.0, 0.0), City::new(3.0, 4.0)],
        )
    }

    #[test]
    fn test_from_tour() {
        let instance = triangle();
        let solution = Solution::from_tour(&instance, vec![2, 0, 1], "manual");
        assert!((solution.cost - 12.0).abs() < 1e-10);
        assert!(solution.is_complete(&instance));
        assert_eq!(solution.closed_tour(), vec![2, 0, 1, 2]);
        assert_eq!(solution.improvement(), None);
    }

    #[test]
    fn test_incomplete_tours() {
        let instance = triangle();
        assert!(!Solution::from_tour(&instance, vec![2, 0], "short").is_complete(&instance));
        assert!(!Solution::from_tour(&instance, vec![0, 1, 2], "wrong start").is_complete(&instance));
        assert!(!Solution::from_tour(&instance, vec![2, 0, 0], "repeat").is_complete(&instance));
    }

    #[test]
    fn test_from_report_starts_at_anchor() {
        let instance = TspInstance::random(9, 4, 4.0).unwrap();
        let settings = Settings {
            number_of_cities: 9,
            number_of_chromosomes: 30,
            percentage_parents: 10.0,
            generations_without_progress_to_stop_at: 20,
            ..Default::default()
        };
        let report = solve(settings, instance.clone(), 8).unwrap();
        let solution = Solution::from_report(&instance, &report);

        assert!(solution.is_complete(&instance));
        assert_eq!(solution.tour[0], 8);
        assert!((solution.cost - report.best_score).abs() < 1e-9);
        assert_eq!(solution.iterations, Some(report.total_generations));
        assert!(solution.improvement().unwrap() >= 0.0);
    }

    #[test]
    fn test_json_export() {
        let instance = triangle();
        let solution = Solution::from_tour(&instance, vec![2, 1, 0], "manual");
        let path = std::env::temp_dir().join(format!("ga_tsp_solution_{}.json", std::process::id()));

        solution.save_json(&path).unwrap();
        let loaded: Solution = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.tour, vec![2, 1, 0]);
        assert_eq!(loaded.algorithm, "manual");
    }
}
