//! Nearest-neighbour reference tour.

use crate::instance::TspInstance;
use crate::solution::Solution;
use ordered_float::OrderedFloat;

/// Start at the anchor and repeatedly move to the closest unvisited city
pub fn nearest_neighbor(instance: &TspInstance) -> Solution {
    let start = std::time::Instant::now();
    let n = instance.dimension();
    if n == 0 {
        return Solution::from_tour(instance, Vec::new(), "NearestNeighbor");
    }

    let mut visited = vec![false; n];
    let mut current = instance.anchor();
    let mut tour = Vec::with_capacity(n);
    tour.push(current);
    visited[current] = true;

    loop {
        let nearest = (0..n)
            .filter(|&c| !visited[c])
            .min_by_key(|&c| OrderedFloat(instance.distance(current, c)));
        let Some(next) = nearest else { break };

        tour.push(next);
        visited[next] = true;
        current = next;
    }

    let mut solution = Solution::from_tour(instance, tour, "NearestNeighbor");
    solution.computation_time = start.elapsed().as_secs_f64();
    solution
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::City;

    #[test]
    fn test_nearest_neighbor_on_a_line() {
        let instance = TspInstance::new(
            "line",
            vec![
                City::new(3.0, 0.0),
                City::new(1.0, 0.0),
                City::new(2.0, 0.0),
                City::new(0.0, 0.0),
            ],
        );
        let solution = nearest_neighbor(&instance);
        assert_eq!(solution.tour, vec![3, 1, 2, 0]);
        assert!((solution.cost - 6.0).abs() < 1e-10);
    }

    #[test]
    fn test_nearest_neighbor_is_complete() {
        let instance = TspInstance::random(40, 17, 4.0).unwrap();
        let solution = nearest_neighbor(&instance);
        assert!(solution.is_complete(&instance));
        assert_eq!(solution.algorithm, "NearestNeighbor");
    }
}
