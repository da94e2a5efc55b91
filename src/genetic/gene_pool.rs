//! Chromosomes, the gene pool and the goal function.
//!
//! A chromosome is a permutation of `0..ChromosomeLength`, i.e. of every city
//! except the anchor. The gene pool owns all chromosomes in fixed slots;
//! slots `0..parents` hold the elite, the rest hold children.

use crate::instance::TspInstance;
use std::ops::Range;

/// Visiting order of every city except the anchor
pub type Chromosome = Vec<usize>;

/// Length of the closed tour `anchor → chromosome… → anchor`.
///
/// The chromosome must be a permutation of `0..instance.dimension() - 1`;
/// this is not checked here.
pub fn goal_function(instance: &TspInstance, chromosome: &[usize]) -> f64 {
    let (first, last) = match (chromosome.first(), chromosome.last()) {
        (Some(&first), Some(&last)) => (first, last),
        _ => return 0.0,
    };
    let anchor = instance.anchor();

    let inner: f64 = chromosome
        .windows(2)
        .map(|w| instance.distance(w[0], w[1]))
        .sum();

    instance.distance(anchor, first) + inner + instance.distance(last, anchor)
}

/// True when `chromosome` holds every value of `0..chromosome.len()` exactly once
pub fn is_permutation(chromosome: &[usize]) -> bool {
    let mut seen = vec![false; chromosome.len()];
    for &gene in chromosome {
        match seen.get_mut(gene) {
            Some(flag) if !*flag => *flag = true,
            _ => return false,
        }
    }
    true
}

/// Fixed-size population with a parallel score per slot
#[derive(Debug, Clone)]
pub struct GenePool {
    chromosomes: Vec<Chromosome>,
    scores: Vec<f64>,
    parents: usize,
}

impl GenePool {
    /// Allocate `size` identity chromosomes of `length` genes. Scores start
    /// at infinity until the first evaluation.
    pub fn new(size: usize, length: usize, parents: usize) -> Self {
        GenePool {
            chromosomes: vec![(0..length).collect(); size],
            scores: vec![f64::INFINITY; size],
            parents: parents.min(size),
        }
    }

    pub fn len(&self) -> usize {
        self.chromosomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chromosomes.is_empty()
    }

    pub fn chromosome_length(&self) -> usize {
        self.chromosomes.first().map_or(0, |c| c.len())
    }

    pub fn number_of_parents(&self) -> usize {
        self.parents
    }

    /// Slots holding children
    pub fn children(&self) -> Range<usize> {
        self.parents..self.chromosomes.len()
    }

    pub fn chromosome(&self, slot: usize) -> &[usize] {
        &self.chromosomes[slot]
    }

    pub fn chromosome_mut(&mut self, slot: usize) -> &mut [usize] {
        &mut self.chromosomes[slot]
    }

    /// Two distinct slots borrowed mutably at once
    pub fn pair_mut(&mut self, a: usize, b: usize) -> (&mut [usize], &mut [usize]) {
        assert_ne!(a, b, "cannot borrow slot {} twice", a);
        if a < b {
            let (low, high) = self.chromosomes.split_at_mut(b);
            (&mut low[a], &mut high[0])
        } else {
            let (low, high) = self.chromosomes.split_at_mut(a);
            (&mut high[0], &mut low[b])
        }
    }

    pub fn score(&self, slot: usize) -> f64 {
        self.scores[slot]
    }

    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    pub fn set_score(&mut self, slot: usize, score: f64) {
        self.scores[slot] = score;
    }

    /// Exchange the contents of two slots, scores included. Swapping a slot
    /// with itself does nothing.
    pub fn swap_slots(&mut self, a: usize, b: usize) {
        if a != b {
            self.chromosomes.swap(a, b);
            self.scores.swap(a, b);
        }
    }

    /// Overwrite slot `to` with an element-wise copy of slot `from`
    pub fn copy_slot(&mut self, from: usize, to: usize) {
        if from == to {
            return;
        }
        let score = self.scores[from];
        let (source, target) = self.pair_mut(from, to);
        target.copy_from_slice(source);
        self.scores[to] = score;
    }

    /// Recompute every score. Returns the slot with the lowest score; ties
    /// go to the lowest slot.
    pub fn evaluate(&mut self, instance: &TspInstance) -> usize {
        let mut best = 0;
        for slot in 0..self.chromosomes.len() {
            let score = goal_function(instance, &self.chromosomes[slot]);
            self.scores[slot] = score;
            if score < self.scores[best] {
                best = slot;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::City;

    fn square_with_center() -> TspInstance {
        TspInstance::new(
            "square",
            vec![
                City::new(0.0, 0.0),
                City::new(1.0, 0.0),
                City::new(1.0, 1.0),
                City::new(0.0, 1.0),
                City::new(0.5, 0.5),
            ],
        )
    }

    #[test]
    fn test_goal_function_closes_tour_at_anchor() {
        let instance = square_with_center();
        let half_diagonal = 0.5f64.sqrt();

        let around = goal_function(&instance, &[0, 1, 2, 3]);
        assert!((around - (3.0 + 2.0 * half_diagonal)).abs() < 1e-12);

        let crossing = goal_function(&instance, &[0, 2, 1, 3]);
        assert!((crossing - (1.0 + 2.0 * 2.0f64.sqrt() + 2.0 * half_diagonal)).abs() < 1e-12);
        assert!(around < crossing);
    }

    #[test]
    fn test_goal_function_is_reverse_symmetric() {
        let instance = TspInstance::random(9, 5, 4.0).unwrap();
        let forward = vec![3, 0, 7, 1, 5, 2, 6, 4];
        let backward: Vec<usize> = forward.iter().rev().copied().collect();
        assert!((goal_function(&instance, &forward) - goal_function(&instance, &backward)).abs() < 1e-9);
    }

    #[test]
    fn test_goal_function_single_gene() {
        let instance = TspInstance::new("pair", vec![City::new(0.0, 0.0), City::new(3.0, 4.0)]);
        assert!((goal_function(&instance, &[0]) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_is_permutation() {
        assert!(is_permutation(&[2, 0, 1]));
        assert!(is_permutation(&[]));
        assert!(!is_permutation(&[0, 0, 1]));
        assert!(!is_permutation(&[0, 3, 1]));
    }

    #[test]
    fn test_new_pool_holds_identity_chromosomes() {
        let pool = GenePool::new(6, 4, 2);
        assert_eq!(pool.len(), 6);
        assert_eq!(pool.chromosome_length(), 4);
        assert_eq!(pool.children(), 2..6);
        assert!((0..6).all(|slot| pool.chromosome(slot) == [0, 1, 2, 3]));
        assert!(pool.scores().iter().all(|s| s.is_infinite()));
    }

    #[test]
    fn test_swap_slots_moves_scores_too() {
        let mut pool = GenePool::new(3, 3, 1);
        pool.chromosome_mut(2).copy_from_slice(&[2, 1, 0]);
        pool.set_score(0, 1.0);
        pool.set_score(2, 3.0);

        pool.swap_slots(0, 2);
        assert_eq!(pool.chromosome(0), [2, 1, 0]);
        assert_eq!(pool.chromosome(2), [0, 1, 2]);
        assert_eq!(pool.score(0), 3.0);
        assert_eq!(pool.score(2), 1.0);

        pool.swap_slots(1, 1);
        assert_eq!(pool.chromosome(1), [0, 1, 2]);
    }

    #[test]
    fn test_copy_slot_is_deep() {
        let mut pool = GenePool::new(2, 3, 1);
        pool.chromosome_mut(0).copy_from_slice(&[1, 2, 0]);
        pool.copy_slot(0, 1);
        pool.chromosome_mut(0).swap(0, 1);

        assert_eq!(pool.chromosome(1), [1, 2, 0]);
        assert_eq!(pool.chromosome(0), [2, 1, 0]);
    }

    #[test]
    fn test_pair_mut_in_either_order() {
        let mut pool = GenePool::new(3, 2, 1);
        {
            let (a, b) = pool.pair_mut(2, 0);
            a[0] = 1;
            b[1] = 0;
        }
        assert_eq!(pool.chromosome(2), [1, 1]);
        assert_eq!(pool.chromosome(0), [0, 0]);
    }

    #[test]
    fn test_evaluate_finds_lowest_score() {
        let instance = square_with_center();
        let mut pool = GenePool::new(3, 4, 1);
        pool.chromosome_mut(0).copy_from_slice(&[0, 2, 1, 3]);
        pool.chromosome_mut(1).copy_from_slice(&[1, 0, 3, 2]);
        pool.chromosome_mut(2).copy_from_slice(&[0, 2, 3, 1]);

        let best = pool.evaluate(&instance);
        assert_eq!(best, 1);
        assert!(pool.scores().iter().all(|s| s.is_finite()));
        assert!(pool.score(1) < pool.score(0));
    }
}
