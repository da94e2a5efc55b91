//! Parent selection, reproduction and survivor selection.
//!
//! The elite always lives in slots `0..parents`. Promotion moves chromosomes
//! there by slot swaps, keeping track of where each candidate currently sits.

use crate::genetic::gene_pool::{Chromosome, GenePool};
use crate::instance::TspInstance;
use ordered_float::OrderedFloat;

/// Relative tolerance under which two scores count as the same tour length
pub const SCORE_TOLERANCE: f64 = 1e-9;

/// Epsilon-tolerant score equality, relative to the score magnitude
#[inline]
pub fn scores_identical(a: f64, b: f64) -> bool {
    let scale = 1.0f64.max(a.abs()).max(b.abs());
    (a - b).abs() <= SCORE_TOLERANCE * scale
}

/// Slots accepted by `eligible`, sorted ascending by score. Equal scores keep
/// slot order.
pub fn rank_slots<F>(scores: &[f64], eligible: F) -> Vec<usize>
where
    F: Fn(usize) -> bool,
{
    let mut ranked: Vec<usize> = (0..scores.len()).filter(|&slot| eligible(slot)).collect();
    ranked.sort_by_key(|&slot| OrderedFloat(scores[slot]));
    ranked
}

/// Move the first `count` slots of `ranked` into slots `0..count`, in rank
/// order. Returns how many were promoted.
pub fn promote(pool: &mut GenePool, ranked: &[usize], count: usize) -> usize {
    let count = count.min(ranked.len());
    // position[original] = current slot, occupant[slot] = original
    let mut position: Vec<usize> = (0..pool.len()).collect();
    let mut occupant: Vec<usize> = (0..pool.len()).collect();

    for (target, &original) in ranked.iter().take(count).enumerate() {
        let current = position[original];
        if current == target {
            continue;
        }
        let displaced = occupant[target];
        pool.swap_slots(target, current);

        occupant[target] = original;
        occupant[current] = displaced;
        position[original] = target;
        position[displaced] = current;
    }

    count
}

/// Rank the whole pool and promote the best as parents
pub fn select_parents(pool: &mut GenePool) {
    let ranked = rank_slots(pool.scores(), |_| true);
    let parents = pool.number_of_parents();
    promote(pool, &ranked, parents);
}

/// True when two elite slots share a score
pub fn has_duplicate_elites(pool: &GenePool) -> bool {
    let elite = &pool.scores()[..pool.number_of_parents()];
    elite
        .iter()
        .enumerate()
        .any(|(i, &a)| elite[i + 1..].iter().any(|&b| scores_identical(a, b)))
}

/// Fill every child slot with a copy of a parent, round-robin
pub fn reproduce(pool: &mut GenePool) {
    let parents = pool.number_of_parents();
    if parents == 0 {
        return;
    }
    for slot in pool.children() {
        pool.copy_slot((slot - parents) % parents, slot);
    }
}

/// Flag children whose score repeats a parent or an earlier unflagged child.
/// Parents are never flagged.
pub fn mark_redundant(pool: &GenePool) -> Vec<bool> {
    let scores = pool.scores();
    let parents = pool.number_of_parents();
    let mut marked = vec![false; pool.len()];

    for child in pool.children() {
        let score = scores[child];
        let repeated = scores[..parents].iter().any(|&p| scores_identical(p, score))
            || (parents..child).any(|other| !marked[other] && scores_identical(scores[other], score));
        marked[child] = repeated;
    }

    marked
}

/// Result of one survivor selection
#[derive(Debug, Clone)]
pub struct Survivors {
    /// Lowest score in the pool after evaluation
    pub best_score: f64,
    /// Copy of the chromosome that scored `best_score`
    pub best_chromosome: Chromosome,
    /// Children flagged as redundant
    pub redundant: usize,
    /// Slots moved into the parent set
    pub promoted: usize,
}

/// Re-evaluate the pool, drop redundant children and promote the best unique
/// chromosomes into the parent slots.
pub fn select_survivors(pool: &mut GenePool, instance: &TspInstance) -> Survivors {
    let best_slot = pool.evaluate(instance);
    let best_score = pool.score(best_slot);
    let best_chromosome = pool.chromosome(best_slot).to_vec();

    let marked = mark_redundant(pool);
    let redundant = marked.iter().filter(|&&m| m).count();

    let ranked = rank_slots(pool.scores(), |slot| !marked[slot]);
    let parents = pool.number_of_parents();
    let promoted = promote(pool, &ranked, parents);

    Survivors {
        best_score,
        best_chromosome,
        redundant,
        promoted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genetic::operators::{randomize, vary};
    use crate::genetic::random::SeededRandom;
    use crate::genetic::settings::Settings;
    use crate::instance::City;

    fn pool_with_scores(scores: &[f64], parents: usize) -> GenePool {
        let mut pool = GenePool::new(scores.len(), 3, parents);
        for (slot, &score) in scores.iter().enumerate() {
            // Tag each chromosome with its original slot
            pool.chromosome_mut(slot)[0] = slot;
            pool.set_score(slot, score);
        }
        pool
    }

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
    fn test_scores_identical() {
        assert!(scores_identical(1.0, 1.0));
        assert!(scores_identical(1.0, 1.0 + 1e-12));
        assert!(!scores_identical(1.0, 1.0001));
        assert!(scores_identical(1e6, 1e6 + 1e-4));
        assert!(!scores_identical(1e6, 1e6 + 1e-2));
        assert!(scores_identical(0.0, 1e-10));
    }

    #[test]
    fn test_rank_slots_is_stable() {
        let ranked = rank_slots(&[3.0, 1.0, 3.0, 0.5], |_| true);
        assert_eq!(ranked, vec![3, 1, 0, 2]);

        let ranked = rank_slots(&[3.0, 1.0, 3.0, 0.5], |slot| slot != 3);
        assert_eq!(ranked, vec![1, 0, 2]);
    }

    #[test]
    fn test_promote_tracks_displaced_slots() {
        // Slot 0 is second best: swapping by stale rank would move it back out
        let mut pool = pool_with_scores(&[1.0, 0.0, 5.0], 2);
        let ranked = rank_slots(pool.scores(), |_| true);
        assert_eq!(promote(&mut pool, &ranked, 2), 2);

        assert_eq!(pool.scores(), [0.0, 1.0, 5.0]);
        assert_eq!(pool.chromosome(0)[0], 1);
        assert_eq!(pool.chromosome(1)[0], 0);
    }

    #[test]
    fn test_promote_longer_chain() {
        let mut pool = pool_with_scores(&[4.0, 3.0, 2.0, 1.0, 0.0], 3);
        select_parents(&mut pool);
        assert_eq!(&pool.scores()[..3], [0.0, 1.0, 2.0]);
        assert_eq!(pool.chromosome(0)[0], 4);
        assert_eq!(pool.chromosome(1)[0], 3);
        assert_eq!(pool.chromosome(2)[0], 2);
    }

    #[test]
    fn test_promote_with_few_candidates() {
        let mut pool = pool_with_scores(&[2.0, 1.0, 0.5], 2);
        assert_eq!(promote(&mut pool, &[2], 2), 1);
        assert_eq!(pool.score(0), 0.5);
        assert_eq!(pool.score(1), 1.0);
    }

    #[test]
    fn test_duplicate_elites() {
        let pool = pool_with_scores(&[1.0, 2.0, 1.0], 2);
        assert!(!has_duplicate_elites(&pool));

        let pool = pool_with_scores(&[1.0, 1.0 + 1e-12, 3.0], 2);
        assert!(has_duplicate_elites(&pool));

        let pool = pool_with_scores(&[1.0, 1.0], 1);
        assert!(!has_duplicate_elites(&pool));
    }

    #[test]
    fn test_reproduce_round_robin() {
        let mut pool = pool_with_scores(&[1.0, 2.0, 9.0, 9.0, 9.0, 9.0, 9.0], 2);
        reproduce(&mut pool);
        let sources: Vec<usize> = (0..7).map(|slot| pool.chromosome(slot)[0]).collect();
        assert_eq!(sources, vec![0, 1, 0, 1, 0, 1, 0]);
        assert_eq!(pool.score(6), 1.0);

        // Children are independent copies
        pool.chromosome_mut(2)[1] = 7;
        assert_ne!(pool.chromosome(0)[1], 7);
    }

    #[test]
    fn test_mark_redundant() {
        let pool = pool_with_scores(&[1.0, 2.0, 1.0, 3.0, 3.0, 2.0 + 1e-12, 4.0], 2);
        assert_eq!(mark_redundant(&pool), vec![false, false, true, false, true, true, false]);
    }

    #[test]
    fn test_marked_child_is_not_compared_again() {
        let pool = pool_with_scores(&[1.0, 1.0, 1.0], 1);
        // Slot 1 repeats the parent; slot 2 repeats only marked slot 1 and the parent
        assert_eq!(mark_redundant(&pool), vec![false, true, true]);
    }

    #[test]
    fn test_select_survivors_keeps_best_unique() {
        let instance = square_with_center();
        let mut pool = GenePool::new(5, 4, 2);
        pool.chromosome_mut(0).copy_from_slice(&[0, 2, 1, 3]);
        pool.chromosome_mut(1).copy_from_slice(&[0, 1, 3, 2]);
        pool.chromosome_mut(2).copy_from_slice(&[0, 1, 2, 3]);
        pool.chromosome_mut(3).copy_from_slice(&[3, 2, 1, 0]);
        pool.chromosome_mut(4).copy_from_slice(&[0, 2, 1, 3]);

        let survivors = select_survivors(&mut pool, &instance);

        assert_eq!(survivors.best_chromosome, vec![0, 1, 2, 3]);
        assert!((survivors.best_score - (3.0 + 2.0 * 0.5f64.sqrt())).abs() < 1e-12);
        // [3, 2, 1, 0] repeats [0, 1, 2, 3]; [0, 2, 1, 3] repeats parent 0
        assert_eq!(survivors.redundant, 2);
        assert_eq!(survivors.promoted, 2);
        assert_eq!(pool.chromosome(0), [0, 1, 2, 3]);
        assert!(pool.score(0) < pool.score(1));
        assert!(!has_duplicate_elites(&pool));
    }

    #[test]
    fn test_generation_best_never_gets_worse() {
        let instance = TspInstance::random(15, 31, 4.0).unwrap();
        let settings = Settings {
            number_of_cities: 15,
            number_of_chromosomes: 40,
            percentage_parents: 10.0,
            ..Default::default()
        };
        let mut rng = SeededRandom::new(19).unwrap();
        let mut pool = GenePool::new(
            settings.number_of_chromosomes,
            settings.chromosome_length(),
            settings.number_of_parents(),
        );

        loop {
            for slot in 0..pool.len() {
                randomize(pool.chromosome_mut(slot), &mut rng);
            }
            pool.evaluate(&instance);
            select_parents(&mut pool);
            if !has_duplicate_elites(&pool) {
                break;
            }
        }

        let mut previous = pool.score(0);
        for _ in 0..300 {
            reproduce(&mut pool);
            vary(&mut pool, &settings, &mut rng).unwrap();
            let survivors = select_survivors(&mut pool, &instance);

            // Reversed tours may differ from their original in the last bit
            assert!(survivors.best_score <= previous || scores_identical(survivors.best_score, previous));
            assert_eq!(survivors.promoted, 4);
            assert!(scores_identical(pool.score(0), survivors.best_score));
            assert!(!has_duplicate_elites(&pool));
            previous = survivors.best_score;
        }
    }
}
