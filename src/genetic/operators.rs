//! Variation operators.
//!
//! - Fisher–Yates shuffle for the initial population
//! - Multi-point crossover (interval swap) with permutation repair
//! - Single mutation (one transposition)
//! - Multiple mutation (per-gene random transpositions)
//!
//! Every operator leaves its chromosomes valid permutations.

use crate::error::RepairError;
use crate::genetic::gene_pool::GenePool;
use crate::genetic::random::RandomSource;
use crate::genetic::settings::Settings;

/// Smallest crossover interval
pub const MIN_CROSSOVER_INTERVAL: usize = 2;

/// Overwrite `chromosome` with a uniformly shuffled identity permutation
pub fn randomize<R: RandomSource + ?Sized>(chromosome: &mut [usize], rng: &mut R) {
    for (i, gene) in chromosome.iter_mut().enumerate() {
        *gene = i;
    }
    shuffle(chromosome, rng);
}

/// Fisher–Yates shuffle
pub fn shuffle<R: RandomSource + ?Sized>(genes: &mut [usize], rng: &mut R) {
    let n = genes.len();
    for i in 0..n {
        let j = rng.range(i, n);
        genes.swap(i, j);
    }
}

/// Whether chromosomes of this length are long enough for crossover
#[inline]
pub fn supports_crossover(length: usize) -> bool {
    length / 2 >= MIN_CROSSOVER_INTERVAL
}

/// Draw `(start, interval)` with `interval` in `[2, length / 2]` and `start`
/// in `[0, length - interval]`. `None` when the chromosome is too short.
pub fn draw_interval<R: RandomSource + ?Sized>(length: usize, rng: &mut R) -> Option<(usize, usize)> {
    if !supports_crossover(length) {
        return None;
    }
    let interval = rng.range(MIN_CROSSOVER_INTERVAL, length / 2 + 1);
    let start = rng.range(0, length - interval + 1);
    Some((start, interval))
}

/// Multi-point crossover on a random interval. Returns the number of genes
/// repaired across both chromosomes, or `None` when the chromosomes are too
/// short to cross.
pub fn multi_point_crossover<R: RandomSource + ?Sized>(
    a: &mut [usize],
    b: &mut [usize],
    rng: &mut R,
) -> Result<Option<usize>, RepairError> {
    match draw_interval(a.len(), rng) {
        Some((start, interval)) => crossover_at(a, b, start, interval).map(Some),
        None => Ok(None),
    }
}

/// Swap `[start, start + interval)` between two chromosomes and repair both
pub fn crossover_at(a: &mut [usize], b: &mut [usize], start: usize, interval: usize) -> Result<usize, RepairError> {
    let end = start + interval;
    if end > a.len() || end > b.len() {
        return Err(RepairError::IntervalOutOfBounds {
            start,
            end,
            len: a.len().min(b.len()),
        });
    }

    a[start..end].swap_with_slice(&mut b[start..end]);

    let repaired_a = repair(a, start, interval)?;
    let repaired_b = repair(b, start, interval)?;
    Ok(repaired_a + repaired_b)
}

/// Restore the permutation property after an interval swap.
///
/// Values outside the interval that also occur inside it are duplicates.
/// Their positions, in ascending order, receive the values that went missing,
/// also in ascending order. Returns the number of positions filled.
pub fn repair(chromosome: &mut [usize], start: usize, interval: usize) -> Result<usize, RepairError> {
    let len = chromosome.len();
    let end = start + interval;
    if end > len {
        return Err(RepairError::IntervalOutOfBounds { start, end, len });
    }

    let mut inside = vec![false; len];
    for &gene in &chromosome[start..end] {
        if let Some(flag) = inside.get_mut(gene) {
            *flag = true;
        }
    }

    let duplicates: Vec<usize> = (0..start)
        .chain(end..len)
        .filter(|&pos| inside.get(chromosome[pos]).copied().unwrap_or(false))
        .collect();

    let mut present = vec![false; len];
    let mut is_duplicate = vec![false; len];
    for &pos in &duplicates {
        is_duplicate[pos] = true;
    }
    for (pos, &gene) in chromosome.iter().enumerate() {
        if is_duplicate[pos] {
            continue;
        }
        if let Some(flag) = present.get_mut(gene) {
            *flag = true;
        }
    }

    let missing: Vec<usize> = (0..len).filter(|&value| !present[value]).collect();

    if duplicates.len() != missing.len() {
        return Err(RepairError::CountMismatch {
            duplicates: duplicates.len(),
            missing: missing.len(),
        });
    }

    for (&pos, &value) in duplicates.iter().zip(missing.iter()) {
        chromosome[pos] = value;
    }

    Ok(duplicates.len())
}

/// Swap two random positions. With `assured`, the second position is redrawn
/// until it differs from the first, so the chromosome always changes.
pub fn single_mutation<R: RandomSource + ?Sized>(chromosome: &mut [usize], rng: &mut R, assured: bool) {
    let n = chromosome.len();
    if n < 2 {
        return;
    }

    let first = rng.range(0, n);
    let mut second = rng.range(0, n);
    if assured {
        while second == first {
            second = rng.range(0, n);
        }
    }
    chromosome.swap(first, second);
}

/// Visit every position and, with `percent` percent probability, swap it
/// with a random position.
pub fn multiple_mutation<R: RandomSource + ?Sized>(chromosome: &mut [usize], rng: &mut R, percent: f64) {
    if percent <= 0.0 {
        return;
    }

    let n = chromosome.len();
    for i in 0..n {
        if rng.chance(percent) {
            let j = rng.range(0, n);
            chromosome.swap(i, j);
        }
    }
}

/// What one pass of [`vary`] did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VariationStats {
    pub crossovers: usize,
    pub repaired_genes: usize,
    pub single_mutations: usize,
    pub multi_mutations: usize,
}

/// Apply crossover or mutation to every child slot, scanning left to right.
///
/// With at least two child slots left, a successful crossover draw
/// recombines the slot with its right neighbour and skips both. Otherwise
/// the slot is mutated, multi-swap or single-swap.
pub fn vary<R: RandomSource + ?Sized>(
    pool: &mut GenePool,
    settings: &Settings,
    rng: &mut R,
) -> Result<VariationStats, RepairError> {
    let mut stats = VariationStats::default();
    let size = pool.len();
    let can_cross = supports_crossover(pool.chromosome_length());
    let mut i = pool.number_of_parents();

    while i < size {
        if can_cross && size - i >= 2 && rng.chance(settings.mpc_probability) {
            let (a, b) = pool.pair_mut(i, i + 1);
            if let Some(repaired) = multi_point_crossover(a, b, rng)? {
                stats.crossovers += 1;
                stats.repaired_genes += repaired;
            }
            i += 2;
            continue;
        }

        if rng.chance(settings.multi_mutation_probability) {
            multiple_mutation(
                pool.chromosome_mut(i),
                rng,
                settings.multi_mutation_mutation_probability,
            );
            stats.multi_mutations += 1;
        } else {
            single_mutation(pool.chromosome_mut(i), rng, settings.assured_mutation);
            stats.single_mutations += 1;
        }
        i += 1;
    }

    Ok(stats)
}
