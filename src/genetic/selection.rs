//! Tournament selection and fitness ranking.

use crate::chromosome::Chromosome;
use ordered_float::OrderedFloat;
use rand::prelude::*;
use std::cmp::{Ordering, Reverse};

/// Ranking key: higher fitness first, lower id breaks ties
fn rank_key(chromosome: &Chromosome) -> (OrderedFloat<f64>, Reverse<u64>) {
    (OrderedFloat(chromosome.fitness()), Reverse(chromosome.id()))
}

/// `Greater` when `a` ranks above `b`
pub fn compare_rank(a: &Chromosome, b: &Chromosome) -> Ordering {
    rank_key(a).cmp(&rank_key(b))
}

/// Sort best-first
pub fn sort_by_rank(population: &mut [Chromosome]) {
    population.sort_by(|a, b| compare_rank(b, a));
}

/// Run `count` tournaments and return the indices of the winners
///
/// Contestants are drawn uniformly with replacement.
pub fn select<R: Rng>(population: &[Chromosome], tournament_size: usize, count: usize, rng: &mut R) -> Vec<usize> {
    if population.is_empty() {
        return Vec::new();
    }

    (0..count)
        .map(|_| tournament(population, tournament_size.max(1), rng))
        .collect()
}

fn tournament<R: Rng>(population: &[Chromosome], size: usize, rng: &mut R) -> usize {
    let mut best_idx = rng.gen_range(0..population.len());

    for _ in 1..size {
        let idx = rng.gen_range(0..population.len());
        if compare_rank(&population[idx], &population[best_idx]) == Ordering::Greater {
            best_idx = idx;
        }
    }

    best_idx
}
