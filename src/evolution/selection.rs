//! Tournament selection.
//!
//! All comparisons assume **minimization** (lower fitness = better).
//!
//! # References
//!
//! - Blickle & Thiele (1996), "A Comparison of Selection Schemes used in
//!   Evolutionary Algorithms"
//! - Goldberg & Deb (1991), "A Comparative Analysis of Selection Schemes
//!   Used in Genetic Algorithms"

use super::types::{fitness_cmp, Individual};
use rand::seq::index;
use rand::Rng;
use std::cmp::Ordering;

/// Draws `k` distinct individuals uniformly and returns the index of the
/// fittest, ties going to the lowest index.
///
/// `k` is clamped to `[1, population.len()]`, so `k == len` always returns
/// the best individual and `k == 1` is a uniform pick.
///
/// # Panics
/// Panics if `population` is empty.
///
/// # Complexity
/// O(k) per selection
pub fn tournament<I: Individual, R: Rng>(population: &[I], k: usize, rng: &mut R) -> usize {
    assert!(
        !population.is_empty(),
        "cannot select from empty population"
    );
    let n = population.len();
    let k = k.clamp(1, n);

    let mut best_idx = usize::MAX;
    for idx in index::sample(rng, n, k).iter() {
        if best_idx == usize::MAX {
            best_idx = idx;
            continue;
        }
        match fitness_cmp(population[idx].fitness(), population[best_idx].fitness()) {
            Ordering::Less => best_idx = idx,
            Ordering::Equal if idx < best_idx => best_idx = idx,
            _ => {}
        }
    }
    best_idx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{Expression, Node};
    use crate::random::create_rng;

    fn population(fitnesses: &[f64]) -> Vec<Expression> {
        fitnesses
            .iter()
            .map(|&f| {
                let mut e = Expression::from_tree(vec![Node::Variable(0)], 5);
                e.set_fitness(f);
                e
            })
            .collect()
    }

    #[test]
    fn test_full_tournament_returns_best() {
        let pop = population(&[3.0, 1.0, 2.0, 1.0, 5.0]);
        let mut rng = create_rng(42);
        for _ in 0..50 {
            assert_eq!(tournament(&pop, pop.len(), &mut rng), 1);
        }
    }

    #[test]
    fn test_oversized_tournament_is_clamped() {
        let pop = population(&[3.0, 0.5, 2.0]);
        let mut rng = create_rng(1);
        assert_eq!(tournament(&pop, 10, &mut rng), 1);
    }

    #[test]
    fn test_size_one_is_uniform() {
        let pop = population(&[1.0, 2.0, 3.0, 4.0]);
        let mut rng = create_rng(7);
        let mut counts = [0usize; 4];
        for _ in 0..4000 {
            counts[tournament(&pop, 1, &mut rng)] += 1;
        }
        for c in counts {
            assert!((800..1200).contains(&c), "counts {counts:?}");
        }
    }

    #[test]
    fn test_pressure_favours_better() {
        let pop = population(&[10.0, 1.0, 5.0, 8.0, 3.0, 7.0]);
        let mut rng = create_rng(3);
        let mut best_count = 0;
        for _ in 0..1000 {
            if tournament(&pop, 3, &mut rng) == 1 {
                best_count += 1;
            }
        }
        // P(best in a 3-of-6 sample) = 0.5
        assert!(best_count > 400, "best selected {best_count} times");
    }

    #[test]
    fn test_nan_loses() {
        let pop = population(&[f64::NAN, 4.0]);
        let mut rng = create_rng(2);
        assert_eq!(tournament(&pop, 2, &mut rng), 1);
    }

    #[test]
    #[should_panic(expected = "empty population")]
    fn test_empty_panics() {
        let pop: Vec<Expression> = Vec::new();
        let mut rng = create_rng(0);
        tournament(&pop, 3, &mut rng);
    }
}
