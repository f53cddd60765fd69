//! Core trait definitions for the evolutionary engine.
//!
//! [`Individual`] is the contract between the generic
//! [`PopulationAlgorithm`](super::PopulationAlgorithm) and an expression
//! type. [`Breed`] adds the per-generation crossover and mutation policy
//! that distinguishes GP from GA-P.

use super::config::Parameters;
use super::population::Population;
use crate::expr::Expression;
use crate::metrics::ErrorFn;
use rand::Rng;
use std::cmp::Ordering;
use std::fmt;

/// Orders fitness values ascending with NaN after every number.
///
/// Lower fitness is better.
pub fn fitness_cmp(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b)
        .unwrap_or_else(|| a.is_nan().cmp(&b.is_nan()))
}

/// A candidate model in the population.
///
/// Individuals own their fitness cache: [`evaluate`](Individual::evaluate)
/// only touches the data when the cache is clear or `force` is set.
pub trait Individual: Clone + Send + Sync + PartialEq + fmt::Debug + fmt::Display {
    /// A random individual; see [`Expression::random`].
    fn random<R: Rng>(
        max_len: usize,
        prob_variable: f64,
        num_variables: usize,
        max_depth: usize,
        rng: &mut R,
    ) -> Self;

    /// The underlying tree.
    fn expression(&self) -> &Expression;

    /// Cached fitness; `+inf` when not evaluated.
    fn fitness(&self) -> f64 {
        self.expression().fitness()
    }

    fn is_evaluated(&self) -> bool {
        self.expression().is_evaluated()
    }

    /// Clears the fitness cache.
    fn invalidate(&mut self);

    /// Model output on one feature row.
    fn predict(&self, row: &[f64]) -> f64;

    /// Computes (or returns the cached) fitness on a data set.
    fn evaluate(&mut self, data: &[Vec<f64>], labels: &[f64], error_fn: ErrorFn, force: bool)
        -> f64;

    /// Subtree crossover; `None` when no pair of cut points can fit.
    fn tree_crossover<R: Rng>(&self, other: &Self, rng: &mut R) -> Option<(Self, Self)>;

    /// Point or subtree mutation of the tree.
    fn mutate_gp<R: Rng>(&mut self, num_variables: usize, rng: &mut R);
}

/// What a breeding policy sees of the running generation.
#[derive(Debug, Clone, Copy)]
pub struct GenerationContext<'a> {
    pub params: &'a Parameters,
    /// Zero-based index of the generation being bred.
    pub generation: usize,
    pub max_generations: usize,
    pub num_variables: usize,
}

/// Per-generation crossover and mutation orchestration.
///
/// `breed` receives the mating pool produced by tournament selection and
/// replaces parents by their children in place. Any child touched by an
/// operator must end up with a clear fitness cache.
pub trait Breed: Individual {
    fn breed<R: Rng>(pool: &mut Population<Self>, ctx: &GenerationContext<'_>, rng: &mut R);

    /// Called after the population of a generation has been evaluated.
    ///
    /// The default is a no-op.
    fn after_generation(_population: &mut Population<Self>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fitness_cmp_orders_nan_last() {
        assert_eq!(fitness_cmp(1.0, 2.0), Ordering::Less);
        assert_eq!(fitness_cmp(2.0, 2.0), Ordering::Equal);
        assert_eq!(fitness_cmp(f64::NAN, 2.0), Ordering::Greater);
        assert_eq!(fitness_cmp(f64::INFINITY, f64::NAN), Ordering::Less);
        assert_eq!(fitness_cmp(f64::NAN, f64::NAN), Ordering::Equal);
    }
}
