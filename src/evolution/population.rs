//! Ordered collection of individuals that tracks its best member.

use super::selection::tournament;
use super::types::{fitness_cmp, Individual};
use crate::metrics::ErrorFn;
use rand::Rng;
use std::cmp::Ordering;
use std::ops::{Index, IndexMut};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A population of individuals and the index of the best one.
///
/// The best index is the first individual with minimal fitness. It is kept
/// up to date by [`evaluate`](Population::evaluate), [`sort`](Population::sort)
/// and [`set`](Population::set); after editing through `IndexMut` call
/// [`search_best`](Population::search_best).
#[derive(Debug, Clone)]
pub struct Population<T> {
    individuals: Vec<T>,
    best: usize,
}

impl<T: Individual> Population<T> {
    /// An empty population.
    pub fn new() -> Self {
        Self {
            individuals: Vec::new(),
            best: 0,
        }
    }

    pub fn from_individuals(individuals: Vec<T>) -> Self {
        let mut p = Self {
            individuals,
            best: 0,
        };
        p.search_best();
        p
    }

    /// `size` random individuals; see [`Individual::random`].
    pub fn random<R: Rng>(
        size: usize,
        max_len: usize,
        prob_variable: f64,
        num_variables: usize,
        max_depth: usize,
        rng: &mut R,
    ) -> Self {
        let individuals = (0..size)
            .map(|_| T::random(max_len, prob_variable, num_variables, max_depth, rng))
            .collect();
        Self::from_individuals(individuals)
    }

    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    pub fn best_index(&self) -> usize {
        self.best
    }

    /// The best individual.
    ///
    /// # Panics
    /// Panics if the population is empty.
    pub fn best(&self) -> &T {
        &self.individuals[self.best]
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.individuals.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.individuals.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.individuals
    }

    pub fn into_vec(self) -> Vec<T> {
        self.individuals
    }

    /// Replaces the individual at `index`, keeping the best index valid.
    pub fn set(&mut self, index: usize, individual: T) {
        let better = individual.is_evaluated()
            && fitness_cmp(individual.fitness(), self.individuals[self.best].fitness())
                == Ordering::Less;
        self.individuals[index] = individual;
        if index == self.best {
            self.search_best();
        } else if better {
            self.best = index;
        }
    }

    /// Appends an individual.
    pub fn insert(&mut self, individual: T) {
        self.individuals.push(individual);
        let last = self.individuals.len() - 1;
        if last == 0
            || fitness_cmp(self.individuals[last].fitness(), self.best().fitness())
                == Ordering::Less
        {
            self.best = last;
        }
    }

    /// Removes and returns the individual at `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn remove(&mut self, index: usize) -> T {
        let removed = self.individuals.remove(index);
        if index == self.best {
            self.search_best();
        } else if index < self.best {
            self.best -= 1;
        }
        removed
    }

    /// Truncates, or grows with individuals made by `f`.
    pub fn resize_with<F: FnMut() -> T>(&mut self, new_len: usize, f: F) {
        self.individuals.resize_with(new_len, f);
        self.search_best();
    }

    /// Evaluates every individual not yet evaluated and relocates the best.
    pub fn evaluate(&mut self, data: &[Vec<f64>], labels: &[f64], error_fn: ErrorFn, parallel: bool) {
        #[cfg(feature = "parallel")]
        {
            if parallel {
                self.individuals.par_iter_mut().for_each(|ind| {
                    ind.evaluate(data, labels, error_fn, false);
                });
                self.search_best();
                return;
            }
        }
        #[cfg(not(feature = "parallel"))]
        let _ = parallel;

        for ind in self.individuals.iter_mut() {
            ind.evaluate(data, labels, error_fn, false);
        }
        self.search_best();
    }

    /// Tournament selection of size `k`; see [`tournament`].
    pub fn select<R: Rng>(&self, k: usize, rng: &mut R) -> usize {
        tournament(&self.individuals, k, rng)
    }

    /// Stable ascending sort by fitness; the best ends up at index 0.
    pub fn sort(&mut self) {
        self.individuals
            .sort_by(|a, b| fitness_cmp(a.fitness(), b.fitness()));
        self.best = 0;
    }

    /// Re-establishes the best index by a linear scan.
    pub fn search_best(&mut self) {
        self.best = self
            .individuals
            .iter()
            .enumerate()
            .fold(None::<(usize, f64)>, |acc, (i, ind)| match acc {
                Some((_, f)) if fitness_cmp(ind.fitness(), f) != Ordering::Less => acc,
                _ => Some((i, ind.fitness())),
            })
            .map_or(0, |(i, _)| i);
    }

    /// Index of the worst individual (last among equals).
    pub fn worst_index(&self) -> usize {
        self.individuals
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| fitness_cmp(a.fitness(), b.fitness()))
            .map_or(0, |(i, _)| i)
    }

    /// Mean of the finite fitness values; `+inf` when there are none.
    pub fn mean_fitness(&self) -> f64 {
        let (sum, count) = self
            .individuals
            .iter()
            .map(|ind| ind.fitness())
            .filter(|f| f.is_finite())
            .fold((0.0, 0usize), |(s, c), f| (s + f, c + 1));
        if count == 0 {
            f64::INFINITY
        } else {
            sum / count as f64
        }
    }
}

impl<T: Individual> Default for Population<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<usize> for Population<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.individuals[index]
    }
}

impl<T> IndexMut<usize> for Population<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.individuals[index]
    }
}
