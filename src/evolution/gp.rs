//! Plain genetic programming over [`Expression`].
//!
//! Pairs are formed left to right from the mating pool. Each pair gets
//! subtree crossover with the GP crossover probability, then each child GP
//! mutation with the GP mutation probability.

use super::algorithm::{apply_gp_mutations, PopulationAlgorithm};
use super::population::Population;
use super::types::{Breed, GenerationContext, Individual};
use crate::expr::Expression;
use crate::metrics::ErrorFn;
use crate::random::unit;
use log::debug;
use rand::Rng;

/// GP driver.
pub type GpAlgorithm = PopulationAlgorithm<Expression>;

impl Individual for Expression {
    fn random<R: Rng>(
        max_len: usize,
        prob_variable: f64,
        num_variables: usize,
        max_depth: usize,
        rng: &mut R,
    ) -> Self {
        Expression::random(max_len, prob_variable, num_variables, max_depth, rng)
    }

    fn expression(&self) -> &Expression {
        self
    }

    fn invalidate(&mut self) {
        Expression::invalidate(self);
    }

    fn predict(&self, row: &[f64]) -> f64 {
        self.evaluate_data(row)
    }

    fn evaluate(
        &mut self,
        data: &[Vec<f64>],
        labels: &[f64],
        error_fn: ErrorFn,
        force: bool,
    ) -> f64 {
        self.evaluate_expression(data, labels, error_fn, force)
    }

    fn tree_crossover<R: Rng>(&self, other: &Self, rng: &mut R) -> Option<(Self, Self)> {
        Expression::tree_crossover(self, other, rng)
    }

    fn mutate_gp<R: Rng>(&mut self, num_variables: usize, rng: &mut R) {
        Expression::mutate_gp(self, num_variables, rng);
    }
}

impl Breed for Expression {
    fn breed<R: Rng>(pool: &mut Population<Self>, ctx: &GenerationContext<'_>, rng: &mut R) {
        let params = ctx.params;
        let mut mother = 0;

        // an odd last individual passes through unchanged
        while mother + 1 < pool.len() {
            let father = mother + 1;
            let mut first = pool[mother].clone();
            let mut second = pool[father].clone();
            let mut changed = (false, false);

            if unit(rng) < params.gp_crossover_probability {
                match pool[mother].tree_crossover(&pool[father], rng) {
                    Some((a, b)) => {
                        first = a;
                        second = b;
                        changed = (true, true);
                    }
                    None => debug!("crossover skipped for pair ({mother}, {father})"),
                }
            }

            let mutated = apply_gp_mutations(
                &mut first,
                &mut second,
                params.gp_mutation_probability,
                ctx.num_variables,
                rng,
            );

            if changed.0 || mutated.0 {
                Individual::invalidate(&mut first);
                pool[mother] = first;
            }
            if changed.1 || mutated.1 {
                Individual::invalidate(&mut second);
                pool[father] = second;
            }
            mother += 2;
        }
    }
}
