//! GA-P: joint evolution of trees and constant chromosomes.
//!
//! Pairing is niche-aware. For each unpaired mother, with probability
//! `1 - inter_niche_crossover_probability`, the first unpaired individual of
//! the same niche is chosen as father; such intra-niche pairs only receive
//! the GA operators. Otherwise, or when no niche mate exists, the father is
//! the next unpaired individual and every operator applies.
//!
//! The population is sorted by fitness after each generation.

use super::algorithm::{apply_gp_mutations, PopulationAlgorithm};
use super::population::Population;
use super::types::{Breed, GenerationContext, Individual};
use crate::expr::{Expression, GapExpression};
use crate::metrics::ErrorFn;
use crate::random::unit;
use log::debug;
use rand::Rng;

/// GA-P driver.
pub type GapAlgorithm = PopulationAlgorithm<GapExpression>;

impl Individual for GapExpression {
    fn random<R: Rng>(
        max_len: usize,
        prob_variable: f64,
        num_variables: usize,
        max_depth: usize,
        rng: &mut R,
    ) -> Self {
        GapExpression::random(max_len, prob_variable, num_variables, max_depth, rng)
    }

    fn expression(&self) -> &Expression {
        GapExpression::expression(self)
    }

    fn invalidate(&mut self) {
        GapExpression::invalidate(self);
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
        GapExpression::tree_crossover(self, other, rng)
    }

    fn mutate_gp<R: Rng>(&mut self, num_variables: usize, rng: &mut R) {
        GapExpression::mutate_gp(self, num_variables, rng);
    }
}

fn first_unchosen(chosen: &[bool]) -> Option<usize> {
    chosen.iter().position(|&c| !c)
}

fn niche_mate(pool: &Population<GapExpression>, mother: usize, chosen: &[bool]) -> Option<usize> {
    (0..pool.len()).find(|&j| !chosen[j] && pool[mother].same_niche(&pool[j]))
}

impl Breed for GapExpression {
    fn breed<R: Rng>(pool: &mut Population<Self>, ctx: &GenerationContext<'_>, rng: &mut R) {
        let params = ctx.params;
        let n = pool.len();
        let mut chosen = vec![false; n];

        for _ in 0..n / 2 {
            let Some(mother) = first_unchosen(&chosen) else {
                break;
            };
            chosen[mother] = true;

            let mut mate = None;
            if params.inter_niche_crossover_probability < unit(rng) {
                mate = niche_mate(pool, mother, &chosen);
            }
            let intra_niche = mate.is_some();
            let Some(father) = mate.or_else(|| first_unchosen(&chosen)) else {
                break;
            };
            chosen[father] = true;

            let mut first = pool[mother].clone();
            let mut second = pool[father].clone();
            let mut changed = (false, false);

            if !intra_niche && unit(rng) < params.gp_crossover_probability {
                match pool[mother].tree_crossover(&pool[father], rng) {
                    Some((a, b)) => {
                        first = a;
                        second = b;
                        changed = (true, true);
                    }
                    None => debug!("crossover skipped for pair ({mother}, {father})"),
                }
            }

            if unit(rng) < params.ga_crossover_probability {
                let (a, b) = first.blx_alpha_crossover(&second, params.blx_alpha, rng);
                first.set_chromosome(a);
                second.set_chromosome(b);
                changed = (true, true);
            }

            if unit(rng) < params.ga_mutation_probability {
                first.mutate_ga(ctx.generation, ctx.max_generations, rng);
                changed.0 = true;
            }
            if unit(rng) < params.ga_mutation_probability {
                second.mutate_ga(ctx.generation, ctx.max_generations, rng);
                changed.1 = true;
            }

            if !intra_niche {
                let mutated = apply_gp_mutations(
                    &mut first,
                    &mut second,
                    params.gp_mutation_probability,
                    ctx.num_variables,
                    rng,
                );
                changed.0 |= mutated.0;
                changed.1 |= mutated.1;
            }

            if changed.0 {
                first.invalidate();
                pool[mother] = first;
            }
            if changed.1 {
                second.invalidate();
                pool[father] = second;
            }
        }
    }

    fn after_generation(population: &mut Population<Self>) {
        population.sort();
    }
}
