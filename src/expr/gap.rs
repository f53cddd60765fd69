//! GA-P expression: a tree whose numeric terminals index into a real-valued
//! chromosome.
//!
//! The tree evolves with the GP operators of [`Expression`]; the chromosome
//! evolves with BLX-alpha crossover and non-uniform mutation. Both share one
//! fitness cache.
//!
//! # References
//!
//! - Howard, L. & D'Angelo, D. (1995). "The GA-P: A Genetic Algorithm and
//!   Genetic Programming Hybrid", *IEEE Expert* 10(3).
//! - Eshelman, L. & Schaffer, J. (1993). "Real-Coded Genetic Algorithms and
//!   Interval-Schemata", *Foundations of Genetic Algorithms 2*.
//! - Michalewicz, Z. (1996). *Genetic Algorithms + Data Structures =
//!   Evolution Programs*, non-uniform mutation.

use super::expression::Expression;
use super::node::{Node, CONSTANT_RANGE};
use super::resolver::ChromosomeTerminals;
use crate::error::{Result, SymregError};
use crate::metrics::{compare_floats, ErrorFn, EPSILON};
use crate::random::unit;
use log::warn;
use rand::Rng;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default BLX-alpha exploration factor.
pub const DEFAULT_BLX_ALPHA: f64 = 0.3;

/// Shape exponent of the non-uniform mutation step.
const NON_UNIFORM_SHAPE: i32 = 5;

/// Expression plus the chromosome its `Number` nodes index into.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GapExpression {
    base: Expression,
    chromosome: Vec<f64>,
}

impl GapExpression {
    /// An empty tree with a random chromosome of `max_depth` genes.
    pub fn new<R: Rng>(max_depth: usize, rng: &mut R) -> Self {
        Self {
            base: Expression::new(max_depth),
            chromosome: random_chromosome(max_depth, rng),
        }
    }

    /// Pairs an existing tree with a chromosome.
    ///
    /// Fails when a `Number` node indexes past the end of `chromosome`.
    pub fn from_parts(base: Expression, chromosome: Vec<f64>) -> Result<Self> {
        if let Some(index) = referenced_genes(base.tree()).find(|&i| i >= chromosome.len()) {
            return Err(SymregError::InvalidData(format!(
                "number node refers to gene {index}, chromosome has {} genes",
                chromosome.len()
            )));
        }
        let mut e = Self { base, chromosome };
        e.base.invalidate();
        Ok(e)
    }

    /// Random chromosome of `max_depth` genes and a random tree whose
    /// numbers index into it.
    pub fn random<R: Rng>(
        max_len: usize,
        prob_variable: f64,
        num_variables: usize,
        max_depth: usize,
        rng: &mut R,
    ) -> Self {
        let mut e = Self::new(max_depth, rng);
        e.generate_random_expression(max_len, prob_variable, num_variables, rng);
        e
    }

    /// Regenerates the tree, keeping the chromosome.
    pub fn generate_random_expression<R: Rng>(
        &mut self,
        max_len: usize,
        prob_variable: f64,
        num_variables: usize,
        rng: &mut R,
    ) -> bool {
        let resolver = ChromosomeTerminals::new(&self.chromosome);
        self.base
            .generate_random_with(max_len, prob_variable, num_variables, &resolver, rng)
    }

    pub fn expression(&self) -> &Expression {
        &self.base
    }

    pub fn chromosome(&self) -> &[f64] {
        &self.chromosome
    }

    /// Replaces the chromosome and clears the fitness cache.
    pub fn set_chromosome(&mut self, chromosome: Vec<f64>) {
        debug_assert!(referenced_genes(self.base.tree()).all(|i| i < chromosome.len()));
        self.chromosome = chromosome;
        self.base.invalidate();
    }

    pub fn fitness(&self) -> f64 {
        self.base.fitness()
    }

    pub fn is_evaluated(&self) -> bool {
        self.base.is_evaluated()
    }

    pub fn invalidate(&mut self) {
        self.base.invalidate();
    }

    pub fn evaluate_data(&self, row: &[f64]) -> f64 {
        self.base
            .evaluate_data_with(row, &ChromosomeTerminals::new(&self.chromosome))
    }

    /// Computes and caches the fitness; see
    /// [`Expression::evaluate_expression`].
    pub fn evaluate_expression(
        &mut self,
        data: &[Vec<f64>],
        labels: &[f64],
        error_fn: ErrorFn,
        force: bool,
    ) -> f64 {
        let resolver = ChromosomeTerminals::new(&self.chromosome);
        self.base
            .evaluate_expression_with(data, labels, error_fn, force, &resolver)
    }

    /// Subtree crossover on the trees; each child keeps its own parent's
    /// chromosome.
    pub fn tree_crossover<R: Rng>(
        &self,
        other: &GapExpression,
        rng: &mut R,
    ) -> Option<(GapExpression, GapExpression)> {
        let (first, second) = self.base.tree_crossover(&other.base, rng)?;
        Some((
            GapExpression {
                base: first,
                chromosome: self.chromosome.clone(),
            },
            GapExpression {
                base: second,
                chromosome: other.chromosome.clone(),
            },
        ))
    }

    /// GP mutation; fresh numbers are gene indices.
    pub fn mutate_gp<R: Rng>(&mut self, num_variables: usize, rng: &mut R) {
        let resolver = ChromosomeTerminals::new(&self.chromosome);
        self.base.mutate_gp_with(num_variables, &resolver, rng);
    }

    /// BLX-alpha crossover of the chromosomes.
    ///
    /// For each gene pair the interval `[lo - alpha * span, hi + alpha * span]`
    /// is clamped to `[0, 1]` and both child genes are drawn uniformly from
    /// it. With chromosomes of different lengths only the common prefix is
    /// crossed; the rest of each child is copied from its own parent.
    pub fn blx_alpha_crossover<R: Rng>(
        &self,
        other: &GapExpression,
        alpha: f64,
        rng: &mut R,
    ) -> (Vec<f64>, Vec<f64>) {
        let mut first = self.chromosome.clone();
        let mut second = other.chromosome.clone();
        if first.len() != second.len() {
            warn!(
                "BLX crossover on chromosomes of length {} and {}",
                first.len(),
                second.len()
            );
        }

        for (a, b) in first.iter_mut().zip(second.iter_mut()) {
            let lo = a.min(*b);
            let hi = a.max(*b);
            let span = hi - lo;
            let lower = (lo - alpha * span).clamp(0.0, 1.0);
            let upper = (hi + alpha * span).clamp(0.0, 1.0);
            let width = upper - lower;
            *a = lower + unit(rng) * width;
            *b = lower + unit(rng) * width;
        }

        (first, second)
    }

    /// Non-uniform mutation of one random gene.
    ///
    /// The step shrinks as `generation` approaches `max_generations`.
    pub fn mutate_ga<R: Rng>(&mut self, generation: usize, max_generations: usize, rng: &mut R) {
        if self.chromosome.is_empty() {
            return;
        }
        let i = rng.random_range(0..self.chromosome.len());
        let gene = self.chromosome[i];

        self.chromosome[i] = if unit(rng) < 0.5 {
            gene + delta(generation, max_generations, 1.0 - gene, rng)
        } else {
            gene - delta(generation, max_generations, gene, rng)
        };
        self.base.invalidate();
    }

    /// True when both trees have the same node kinds position by position.
    pub fn same_niche(&self, other: &GapExpression) -> bool {
        let (a, b) = (self.base.tree(), other.base.tree());
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.kind() == y.kind())
    }

    /// True when the chromosomes agree gene-wise within [`EPSILON`].
    pub fn same_chromosome(&self, other: &GapExpression) -> bool {
        self.chromosome.len() == other.chromosome.len()
            && self
                .chromosome
                .iter()
                .zip(&other.chromosome)
                .all(|(a, b)| compare_floats(*a, *b, EPSILON))
    }
}

/// `gap * (1 - r^((1 - t/T)^5))`.
fn delta<R: Rng>(generation: usize, max_generations: usize, gap: f64, rng: &mut R) -> f64 {
    let progress = if max_generations == 0 {
        1.0
    } else {
        (generation as f64 / max_generations as f64).min(1.0)
    };
    let r = unit(rng);
    gap * (1.0 - r.powf((1.0 - progress).powi(NON_UNIFORM_SHAPE)))
}

fn random_chromosome<R: Rng>(len: usize, rng: &mut R) -> Vec<f64> {
    (0..len).map(|_| rng.random_range(CONSTANT_RANGE)).collect()
}

impl PartialEq for GapExpression {
    fn eq(&self, other: &Self) -> bool {
        self.base.same_tree(&other.base) && self.same_chromosome(other)
    }
}

impl fmt::Display for GapExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let resolver = ChromosomeTerminals::new(&self.chromosome);
        f.write_str(&self.base.to_infix_with(&resolver))
    }
}

/// Gene indices referenced by `Number` nodes of `tree`.
pub fn referenced_genes(tree: &[Node]) -> impl Iterator<Item = usize> + '_ {
    tree.iter().filter_map(|n| match n {
        Node::Number(v) => Some(Node::gene_index(*v)),
        _ => None,
    })
}
