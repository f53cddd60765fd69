//! How numeric terminals are interpreted.
//!
//! A plain expression stores literal constants in its `Number` nodes. A
//! GA-P expression stores gene indices and reads the constants from its
//! chromosome. Both share the same tree code; the difference is confined
//! to a [`TerminalResolver`] chosen by the owning type.

use super::node::Node;
use rand::Rng;

/// Capability used by evaluation, generation and mutation to handle
/// `Number` nodes.
pub trait TerminalResolver {
    /// Value of a `Number` node with the given payload.
    fn number(&self, payload: f64) -> f64;

    /// A fresh `Number` node.
    fn random_number<R: Rng>(&self, rng: &mut R) -> Node;
}

/// Number payloads are the constants themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct Literal;

impl TerminalResolver for Literal {
    #[inline]
    fn number(&self, payload: f64) -> f64 {
        payload
    }

    fn random_number<R: Rng>(&self, rng: &mut R) -> Node {
        Node::random_number(rng)
    }
}

/// Number payloads index into a chromosome.
#[derive(Debug, Clone, Copy)]
pub struct ChromosomeTerminals<'a> {
    genes: &'a [f64],
}

impl<'a> ChromosomeTerminals<'a> {
    pub fn new(genes: &'a [f64]) -> Self {
        Self { genes }
    }
}

impl TerminalResolver for ChromosomeTerminals<'_> {
    /// Out-of-range indices read as `0.0`.
    #[inline]
    fn number(&self, payload: f64) -> f64 {
        self.genes
            .get(Node::gene_index(payload))
            .copied()
            .unwrap_or(0.0)
    }

    fn random_number<R: Rng>(&self, rng: &mut R) -> Node {
        if self.genes.is_empty() {
            return Node::Number(0.0);
        }
        Node::Number(rng.random_range(0..self.genes.len()) as f64)
    }
}
