//! Tree nodes.

use rand::Rng;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Binary arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
}

impl Operator {
    pub const ALL: [Operator; 4] = [Operator::Add, Operator::Sub, Operator::Mul, Operator::Div];

    /// Uniformly random operator kind.
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
        }
    }

    pub fn from_symbol(s: &str) -> Option<Self> {
        match s {
            "+" => Some(Operator::Add),
            "-" => Some(Operator::Sub),
            "*" => Some(Operator::Mul),
            "/" => Some(Operator::Div),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One slot of a preorder-flattened expression tree.
///
/// Equality is structural: numbers compare their payload, variables their
/// column index, operators only their kind.
///
/// In chromosome-indexed (GA-P) expressions the `Number` payload is a gene
/// index stored as an integral value; see [`Node::gene_index`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Node {
    Number(f64),
    Variable(u32),
    Operator(Operator),
}

/// Discriminant of a [`Node`], used for niche comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Number,
    Variable,
    Operator(Operator),
}

/// Range of literal constants drawn for plain expressions and initial genes.
pub const CONSTANT_RANGE: std::ops::Range<f64> = -10.0..10.0;

impl Node {
    /// A number node holding a random literal in `[-10, 10)`.
    pub fn random_number<R: Rng>(rng: &mut R) -> Self {
        Node::Number(rng.random_range(CONSTANT_RANGE))
    }

    /// A variable node with a column index uniform in `[0, num_variables)`.
    ///
    /// Falls back to column 0 when `num_variables` is zero.
    pub fn random_variable<R: Rng>(num_variables: usize, rng: &mut R) -> Self {
        if num_variables == 0 {
            return Node::Variable(0);
        }
        Node::Variable(rng.random_range(0..num_variables) as u32)
    }

    /// An operator node with a uniformly random kind.
    pub fn random_operator<R: Rng>(rng: &mut R) -> Self {
        Node::Operator(Operator::random(rng))
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Node::Operator(_))
    }

    #[inline]
    pub fn is_operator(&self) -> bool {
        matches!(self, Node::Operator(_))
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Number(_) => NodeKind::Number,
            Node::Variable(_) => NodeKind::Variable,
            Node::Operator(op) => NodeKind::Operator(*op),
        }
    }

    /// Gene index carried by a number node of a chromosome-indexed tree.
    #[inline]
    pub fn gene_index(value: f64) -> usize {
        if value <= 0.0 {
            0
        } else {
            value as usize
        }
    }
}

impl Default for Node {
    /// A zero literal. Use [`Node::random_number`] for a random constant.
    fn default() -> Self {
        Node::Number(0.0)
    }
}
