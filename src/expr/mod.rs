//! Expression trees.
//!
//! - [`node`]: tree slots and operators
//! - [`tree`]: preorder scan, splice, generation, evaluation
//! - [`resolver`]: literal vs chromosome-indexed numbers
//! - [`expression`]: plain expression with cached fitness
//! - [`gap`]: expression paired with a constant chromosome
//! - [`parser`]: infix text import

pub mod expression;
pub mod gap;
pub mod node;
pub mod parser;
pub mod resolver;
pub mod tree;

pub use expression::Expression;
pub use gap::GapExpression;
pub use node::{Node, NodeKind, Operator};
pub use parser::parse_infix;
pub use resolver::{ChromosomeTerminals, Literal, TerminalResolver};
