//! Plain expression: a preorder tree with literal constants and a cached
//! fitness.

use super::node::Node;
use super::parser::parse_infix;
use super::resolver::{Literal, TerminalResolver};
use super::tree;
use crate::error::{Result, SymregError};
use crate::metrics::ErrorFn;
use crate::random::unit;
use log::{debug, warn};
use rand::Rng;
use std::fmt;
use std::io::BufRead;
use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Variable probability used when growing a replacement subtree during
/// GP mutation.
pub const SUBTREE_PROB_VARIABLE: f64 = 0.3;

/// A preorder-flattened expression tree.
///
/// `max_depth` bounds the number of nodes: crossover and mutation never
/// produce a tree longer than it. The fitness cache is cleared by every
/// change to the tree.
///
/// # Examples
///
/// ```
/// use u_symreg::expr::Expression;
/// use u_symreg::metrics::mse;
///
/// let mut e = Expression::from_infix("( x0 * 2 )", 10, 1).unwrap();
/// let rows = vec![vec![1.0], vec![2.0]];
/// let fitness = e.evaluate_expression(&rows, &[2.0, 4.0], mse, false);
/// assert_eq!(fitness, 0.0);
/// assert!(e.is_evaluated());
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Expression {
    tree: Vec<Node>,
    max_depth: usize,
    num_variables: usize,
    fitness: f64,
    evaluated: bool,
}

impl Expression {
    /// An empty expression with capacity `max_depth`.
    pub fn new(max_depth: usize) -> Self {
        Self {
            tree: Vec::new(),
            max_depth,
            num_variables: 0,
            fitness: f64::INFINITY,
            evaluated: false,
        }
    }

    /// An expression holding the subtree of `nodes` rooted at `start`.
    pub fn from_subtree(nodes: &[Node], start: usize, max_depth: usize) -> Self {
        let mut e = Self::new(max_depth);
        e.tree = tree::get_subtree(nodes, start).to_vec();
        e
    }

    /// An expression holding `nodes` as-is.
    pub fn from_tree(nodes: Vec<Node>, max_depth: usize) -> Self {
        let mut e = Self::new(max_depth);
        e.tree = nodes;
        e
    }

    /// A random expression with literal constants.
    pub fn random<R: Rng>(
        max_len: usize,
        prob_variable: f64,
        num_variables: usize,
        max_depth: usize,
        rng: &mut R,
    ) -> Self {
        let mut e = Self::new(max_depth);
        e.num_variables = num_variables;
        e.generate_random_expression(max_len, prob_variable, num_variables, rng);
        e
    }

    /// Parses a single-line infix expression.
    ///
    /// Fails on malformed input or when the tree would have more than
    /// `max_depth` nodes.
    pub fn from_infix(line: &str, max_depth: usize, num_variables: usize) -> Result<Self> {
        let nodes = parse_infix(line)?;
        if nodes.len() > max_depth {
            return Err(SymregError::ExpressionTooLong {
                len: nodes.len(),
                max: max_depth,
            });
        }
        let mut e = Self::from_tree(nodes, max_depth);
        e.num_variables = num_variables;
        Ok(e)
    }

    /// Like [`from_infix`](Self::from_infix), but logs the failure and
    /// returns an empty expression instead.
    pub fn from_infix_or_empty(line: &str, max_depth: usize, num_variables: usize) -> Self {
        match Self::from_infix(line, max_depth, num_variables) {
            Ok(e) => e,
            Err(err) => {
                warn!("discarding expression '{}': {err}", line.trim());
                let mut e = Self::new(max_depth);
                e.num_variables = num_variables;
                e
            }
        }
    }

    /// Reads the first line of `path` as an infix expression.
    pub fn load<P: AsRef<Path>>(path: P, max_depth: usize, num_variables: usize) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        let mut line = String::new();
        std::io::BufReader::new(file).read_line(&mut line)?;
        Self::from_infix(&line, max_depth, num_variables)
    }

    // ---- Accessors ----

    pub fn tree(&self) -> &[Node] {
        &self.tree
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn num_variables(&self) -> usize {
        self.num_variables
    }

    pub fn set_num_variables(&mut self, num_variables: usize) {
        self.num_variables = num_variables;
    }

    /// Cached fitness; `+inf` when not evaluated.
    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    pub fn is_evaluated(&self) -> bool {
        self.evaluated
    }

    /// Stores an externally computed fitness and marks the expression
    /// evaluated.
    pub fn set_fitness(&mut self, fitness: f64) {
        self.fitness = fitness;
        self.evaluated = true;
    }

    /// Clears the fitness cache.
    pub fn invalidate(&mut self) {
        self.evaluated = false;
        self.fitness = f64::INFINITY;
    }

    /// Replaces the tree.
    pub fn assign_tree(&mut self, nodes: Vec<Node>) {
        self.tree = nodes;
        self.invalidate();
    }

    /// The subtree rooted at `start`.
    pub fn subtree(&self, start: usize) -> &[Node] {
        tree::get_subtree(&self.tree, start)
    }

    /// True when both trees hold the same node sequence.
    pub fn same_tree(&self, other: &Expression) -> bool {
        self.tree == other.tree
    }

    /// Depth of the subtree rooted at `start`. Reporting only; capacity is
    /// enforced on node count.
    pub fn compute_depth(&self, start: usize) -> usize {
        tree::depth(&self.tree, start)
    }

    // ---- Generation ----

    /// Regenerates the tree at random with literal constants.
    ///
    /// See [`generate_random_with`](Self::generate_random_with).
    pub fn generate_random_expression<R: Rng>(
        &mut self,
        max_len: usize,
        prob_variable: f64,
        num_variables: usize,
        rng: &mut R,
    ) -> bool {
        self.generate_random_with(max_len, prob_variable, num_variables, &Literal, rng)
    }

    /// Regenerates the tree at random, sampling numbers through `resolver`.
    ///
    /// Sets the capacity to `max_len`. Returns `false` and logs a warning
    /// when the budget ran out with branches still open; the partial tree is
    /// kept in that case.
    pub fn generate_random_with<T: TerminalResolver, R: Rng>(
        &mut self,
        max_len: usize,
        prob_variable: f64,
        num_variables: usize,
        resolver: &T,
        rng: &mut R,
    ) -> bool {
        self.max_depth = max_len;
        self.num_variables = num_variables;
        let (nodes, complete) =
            tree::random_tree(max_len, prob_variable, num_variables, resolver, rng);
        if !complete {
            warn!("random expression did not close within {max_len} nodes");
        }
        self.tree = nodes;
        self.invalidate();
        complete
    }

    // ---- Evaluation ----

    /// Output of the expression on one feature row.
    pub fn evaluate_data(&self, row: &[f64]) -> f64 {
        tree::evaluate(&self.tree, row, &Literal)
    }

    pub fn evaluate_data_with<T: TerminalResolver>(&self, row: &[f64], resolver: &T) -> f64 {
        tree::evaluate(&self.tree, row, resolver)
    }

    /// Computes and caches the fitness on a data set.
    ///
    /// Returns the cached value without touching the data when the
    /// expression is already evaluated and `force` is false.
    pub fn evaluate_expression(
        &mut self,
        data: &[Vec<f64>],
        labels: &[f64],
        error_fn: ErrorFn,
        force: bool,
    ) -> f64 {
        self.evaluate_expression_with(data, labels, error_fn, force, &Literal)
    }

    pub fn evaluate_expression_with<T: TerminalResolver>(
        &mut self,
        data: &[Vec<f64>],
        labels: &[f64],
        error_fn: ErrorFn,
        force: bool,
        resolver: &T,
    ) -> f64 {
        if (!self.evaluated || force) && !self.tree.is_empty() {
            let predicted: Vec<f64> = data
                .iter()
                .map(|row| tree::evaluate(&self.tree, row, resolver))
                .collect();
            self.fitness = error_fn(&predicted, labels);
        }
        self.evaluated = true;
        self.fitness
    }

    // ---- Crossover ----

    /// Child made of this tree with the subtree at `pos` replaced by
    /// `other`'s subtree at `other_pos`.
    ///
    /// Returns `None` when either cut point is not a node of its tree, or
    /// when the child would exceed `max_depth`.
    pub fn exchange_subtree(
        &self,
        other: &Expression,
        pos: usize,
        other_pos: usize,
    ) -> Option<Expression> {
        if other_pos >= other.len() {
            return None;
        }
        let donor = other.subtree(other_pos);
        let nodes = tree::splice(&self.tree, pos, donor, self.max_depth)?;
        let mut child = self.clone();
        child.assign_tree(nodes);
        Some(child)
    }

    /// Subtree crossover with fresh random cut points until both children
    /// fit their capacity.
    ///
    /// Returns `None` without drawing when no cut can ever fit, i.e. when
    /// one parent is longer than the other's capacity. Otherwise swapping
    /// the roots always fits, so the retry loop ends with probability one.
    pub fn tree_crossover<R: Rng>(
        &self,
        other: &Expression,
        rng: &mut R,
    ) -> Option<(Expression, Expression)> {
        if self.is_empty()
            || other.is_empty()
            || other.len() > self.max_depth
            || self.len() > other.max_depth
        {
            debug!(
                "skipping crossover: lengths {}/{} vs capacities {}/{}",
                self.len(),
                other.len(),
                self.max_depth,
                other.max_depth
            );
            return None;
        }

        loop {
            let pos = rng.random_range(0..self.len());
            let other_pos = rng.random_range(0..other.len());

            let Some(first) = self.exchange_subtree(other, pos, other_pos) else {
                continue;
            };
            let Some(second) = other.exchange_subtree(self, other_pos, pos) else {
                continue;
            };
            return Some((first, second));
        }
    }

    // ---- Mutation ----

    /// GP mutation with literal constants.
    pub fn mutate_gp<R: Rng>(&mut self, num_variables: usize, rng: &mut R) {
        self.mutate_gp_with(num_variables, &Literal, rng);
    }

    /// GP mutation at one random position.
    ///
    /// Half of the time the node is changed in place: a terminal becomes a
    /// fresh variable or number, an operator gets a random kind. Otherwise a
    /// freshly grown subtree replaces the one at that position, retrying
    /// until the splice fits `max_depth`.
    pub fn mutate_gp_with<T: TerminalResolver, R: Rng>(
        &mut self,
        num_variables: usize,
        resolver: &T,
        rng: &mut R,
    ) {
        if self.tree.is_empty() {
            return;
        }
        self.num_variables = num_variables;
        let pos = rng.random_range(0..self.tree.len());

        if unit(rng) < 0.5 {
            let replacement = if self.tree[pos].is_terminal() {
                if unit(rng) < 0.5 {
                    Node::random_variable(num_variables, rng)
                } else {
                    resolver.random_number(rng)
                }
            } else {
                Node::random_operator(rng)
            };
            self.tree[pos] = replacement;
        } else {
            // a one-node donor is the smallest possible splice
            let cut = tree::subtree_len(&self.tree, pos);
            if self.tree.len() - cut + 1 > self.max_depth {
                debug!("skipping subtree mutation: tree already exceeds capacity");
                return;
            }
            loop {
                let (donor, complete) = tree::random_tree(
                    self.max_depth,
                    SUBTREE_PROB_VARIABLE,
                    num_variables,
                    resolver,
                    rng,
                );
                if !complete {
                    continue;
                }
                if let Some(nodes) = tree::splice(&self.tree, pos, &donor, self.max_depth) {
                    self.tree = nodes;
                    break;
                }
            }
        }

        self.invalidate();
    }

    /// Fully parenthesised infix, resolving numbers through `resolver`.
    pub fn to_infix_with<T: TerminalResolver>(&self, resolver: &T) -> String {
        let mut out = String::new();
        tree::write_infix(&self.tree, &mut 0, resolver, &mut out);
        out
    }
}

impl Default for Expression {
    fn default() -> Self {
        Self::new(10)
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        self.same_tree(other)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_infix_with(&Literal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::node::Operator;
    use crate::expr::tree::is_well_formed;
    use crate::metrics::{compare_floats, mse, EPSILON};
    use crate::random::create_rng;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ADD: Node = Node::Operator(Operator::Add);
    const MUL: Node = Node::Operator(Operator::Mul);
    const DIV: Node = Node::Operator(Operator::Div);

    fn sample() -> Expression {
        // x0 + (x1 * 2)
        Expression::from_tree(
            vec![ADD, Node::Variable(0), MUL, Node::Variable(1), Node::Number(2.0)],
            10,
        )
    }

    #[test]
    fn test_new_is_empty_and_unevaluated() {
        let e = Expression::new(5);
        assert!(e.is_empty());
        assert!(!e.is_evaluated());
        assert_eq!(e.fitness(), f64::INFINITY);
    }

    #[test]
    fn test_random_respects_capacity() {
        let mut rng = create_rng(42);
        for _ in 0..200 {
            let e = Expression::random(15, 0.3, 4, 15, &mut rng);
            assert!(e.len() <= e.max_depth());
            assert!(is_well_formed(e.tree()));
        }
    }

    #[test]
    fn test_from_subtree() {
        let e = sample();
        let sub = Expression::from_subtree(e.tree(), 2, 10);
        assert_eq!(sub.tree(), &[MUL, Node::Variable(1), Node::Number(2.0)]);
    }

    #[test]
    fn test_evaluate_data() {
        let e = sample();
        assert!(compare_floats(e.evaluate_data(&[1.0, 3.0]), 7.0, EPSILON));
    }

    #[test]
    fn test_division_fallback() {
        let e = Expression::from_tree(vec![DIV, Node::Variable(0), Node::Variable(1)], 3);
        assert_eq!(e.evaluate_data(&[5.0, 0.0]), 1.0);
    }

    static CALLS: AtomicUsize = AtomicUsize::new(0);

    fn counting_mse(p: &[f64], a: &[f64]) -> f64 {
        CALLS.fetch_add(1, Ordering::SeqCst);
        mse(p, a)
    }

    #[test]
    fn test_evaluation_is_cached() {
        let mut e = sample();
        let data = vec![vec![1.0, 1.0], vec![2.0, 0.5]];
        let labels = [3.0, 3.0];

        let before = CALLS.load(Ordering::SeqCst);
        let f1 = e.evaluate_expression(&data, &labels, counting_mse, false);
        let f2 = e.evaluate_expression(&data, &labels, counting_mse, false);
        assert_eq!(f1.to_bits(), f2.to_bits());
        assert_eq!(CALLS.load(Ordering::SeqCst) - before, 1);

        e.evaluate_expression(&data, &labels, counting_mse, true);
        assert_eq!(CALLS.load(Ordering::SeqCst) - before, 2);
    }

    #[test]
    fn test_tree_change_clears_cache() {
        let mut e = sample();
        e.evaluate_expression(&[vec![1.0, 1.0]], &[3.0], mse, false);
        assert!(e.is_evaluated());
        e.assign_tree(vec![Node::Variable(0)]);
        assert!(!e.is_evaluated());
        assert_eq!(e.fitness(), f64::INFINITY);
    }

    #[test]
    fn test_empty_expression_keeps_infinite_fitness() {
        let mut e = Expression::new(4);
        let f = e.evaluate_expression(&[vec![1.0]], &[1.0], mse, false);
        assert_eq!(f, f64::INFINITY);
        assert!(e.is_evaluated());
    }

    #[test]
    fn test_exchange_subtree_length_and_content() {
        let mother = sample();
        let father = Expression::from_tree(vec![DIV, Node::Variable(2), Node::Number(4.0)], 10);

        let child = mother.exchange_subtree(&father, 2, 0).unwrap();
        let expected_len = 2 + father.len() + (mother.len() - 3 - 2);
        assert_eq!(child.len(), expected_len);
        assert_eq!(
            child.tree(),
            &[ADD, Node::Variable(0), DIV, Node::Variable(2), Node::Number(4.0)]
        );
        assert!(!child.is_evaluated());
    }

    #[test]
    fn test_exchange_subtree_fails_over_capacity() {
        let mother = Expression::from_tree(sample().tree().to_vec(), 5);
        let father = Expression::from_tree(vec![DIV, Node::Variable(2), Node::Number(4.0)], 5);
        // replacing a terminal by a three-node subtree gives 7 > 5
        assert!(mother.exchange_subtree(&father, 1, 0).is_none());
    }

    #[test]
    fn test_exchange_subtree_rejects_cut_points_out_of_range() {
        let mother = Expression::from_tree(vec![ADD, Node::Variable(0), Node::Variable(1)], 10);
        let father = Expression::from_tree(vec![Node::Variable(2)], 10);
        assert!(mother.exchange_subtree(&father, 1, 99).is_none());
        assert!(mother.exchange_subtree(&father, 3, 0).is_none());
        assert!(mother.exchange_subtree(&father, 99, 0).is_none());

        let empty = Expression::new(10);
        let child = empty.exchange_subtree(&mother, 0, 0).unwrap();
        assert_eq!(child.tree(), mother.tree());
        assert!(is_well_formed(child.tree()));
    }

    #[test]
    fn test_tree_crossover_children_fit() {
        let mut rng = create_rng(11);
        for _ in 0..100 {
            let a = Expression::random(12, 0.4, 3, 12, &mut rng);
            let b = Expression::random(12, 0.4, 3, 12, &mut rng);
            let (c1, c2) = a.tree_crossover(&b, &mut rng).unwrap();
            assert!(c1.len() <= 12 && c2.len() <= 12);
            assert!(is_well_formed(c1.tree()));
            assert!(is_well_formed(c2.tree()));
        }
    }

    #[test]
    fn test_tree_crossover_refuses_oversized_parent() {
        let mut rng = create_rng(3);
        let big = sample();
        let small = Expression::from_tree(vec![Node::Variable(0)], 3);
        assert!(small.tree_crossover(&big, &mut rng).is_none());
    }

    #[test]
    fn test_mutate_gp_keeps_structure() {
        let mut rng = create_rng(5);
        for _ in 0..200 {
            let mut e = Expression::random(10, 0.3, 3, 10, &mut rng);
            e.set_fitness(1.0);
            e.mutate_gp(3, &mut rng);
            assert!(e.len() <= 10);
            assert!(is_well_formed(e.tree()));
            assert!(!e.is_evaluated());
        }
    }

    #[test]
    fn test_mutate_gp_on_empty_is_noop() {
        let mut rng = create_rng(5);
        let mut e = Expression::new(4);
        e.mutate_gp(2, &mut rng);
        assert!(e.is_empty());
    }

    #[test]
    fn test_display_and_parse_agree() {
        let mut rng = create_rng(21);
        let rows = [vec![0.3, -1.2, 2.0], vec![1.7, 0.4, -0.9]];
        for _ in 0..50 {
            let e = Expression::random(20, 0.5, 3, 20, &mut rng);
            let parsed = Expression::from_infix(&e.to_string(), 20, 3).unwrap();
            assert_eq!(parsed.len(), e.len());
            for row in &rows {
                let (x, y) = (e.evaluate_data(row), parsed.evaluate_data(row));
                assert!((x - y).abs() <= 1e-9 * x.abs().max(1.0), "{x} vs {y}");
            }
        }
    }

    #[test]
    fn test_from_infix_too_long() {
        let err = Expression::from_infix("( x0 + ( x1 * 2 ) )", 4, 2).unwrap_err();
        assert!(matches!(err, SymregError::ExpressionTooLong { len: 5, max: 4 }));
    }

    #[test]
    fn test_from_infix_or_empty() {
        let e = Expression::from_infix_or_empty("( x0 + ", 10, 1);
        assert!(e.is_empty());
        let e = Expression::from_infix_or_empty("( x0 + 1 )", 10, 1);
        assert_eq!(e.len(), 3);
    }

    #[test]
    fn test_compute_depth() {
        assert_eq!(sample().compute_depth(0), 3);
    }

    #[test]
    fn test_equality_is_structural() {
        let mut a = sample();
        let b = sample();
        a.set_fitness(0.5);
        assert_eq!(a, b);
    }
}
