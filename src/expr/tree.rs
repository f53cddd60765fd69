//! Algorithms over preorder-flattened trees.
//!
//! A tree is a `[Node]` where every operator is immediately followed by its
//! left subtree and then its right subtree. Subtree boundaries are recovered
//! with a single forward scan that counts owed branches: start at one, each
//! node fills one branch, each operator owes two more. The subtree ends when
//! nothing is owed.

use super::node::{Node, Operator};
use super::resolver::TerminalResolver;
use crate::metrics::{compare_floats, EPSILON};
use crate::random::unit;
use rand::Rng;

/// Returns `(length, still_open)` of the branch scan starting at `start`.
///
/// `still_open` is non-zero when the slice ends before the subtree closes.
fn scan(tree: &[Node], start: usize) -> (usize, usize) {
    let mut open = 1usize;
    let mut pos = start;
    while open > 0 {
        let Some(node) = tree.get(pos) else {
            break;
        };
        if node.is_operator() {
            open += 2;
        }
        open -= 1;
        pos += 1;
    }
    (pos.saturating_sub(start), open)
}

/// Number of nodes in the subtree rooted at `start`.
///
/// # Complexity
/// O(subtree size)
pub fn subtree_len(tree: &[Node], start: usize) -> usize {
    scan(tree, start).0
}

/// The subtree rooted at `start`, borrowed from `tree`.
///
/// Returns an empty slice when `start` is out of range.
pub fn get_subtree(tree: &[Node], start: usize) -> &[Node] {
    let len = subtree_len(tree, start);
    tree.get(start..start + len).unwrap_or(&[])
}

/// True when `tree` is exactly one complete expression.
pub fn is_well_formed(tree: &[Node]) -> bool {
    if tree.is_empty() {
        return false;
    }
    let (len, open) = scan(tree, 0);
    open == 0 && len == tree.len()
}

/// Replaces the subtree of `tree` at `pos` with `donor`.
///
/// Returns `None` when `pos` is not a node of a non-empty `tree`, or when
/// the resulting length would exceed `max_len`. An empty `tree` takes the
/// donor whole. The child has exactly
/// `pos + donor.len() + (tree.len() - subtree_len(tree, pos) - pos)` nodes.
pub fn splice(tree: &[Node], pos: usize, donor: &[Node], max_len: usize) -> Option<Vec<Node>> {
    if pos >= tree.len() && !tree.is_empty() {
        return None;
    }
    let pos = pos.min(tree.len());
    let cut = subtree_len(tree, pos);
    let new_len = pos + donor.len() + (tree.len() - cut - pos);
    if new_len > max_len {
        return None;
    }

    let mut child = Vec::with_capacity(new_len);
    child.extend_from_slice(&tree[..pos]);
    child.extend_from_slice(donor);
    child.extend_from_slice(&tree[pos + cut..]);
    Some(child)
}

/// Fills up to `max_len` slots with a random tree.
///
/// At slot `i` with `open` owed branches, a terminal is emitted when a
/// uniform draw is at most `(open² + 1) / (max_len - i)`, otherwise an
/// operator. The ratio grows as the budget shrinks, so trees close before
/// running out of slots. Returns the nodes written and whether every branch
/// was closed.
pub fn random_tree<T, R>(
    max_len: usize,
    prob_variable: f64,
    num_variables: usize,
    resolver: &T,
    rng: &mut R,
) -> (Vec<Node>, bool)
where
    T: TerminalResolver,
    R: Rng,
{
    let mut tree = Vec::with_capacity(max_len);
    let mut open = 1usize;
    let mut i = 0usize;

    while i < max_len && open > 0 {
        let terminal_ratio = (open * open + 1) as f64 / (max_len - i) as f64;

        if unit(rng) > terminal_ratio {
            tree.push(Node::random_operator(rng));
            open += 1;
        } else {
            let node = if unit(rng) < prob_variable {
                Node::random_variable(num_variables, rng)
            } else {
                resolver.random_number(rng)
            };
            tree.push(node);
            open -= 1;
        }
        i += 1;
    }

    (tree, open == 0)
}

/// Applies `op`; division by a value within [`EPSILON`] of zero yields `1.0`.
#[inline]
pub fn apply(op: Operator, left: f64, right: f64) -> f64 {
    match op {
        Operator::Add => left + right,
        Operator::Sub => left - right,
        Operator::Mul => left * right,
        Operator::Div => {
            if compare_floats(right, 0.0, EPSILON) {
                1.0
            } else {
                left / right
            }
        }
    }
}

/// Evaluates the whole tree on one feature row.
///
/// An empty tree evaluates to `0.0`, as do variables outside the row.
pub fn evaluate<T: TerminalResolver>(tree: &[Node], row: &[f64], resolver: &T) -> f64 {
    let mut cursor = 0;
    evaluate_at(tree, &mut cursor, row, resolver)
}

fn evaluate_at<T: TerminalResolver>(
    tree: &[Node],
    cursor: &mut usize,
    row: &[f64],
    resolver: &T,
) -> f64 {
    let Some(node) = tree.get(*cursor) else {
        return 0.0;
    };
    *cursor += 1;

    match *node {
        Node::Number(payload) => resolver.number(payload),
        Node::Variable(index) => row.get(index as usize).copied().unwrap_or(0.0),
        Node::Operator(op) => {
            let left = evaluate_at(tree, cursor, row, resolver);
            let right = evaluate_at(tree, cursor, row, resolver);
            apply(op, left, right)
        }
    }
}

/// Depth of the subtree rooted at `start`; a lone terminal has depth 1.
pub fn depth(tree: &[Node], start: usize) -> usize {
    let mut cursor = start;
    depth_at(tree, &mut cursor)
}

fn depth_at(tree: &[Node], cursor: &mut usize) -> usize {
    let Some(node) = tree.get(*cursor) else {
        return 0;
    };
    *cursor += 1;

    if node.is_terminal() {
        1
    } else {
        let left = depth_at(tree, cursor);
        let right = depth_at(tree, cursor);
        1 + left.max(right)
    }
}

/// Writes the subtree at `cursor` as fully parenthesised infix.
pub(crate) fn write_infix<T: TerminalResolver>(
    tree: &[Node],
    cursor: &mut usize,
    resolver: &T,
    out: &mut String,
) {
    let Some(node) = tree.get(*cursor) else {
        return;
    };
    *cursor += 1;

    match *node {
        Node::Number(payload) => out.push_str(&resolver.number(payload).to_string()),
        Node::Variable(index) => {
            out.push('x');
            out.push_str(&index.to_string());
        }
        Node::Operator(op) => {
            out.push_str("( ");
            write_infix(tree, cursor, resolver, out);
            out.push(' ');
            out.push_str(op.symbol());
            out.push(' ');
            write_infix(tree, cursor, resolver, out);
            out.push_str(" )");
        }
    }
}
