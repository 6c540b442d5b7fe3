//! Shrink candidate construction shared by the generators.
//!
//! Candidates are always ordered with the larger jumps first. Numbers try the
//! halving steps towards the origin before the origin itself, and lists try
//! short prefixes before longer ones.

use crate::tree::Tree;
use std::rc::Rc;

/// Candidates between `value` and `origin`, excluding `value`.
///
/// The jumps `value - diff/2, value - diff/4, ..., value - 1` come first and
/// the exact origin last, so a depth-first search converges on the boundary
/// of a monotone predicate.
pub fn towards(origin: i128, value: i128) -> Vec<i128> {
    if origin == value {
        return Vec::new();
    }
    let diff = value - origin;
    let mut candidates = Vec::new();
    let mut step = diff / 2;
    while step != 0 {
        candidates.push(value - step);
        step /= 2;
    }
    if candidates.last() != Some(&origin) {
        candidates.push(origin);
    }
    candidates.dedup();
    candidates
}

const FLOAT_HALVINGS: usize = 8;

/// Float counterpart of [`towards`]. Tries a bounded number of halvings, the
/// integral part, then the origin.
pub fn towards_f64(origin: f64, value: f64) -> Vec<f64> {
    if !value.is_finite() {
        return vec![origin];
    }
    if origin == value {
        return Vec::new();
    }
    let mut candidates = Vec::new();
    let mut step = (value - origin) / 2.0;
    for _ in 0..FLOAT_HALVINGS {
        let candidate = value - step;
        if candidate == value {
            break;
        }
        candidates.push(candidate);
        step /= 2.0;
    }
    let truncated = value.trunc();
    if truncated != value && is_between(origin, value, truncated) {
        candidates.push(truncated);
    }
    candidates.push(origin);
    candidates.dedup();
    candidates
}

fn is_between(origin: f64, value: f64, candidate: f64) -> bool {
    if origin <= value {
        origin <= candidate && candidate <= value
    } else {
        value <= candidate && candidate <= origin
    }
}

/// Every prefix length in `min_len..len`, halving jumps first.
pub fn prefix_lengths(min_len: usize, len: usize) -> Vec<usize> {
    if len <= min_len {
        return Vec::new();
    }
    let mut lengths: Vec<usize> = towards(min_len as i128, len as i128)
        .into_iter()
        .map(|candidate| candidate as usize)
        .collect();
    for candidate in min_len..len {
        if !lengths.contains(&candidate) {
            lengths.push(candidate);
        }
    }
    lengths
}

/// How a list of element trees may shrink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ListShrink {
    /// Shortest length truncation may produce. `None` disables truncation.
    pub min_len: Option<usize>,
    /// Whether single elements may be dropped from the middle.
    pub removals: bool,
}

impl ListShrink {
    pub fn truncating(min_len: usize) -> Self {
        ListShrink {
            min_len: Some(min_len),
            removals: false,
        }
    }

    pub fn fixed() -> Self {
        ListShrink {
            min_len: None,
            removals: false,
        }
    }

    pub fn with_removals(mut self) -> Self {
        self.removals = true;
        self
    }
}

/// Combine element trees into a tree of lists.
///
/// Shrinks by truncation first, then (optionally) by removing one element,
/// then by replacing one element with one of its own shrinks.
pub(crate) fn list<T: Clone + 'static>(trees: Vec<Tree<T>>, shape: ListShrink) -> Tree<Vec<T>> {
    let value = trees.iter().map(|tree| tree.value.clone()).collect();
    let trees: Rc<[Tree<T>]> = trees.into();
    Tree::lazy(value, move || list_children(&trees, shape))
}

fn list_children<T: Clone + 'static>(trees: &Rc<[Tree<T>]>, shape: ListShrink) -> Vec<Tree<Vec<T>>> {
    let len = trees.len();
    let mut children = Vec::new();

    if let Some(min_len) = shape.min_len {
        for prefix in prefix_lengths(min_len, len) {
            children.push(list(trees[..prefix].to_vec(), shape));
        }
        if shape.removals && len > min_len {
            // dropping the last element is already the longest prefix
            for index in 0..len.saturating_sub(1) {
                let mut rest = trees.to_vec();
                rest.remove(index);
                children.push(list(rest, shape));
            }
        }
    }

    for (index, tree) in trees.iter().enumerate() {
        for shrunk in tree.children() {
            let mut replaced = trees.to_vec();
            replaced[index] = shrunk.clone();
            children.push(list(replaced, shape));
        }
    }

    children
}

/// Pair two trees, shrinking the left component before the right.
pub(crate) fn zip<A, B>(left: Tree<A>, right: Tree<B>) -> Tree<(A, B)>
where
    A: Clone + 'static,
    B: Clone + 'static,
{
    let value = (left.value.clone(), right.value.clone());
    Tree::lazy(value, move || {
        let mut children: Vec<Tree<(A, B)>> = left
            .children()
            .iter()
            .map(|shrunk| zip(shrunk.clone(), right.clone()))
            .collect();
        children.extend(
            right
                .children()
                .iter()
                .map(|shrunk| zip(left.clone(), shrunk.clone())),
        );
        children
    })
}
