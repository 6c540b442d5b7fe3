//! Rose tree implementation for shrinking test values.
//!
//! A [`Tree`] pairs a generated value with the ordered candidates it may
//! shrink to. Children are forced one level at a time and cached, so mapping,
//! binding or filtering a tree never walks further than the shrink search
//! actually looks.

use std::cell::{OnceCell, RefCell};
use std::fmt;
use std::rc::Rc;

type Thunk<T> = Box<dyn FnOnce() -> Vec<Tree<T>>>;

/// The children of a tree node, computed on first access.
struct Forest<T> {
    cached: OnceCell<Vec<Tree<T>>>,
    pending: RefCell<Option<Thunk<T>>>,
}

impl<T> Forest<T> {
    fn ready(children: Vec<Tree<T>>) -> Self {
        Forest {
            cached: OnceCell::from(children),
            pending: RefCell::new(None),
        }
    }

    fn lazy<F>(thunk: F) -> Self
    where
        F: FnOnce() -> Vec<Tree<T>> + 'static,
    {
        Forest {
            cached: OnceCell::new(),
            pending: RefCell::new(Some(Box::new(thunk))),
        }
    }

    fn force(&self) -> &[Tree<T>] {
        self.cached.get_or_init(|| {
            let thunk = self.pending.borrow_mut().take();
            thunk.map(|f| f()).unwrap_or_default()
        })
    }

    fn is_forced(&self) -> bool {
        self.cached.get().is_some()
    }
}

impl<T> Drop for Forest<T> {
    // Unlinks uniquely owned descendants one at a time so long shrink chains
    // never recurse through the drop glue.
    fn drop(&mut self) {
        let mut stack = self.cached.take().unwrap_or_default();
        while let Some(tree) = stack.pop() {
            if let Ok(mut forest) = Rc::try_unwrap(tree.forest) {
                if let Some(children) = forest.cached.take() {
                    stack.extend(children);
                }
            }
        }
    }
}

/// A rose tree containing a value and its shrink possibilities.
///
/// Trees are used to represent generated values along with their
/// possible shrinks, enabling automatic shrinking of failing test cases.
pub struct Tree<T> {
    pub value: T,
    forest: Rc<Forest<T>>,
}

impl<T: Clone> Clone for Tree<T> {
    fn clone(&self) -> Self {
        Tree {
            value: self.value.clone(),
            forest: Rc::clone(&self.forest),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Tree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Tree");
        s.field("value", &self.value);
        match self.forest.cached.get() {
            Some(children) => s.field("children", &children.len()),
            None => s.field("children", &"<unforced>"),
        };
        s.finish()
    }
}

impl<T> Tree<T> {
    /// Create a new tree with the given value and no children.
    pub fn singleton(value: T) -> Self {
        Tree {
            value,
            forest: Rc::new(Forest::ready(Vec::new())),
        }
    }

    /// Create a new tree with the given value and children.
    pub fn with_children(value: T, children: Vec<Tree<T>>) -> Self {
        Tree {
            value,
            forest: Rc::new(Forest::ready(children)),
        }
    }

    /// Create a tree whose children are computed the first time they are
    /// inspected.
    pub fn lazy<F>(value: T, children: F) -> Self
    where
        F: FnOnce() -> Vec<Tree<T>> + 'static,
    {
        Tree {
            value,
            forest: Rc::new(Forest::lazy(children)),
        }
    }

    /// The immediate shrink candidates, nearest first.
    pub fn children(&self) -> &[Tree<T>] {
        self.forest.force()
    }

    /// Whether the children of this node have been computed yet.
    pub fn is_expanded(&self) -> bool {
        self.forest.is_forced()
    }

    /// Get the value from the tree.
    pub fn outcome(&self) -> &T {
        &self.value
    }

    /// Check if the tree has any children (shrinks).
    pub fn has_shrinks(&self) -> bool {
        !self.children().is_empty()
    }

    /// Values of the immediate children, in the order shrinking tries them.
    pub fn shrinks(&self) -> Vec<&T> {
        self.children().iter().map(|child| &child.value).collect()
    }

    /// Walk the first-child chain from the root, collecting at most
    /// `max_depth + 1` values.
    pub fn expand(&self, max_depth: usize) -> Vec<&T> {
        let mut result = vec![&self.value];
        let mut current = self;
        for _ in 0..max_depth {
            match current.children().first() {
                Some(child) => {
                    result.push(&child.value);
                    current = child;
                }
                None => break,
            }
        }
        result
    }

    /// Count the total number of nodes in the tree.
    ///
    /// Forces the whole tree; only meant for finite, modest trees.
    pub fn count_nodes(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(tree) = stack.pop() {
            count += 1;
            stack.extend(tree.children());
        }
        count
    }

    /// Get the depth of the tree. A singleton has depth 1.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1)];
        while let Some((tree, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            stack.extend(tree.children().iter().map(|child| (child, depth + 1)));
        }
        deepest
    }
}

impl<T: Clone + 'static> Tree<T> {
    /// Build a tree by repeatedly applying a shrink function.
    pub fn unfold<F>(value: T, shrink: F) -> Self
    where
        F: Fn(&T) -> Vec<T> + 'static,
    {
        Self::unfold_rc(value, Rc::new(shrink))
    }

    fn unfold_rc(value: T, shrink: Rc<dyn Fn(&T) -> Vec<T>>) -> Self {
        let seed = value.clone();
        Tree::lazy(value, move || {
            shrink(&seed)
                .into_iter()
                .map(|candidate| Tree::unfold_rc(candidate, Rc::clone(&shrink)))
                .collect()
        })
    }

    /// Map a function over the tree values.
    pub fn map<U, F>(self, f: F) -> Tree<U>
    where
        F: Fn(T) -> U + 'static,
        U: 'static,
    {
        self.map_rc(Rc::new(f))
    }

    pub(crate) fn map_rc<U: 'static>(self, f: Rc<dyn Fn(T) -> U>) -> Tree<U> {
        let Tree { value, forest } = self;
        let mapped = f(value);
        Tree::lazy(mapped, move || {
            forest
                .force()
                .iter()
                .cloned()
                .map(|child| child.map_rc(Rc::clone(&f)))
                .collect()
        })
    }

    /// Substitute each value with the tree `f` produces for it.
    ///
    /// The shrinks of the new root come first, followed by the original
    /// shrinks pushed through `f`.
    pub fn bind<U, F>(self, f: F) -> Tree<U>
    where
        F: Fn(&T) -> Tree<U> + 'static,
        U: Clone + 'static,
    {
        self.bind_rc(Rc::new(f))
    }

    fn bind_rc<U: Clone + 'static>(self, f: Rc<dyn Fn(&T) -> Tree<U>>) -> Tree<U> {
        let Tree { value, forest } = self;
        let Tree {
            value: bound,
            forest: bound_forest,
        } = f(&value);
        Tree::lazy(bound, move || {
            let mut children = bound_forest.force().to_vec();
            children.extend(
                forest
                    .force()
                    .iter()
                    .cloned()
                    .map(|child| child.bind_rc(Rc::clone(&f))),
            );
            children
        })
    }

    /// Like `bind`, except the continuation may decline a value. A declined
    /// root yields `None`; declined shrinks are dropped.
    pub(crate) fn bind_opt<U>(self, f: Rc<dyn Fn(&T) -> Option<Tree<U>>>) -> Option<Tree<U>>
    where
        U: Clone + 'static,
    {
        let root = f(&self.value)?;
        Some(self.graft(root, f))
    }

    /// Attach `root`, already computed from this tree's value, above this
    /// tree's shrinks pushed through `f`.
    pub(crate) fn graft<U>(self, root: Tree<U>, f: Rc<dyn Fn(&T) -> Option<Tree<U>>>) -> Tree<U>
    where
        U: Clone + 'static,
    {
        let Tree {
            value: bound,
            forest: bound_forest,
        } = root;
        let forest = self.forest;
        Tree::lazy(bound, move || {
            let mut children = bound_forest.force().to_vec();
            children.extend(
                forest
                    .force()
                    .iter()
                    .cloned()
                    .filter_map(|child| child.bind_opt(Rc::clone(&f))),
            );
            children
        })
    }

    /// Filter the tree, keeping only values that satisfy the predicate.
    ///
    /// Returns `None` when the root fails. A failing child is replaced by its
    /// passing children, or by its first passing descendant when none of its
    /// children pass.
    pub fn filter<F>(self, predicate: F) -> Option<Tree<T>>
    where
        F: Fn(&T) -> bool + 'static,
    {
        self.filter_rc(Rc::new(predicate))
    }

    pub(crate) fn filter_rc(self, predicate: Rc<dyn Fn(&T) -> bool>) -> Option<Tree<T>> {
        if !predicate(&self.value) {
            return None;
        }
        Some(self.retain(predicate))
    }

    fn retain(self, predicate: Rc<dyn Fn(&T) -> bool>) -> Tree<T> {
        let Tree { value, forest } = self;
        Tree::lazy(value, move || promote(forest.force(), &predicate))
    }
}

/// Most nodes [`first_passing`] visits below one rejected child.
const PROMOTE_SEARCH_LIMIT: usize = 256;

/// Replace each rejected child by its passing children, or failing that by
/// its first passing descendant in pre-order.
fn promote<T: Clone + 'static>(
    children: &[Tree<T>],
    predicate: &Rc<dyn Fn(&T) -> bool>,
) -> Vec<Tree<T>> {
    let mut kept = Vec::new();
    for child in children {
        if predicate(&child.value) {
            kept.push(child.clone().retain(Rc::clone(predicate)));
            continue;
        }
        let passing: Vec<&Tree<T>> = child
            .children()
            .iter()
            .filter(|grandchild| predicate(&grandchild.value))
            .collect();
        if passing.is_empty() {
            if let Some(descendant) = first_passing(child, predicate) {
                kept.push(descendant.retain(Rc::clone(predicate)));
            }
        } else {
            kept.extend(
                passing
                    .into_iter()
                    .map(|grandchild| grandchild.clone().retain(Rc::clone(predicate))),
            );
        }
    }
    kept
}

fn first_passing<T: Clone + 'static>(root: &Tree<T>, predicate: &Rc<dyn Fn(&T) -> bool>) -> Option<Tree<T>> {
    let mut work = vec![root.clone()];
    let mut visited = 0;
    while let Some(node) = work.pop() {
        if predicate(&node.value) {
            return Some(node);
        }
        visited += 1;
        if visited >= PROMOTE_SEARCH_LIMIT {
            return None;
        }
        work.extend(node.children().iter().rev().cloned());
    }
    None
}

impl<T> From<T> for Tree<T> {
    fn from(value: T) -> Self {
        Tree::singleton(value)
    }
}
