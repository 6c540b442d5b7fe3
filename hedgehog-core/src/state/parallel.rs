//! Parallel state machine tests and the linearizability check.

use super::command::{panic_message, BranchStep, DynAction};
use super::env::{Environment, Value};
use super::resolve::Resolve;
use super::sequential::{action_list, describe, generate_actions, revalidate};
use super::StateMachine;
use crate::error::{ActionFailure, ParallelFailure};
use crate::gen::Gen;
use crate::property::Property;
use crate::range::Range;
use crate::shrink;
use log::{debug, trace};
use std::collections::HashSet;
use std::fmt::{self, Debug, Display};
use std::rc::Rc;
use std::sync::Barrier;
use std::thread;

type ActionRef<S> = Rc<dyn DynAction<S>>;

/// One of the two concurrent branches of a parallel test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Branch {
    Left,
    Right,
}

impl Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Branch::Left => write!(f, "left"),
            Branch::Right => write!(f, "right"),
        }
    }
}

/// A sequential prefix followed by two branches run concurrently.
pub struct Parallel<S> {
    prefix: Vec<ActionRef<S>>,
    left: Vec<ActionRef<S>>,
    right: Vec<ActionRef<S>>,
}

impl<S> Parallel<S> {
    pub fn prefix(&self) -> Vec<String> {
        describe(&self.prefix)
    }

    pub fn left(&self) -> Vec<String> {
        describe(&self.left)
    }

    pub fn right(&self) -> Vec<String> {
        describe(&self.right)
    }

    /// Total number of actions.
    pub fn len(&self) -> usize {
        self.prefix.len() + self.left.len() + self.right.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S> Clone for Parallel<S> {
    fn clone(&self) -> Self {
        Parallel {
            prefix: self.prefix.clone(),
            left: self.left.clone(),
            right: self.right.clone(),
        }
    }
}

impl<S> Debug for Parallel<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parallel")
            .field("prefix", &self.prefix())
            .field("left", &self.left())
            .field("right", &self.right())
            .finish()
    }
}

impl<S> StateMachine<S>
where
    S: Resolve + Clone + Debug + 'static,
{
    /// Generate a prefix with a length drawn from `prefix`, then two branches
    /// with lengths drawn from `branch`.
    ///
    /// Both branches are generated independently from the state after the
    /// prefix, so they may touch the same resources.
    pub fn parallel(&self, prefix: Range<usize>, branch: Range<usize>) -> Gen<Parallel<S>> {
        let machine = self.clone();
        Gen::new(move |size, seed| {
            let (prefix_seed, rest) = seed.split();
            let (left_seed, right_seed) = rest.split();

            let mut state = machine.initial.clone();
            let prefix_trees = generate_actions(&machine.commands, &mut state, prefix, size, prefix_seed);
            let left_trees = generate_actions(&machine.commands, &mut state.clone(), branch, size, left_seed);
            let right_trees = generate_actions(&machine.commands, &mut state, branch, size, right_seed);

            let initial = machine.initial.clone();
            let branches = shrink::zip(action_list(left_trees, branch), action_list(right_trees, branch));
            shrink::zip(action_list(prefix_trees, prefix), branches).map(move |(prefix, (left, right))| {
                let mut state = initial.clone();
                let mut bound = HashSet::new();
                let prefix = revalidate(&mut state, &mut bound, prefix);
                let left = revalidate(&mut state.clone(), &mut bound.clone(), left);
                let right = revalidate(&mut state, &mut bound, right);
                Parallel { prefix, left, right }
            })
        })
    }
}

/// Run the prefix, then both branches on their own threads, then check that
/// the observed results match some sequential ordering of the branches.
pub fn execute_parallel<S>(machine: &StateMachine<S>, parallel: &Parallel<S>) -> Result<(), ParallelFailure>
where
    S: Resolve + Clone + Debug + 'static,
{
    machine.run_setup();
    let mut state = machine.initial.clone();
    let mut env = Environment::new();
    let mut prefix_outputs = Vec::with_capacity(parallel.prefix.len());
    for action in &parallel.prefix {
        prefix_outputs.push(action.execute(&mut state, &mut env).map_err(ParallelFailure::Prefix)?);
    }

    let left_steps = parallel.left.iter().map(|action| action.branch_step()).collect();
    let right_steps = parallel.right.iter().map(|action| action.branch_step()).collect();
    let (left, right) = run_branches(&env, left_steps, right_steps);

    let left_outputs = left.map_err(|failure| {
        debug!("left branch failed: {failure}");
        ParallelFailure::Branch {
            branch: Branch::Left,
            failure,
        }
    })?;
    let right_outputs = right.map_err(|failure| {
        debug!("right branch failed: {failure}");
        ParallelFailure::Branch {
            branch: Branch::Right,
            failure,
        }
    })?;

    linearize(&machine.initial, parallel, &prefix_outputs, &left_outputs, &right_outputs)
}

type BranchResult = Result<Vec<Value>, ActionFailure>;

/// Run both branches on scoped threads released together by a barrier.
/// Each branch works on its own fork of `env`.
fn run_branches(env: &Environment, left: Vec<Box<dyn BranchStep>>, right: Vec<Box<dyn BranchStep>>) -> (BranchResult, BranchResult) {
    let barrier = Barrier::new(2);
    let barrier = &barrier;
    thread::scope(|scope| {
        let spawn = |steps: Vec<Box<dyn BranchStep>>| {
            let mut env = env.fork();
            scope.spawn(move || {
                barrier.wait();
                run_branch(&steps, &mut env)
            })
        };
        let left = spawn(left);
        let right = spawn(right);
        (join_branch(left), join_branch(right))
    })
}

fn join_branch(handle: thread::ScopedJoinHandle<'_, BranchResult>) -> BranchResult {
    handle.join().unwrap_or_else(|payload| {
        Err(ActionFailure::Executor {
            action: "branch".to_string(),
            message: panic_message(payload.as_ref()),
        })
    })
}

fn run_branch(steps: &[Box<dyn BranchStep>], env: &mut Environment) -> BranchResult {
    let mut outputs = Vec::with_capacity(steps.len());
    for step in steps {
        trace!("branch running {}", step.describe());
        outputs.push(step.run(env)?);
    }
    Ok(outputs)
}

/// Check captured results against every ordering of the two branches that
/// keeps each branch's own order.
///
/// Orderings are replayed from a fresh environment without running any
/// executor. `require` and `ensure` must hold for every action of an
/// ordering. Orderings that share a rejected beginning are skipped together.
pub fn linearize<S>(
    initial: &S,
    parallel: &Parallel<S>,
    prefix_outputs: &[Value],
    left_outputs: &[Value],
    right_outputs: &[Value],
) -> Result<(), ParallelFailure>
where
    S: Resolve + Clone + Debug + 'static,
{
    let mut state = initial.clone();
    let mut env = Environment::new();
    for (index, action) in parallel.prefix.iter().enumerate() {
        let replayed = prefix_outputs
            .get(index)
            .is_some_and(|output| action.replay(&mut state, &mut env, output));
        if !replayed {
            let action = action.describe();
            debug!("prefix action {action} did not replay");
            return Err(ParallelFailure::PrefixReplay { action });
        }
    }

    let left: Vec<(&ActionRef<S>, &Value)> = parallel.left.iter().zip(left_outputs).collect();
    let right: Vec<(&ActionRef<S>, &Value)> = parallel.right.iter().zip(right_outputs).collect();

    let mut pending = vec![(state, env, 0, 0)];
    while let Some((state, env, taken_left, taken_right)) = pending.pop() {
        if taken_left == left.len() && taken_right == right.len() {
            return Ok(());
        }
        // right first so the left step is explored first
        if let Some((action, output)) = right.get(taken_right) {
            let (mut state, mut env) = (state.clone(), env.clone());
            if action.replay(&mut state, &mut env, output) {
                pending.push((state, env, taken_left, taken_right + 1));
            } else {
                trace!("rejected {} after {taken_left} left and {taken_right} right", action.describe());
            }
        }
        if let Some((action, output)) = left.get(taken_left) {
            let (mut state, mut env) = (state, env);
            if action.replay(&mut state, &mut env, output) {
                pending.push((state, env, taken_left + 1, taken_right));
            } else {
                trace!("rejected {} after {taken_left} left and {taken_right} right", action.describe());
            }
        }
    }

    let interleavings = binomial(left.len() + right.len(), left.len());
    debug!("none of {interleavings} interleavings linearize");
    Err(ParallelFailure::Linearization {
        interleavings,
        prefix: results(&parallel.prefix, prefix_outputs),
        left: results(&parallel.left, left_outputs),
        right: results(&parallel.right, right_outputs),
    })
}

fn results<S>(actions: &[ActionRef<S>], outputs: &[Value]) -> Vec<String> {
    actions
        .iter()
        .zip(outputs)
        .map(|(action, output)| format!("{} -> {}", action.describe(), action.describe_output(output)))
        .collect()
}

fn binomial(n: usize, k: usize) -> usize {
    let k = k.min(n - k);
    (0..k).fold(1usize, |acc, i| acc.saturating_mul(n - i) / (i + 1))
}

/// Every merge of `left` and `right` that keeps the relative order of each.
///
/// There are `C(m + n, m)` of them for lengths `m` and `n`.
pub fn interleavings<T: Clone>(left: &[T], right: &[T]) -> Vec<Vec<T>> {
    let mut complete = Vec::new();
    let mut pending = vec![(Vec::with_capacity(left.len() + right.len()), 0, 0)];
    while let Some((merged, i, j)) = pending.pop() {
        if i == left.len() && j == right.len() {
            complete.push(merged);
            continue;
        }
        if j < right.len() {
            let mut next = merged.clone();
            next.push(right[j].clone());
            pending.push((next, i, j + 1));
        }
        if i < left.len() {
            let mut next = merged;
            next.push(left[i].clone());
            pending.push((next, i + 1, j));
        }
    }
    complete
}

/// A property that executes generated parallel tests of `machine`'s commands.
pub fn for_all_parallel<S>(machine: &StateMachine<S>, prefix: Range<usize>, branch: Range<usize>) -> Property<Parallel<S>>
where
    S: Resolve + Clone + Debug + 'static,
{
    let runner = machine.clone();
    Property::new(machine.parallel(prefix, branch), move |parallel| {
        execute_parallel(&runner, parallel).map_err(|failure| failure.to_string())
    })
    .named("parallel state machine")
}
