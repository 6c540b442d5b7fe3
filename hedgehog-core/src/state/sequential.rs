//! Sequential state machine tests.

use super::command::{DynAction, DynCommand};
use super::env::Environment;
use super::resolve::Resolve;
use super::var::SymbolicId;
use super::StateMachine;
use crate::data::{Seed, Size};
use crate::error::{ActionFailure, ResolveError};
use crate::gen::Gen;
use crate::property::Property;
use crate::range::Range;
use crate::shrink::{self, ListShrink};
use crate::tree::Tree;
use log::{debug, trace};
use std::collections::HashSet;
use std::fmt::{self, Debug};
use std::rc::Rc;

type ActionRef<S> = Rc<dyn DynAction<S>>;

/// A sequence of actions to execute sequentially.
pub struct Sequential<S> {
    pub(super) actions: Vec<ActionRef<S>>,
}

impl<S> Sequential<S> {
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Each action as `Var3 = push(5)`.
    pub fn descriptions(&self) -> Vec<String> {
        describe(&self.actions)
    }
}

impl<S> Clone for Sequential<S> {
    fn clone(&self) -> Self {
        Sequential {
            actions: self.actions.clone(),
        }
    }
}

impl<S> Debug for Sequential<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.descriptions()).finish()
    }
}

/// The model state and environment left behind by a successful run.
#[derive(Debug)]
pub struct Execution<S> {
    pub state: S,
    pub env: Environment,
}

impl<S: Resolve> Execution<S> {
    /// The model state with every variable replaced by its value.
    pub fn resolved_state(&self) -> Result<S::Resolved, ResolveError> {
        self.state.resolve(&self.env)
    }
}

pub(super) fn describe<S>(actions: &[ActionRef<S>]) -> Vec<String> {
    actions.iter().map(|action| action.describe()).collect()
}

/// Pick a length from `range` for the given size.
pub(super) fn draw_length(range: Range<usize>, size: Size, seed: Seed) -> usize {
    let (lower, upper) = range.bounds(size);
    let (offset, _) = seed.next_bounded((upper - lower) as u64 + 1);
    lower + offset as usize
}

/// Generate up to a `length`-drawn number of actions, folding each into
/// `state` as it is generated. Stops early once no command is available.
pub(super) fn generate_actions<S>(
    commands: &[Rc<dyn DynCommand<S>>],
    state: &mut S,
    length: Range<usize>,
    size: Size,
    seed: Seed,
) -> Vec<Tree<ActionRef<S>>> {
    let (length_seed, mut seed) = seed.split();
    let count = draw_length(length, size, length_seed);
    let mut trees = Vec::with_capacity(count);
    let mut misses = 0;

    while trees.len() < count {
        let available: Vec<&Rc<dyn DynCommand<S>>> =
            commands.iter().filter(|command| command.is_available(state)).collect();
        if available.is_empty() {
            debug!("no command available after {} of {count} actions", trees.len());
            break;
        }

        let (pick, rest) = seed.split();
        let (this, next) = rest.split();
        seed = next;
        let (choice, _) = pick.next_bounded(available.len() as u64);
        let command = available[choice as usize];

        match Rc::clone(command).generate(state, size, this) {
            Some(tree) => {
                tree.value.update(state);
                trees.push(tree);
            }
            None => {
                trace!("{} produced no acceptable input", command.name());
                misses += 1;
                if misses > count {
                    break;
                }
            }
        }
    }

    trees
}

/// Keep the actions that can still run once earlier ones were dropped:
/// every variable they mention is bound, their command is available and
/// their `require` holds. Advances `state` and `bound` past the kept actions.
pub(super) fn revalidate<S>(state: &mut S, bound: &mut HashSet<SymbolicId>, actions: Vec<ActionRef<S>>) -> Vec<ActionRef<S>> {
    let mut kept = Vec::with_capacity(actions.len());
    for action in actions {
        if action.is_valid(state, bound) {
            action.update(state);
            bound.insert(action.output_id());
            kept.push(action);
        }
    }
    kept
}

pub(super) fn action_list<S: 'static>(trees: Vec<Tree<ActionRef<S>>>, length: Range<usize>) -> Tree<Vec<ActionRef<S>>> {
    shrink::list(trees, ListShrink::truncating(length.lower()).with_removals())
}

impl<S> StateMachine<S>
where
    S: Resolve + Clone + Debug + 'static,
{
    /// Generate action sequences with a length drawn from `length`.
    ///
    /// Sequences shrink by truncation, by dropping single actions and by
    /// shrinking action inputs. Actions that stop making sense in a shrunk
    /// sequence are dropped.
    pub fn sequential(&self, length: Range<usize>) -> Gen<Sequential<S>> {
        let machine = self.clone();
        Gen::new(move |size, seed| {
            let mut state = machine.initial.clone();
            let trees = generate_actions(&machine.commands, &mut state, length, size, seed);
            let initial = machine.initial.clone();
            action_list(trees, length).map(move |actions| {
                let mut state = initial.clone();
                let mut bound = HashSet::new();
                Sequential {
                    actions: revalidate(&mut state, &mut bound, actions),
                }
            })
        })
    }
}

/// Run every action in order against a fresh environment, stopping at the
/// first failure.
pub fn execute_sequential<S>(machine: &StateMachine<S>, sequential: &Sequential<S>) -> Result<Execution<S>, ActionFailure>
where
    S: Resolve + Clone + Debug + 'static,
{
    machine.run_setup();
    let mut state = machine.initial.clone();
    let mut env = Environment::new();
    for action in &sequential.actions {
        if let Err(failure) = action.execute(&mut state, &mut env) {
            debug!("sequential run failed: {failure}");
            return Err(failure);
        }
    }
    Ok(Execution { state, env })
}

/// A property that executes generated sequences of `machine`'s commands.
pub fn for_all_sequential<S>(machine: &StateMachine<S>, length: Range<usize>) -> Property<Sequential<S>>
where
    S: Resolve + Clone + Debug + 'static,
{
    let runner = machine.clone();
    Property::new(machine.sequential(length), move |sequential| {
        execute_sequential(&runner, sequential)
            .map(|_| ())
            .map_err(|failure| failure.to_string())
    })
    .named("state machine")
}
