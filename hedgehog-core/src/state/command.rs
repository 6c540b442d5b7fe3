//! Commands and the actions generated from them.

use super::env::{Environment, Value};
use super::resolve::Resolve;
use super::var::{Concrete, Symbolic, SymbolicId, Var};
use crate::data::{Seed, Size};
use crate::error::{ActionFailure, ResolveError};
use crate::gen::Gen;
use crate::tree::Tree;
use log::{debug, trace};
use std::any::Any;
use std::collections::HashSet;
use std::fmt::{self, Debug, Display};
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::Arc;

/// How many seeds a command tries before deciding its `require` cannot be met.
const GENERATE_RETRIES: usize = 10;

type InputGen<S, I> = dyn Fn(&S) -> Option<Gen<I>>;
type Executor<I, O> = dyn Fn(I) -> Result<O, String> + Send + Sync;
type Require<S, I> = dyn Fn(&S, &I) -> bool;
type Update<S, I, O> = dyn Fn(&mut S, &I, &Var<O>);
type Ensure<S, I, O> = dyn Fn(&S, &S, &I, &O) -> Result<(), String>;

/// Specification for a command that can be executed in a state machine test.
///
/// The generator decides, from the model state, whether the command is
/// available and how to produce its input. `require` narrows the inputs it
/// accepts, `update` folds the command into the model state and `ensure`
/// checks the real output against the model.
pub struct Command<S, I, O>
where
    S: Resolve,
    I: Resolve,
{
    name: String,
    generator: Rc<InputGen<S, I>>,
    executor: Arc<Executor<I::Resolved, O>>,
    require: Option<Rc<Require<S, I>>>,
    update: Option<Rc<Update<S, I, O>>>,
    ensure: Option<Rc<Ensure<S::Resolved, I::Resolved, O>>>,
}

impl<S, I, O> Command<S, I, O>
where
    S: Resolve + Clone + Debug + 'static,
    I: Resolve + Clone + Debug + Send + Sync + 'static,
    O: Clone + Debug + Hash + Eq + Send + Sync + 'static,
{
    /// Create a command whose executor always succeeds.
    pub fn new<G, E>(name: impl Into<String>, generator: G, executor: E) -> Self
    where
        G: Fn(&S) -> Option<Gen<I>> + 'static,
        E: Fn(I::Resolved) -> O + Send + Sync + 'static,
    {
        Self::fallible(name, generator, move |input: I::Resolved| Ok::<O, String>(executor(input)))
    }

    /// Create a command whose executor may fail. An `Err` fails the action
    /// and is reported with its `Display` text.
    pub fn fallible<G, F, E>(name: impl Into<String>, generator: G, executor: F) -> Self
    where
        G: Fn(&S) -> Option<Gen<I>> + 'static,
        F: Fn(I::Resolved) -> Result<O, E> + Send + Sync + 'static,
        E: Display,
    {
        Command {
            name: name.into(),
            generator: Rc::new(generator),
            executor: Arc::new(move |input: I::Resolved| executor(input).map_err(|error| error.to_string())),
            require: None,
            update: None,
            ensure: None,
        }
    }

    /// Precondition on the model state and input.
    pub fn with_require<F>(mut self, require: F) -> Self
    where
        F: Fn(&S, &I) -> bool + 'static,
    {
        self.require = Some(Rc::new(require));
        self
    }

    /// Fold the command's effect into the model state.
    pub fn with_update<F>(mut self, update: F) -> Self
    where
        F: Fn(&mut S, &I, &Var<O>) + 'static,
    {
        self.update = Some(Rc::new(update));
        self
    }

    /// Postcondition over the resolved state before and after the command,
    /// the resolved input and the executor's output.
    pub fn with_ensure<F>(mut self, ensure: F) -> Self
    where
        F: Fn(&S::Resolved, &S::Resolved, &I::Resolved, &O) -> Result<(), String> + 'static,
    {
        self.ensure = Some(Rc::new(ensure));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the generator offers an input in `state`.
    pub fn is_available(&self, state: &S) -> bool {
        (self.generator)(state).is_some()
    }

    fn requires(&self, state: &S, input: &I) -> bool {
        self.require.as_ref().map_or(true, |require| require(state, input))
    }
}

impl<S, I, O> Debug for Command<S, I, O>
where
    S: Resolve,
    I: Resolve,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("require", &self.require.is_some())
            .field("update", &self.update.is_some())
            .field("ensure", &self.ensure.is_some())
            .finish()
    }
}

/// Commands with their input and output types erased.
pub(crate) trait DynCommand<S> {
    fn name(&self) -> &str;

    fn is_available(&self, state: &S) -> bool;

    /// A shrink tree of actions for `state`, or `None` when the command is
    /// unavailable or no generated input meets its `require`.
    fn generate(self: Rc<Self>, state: &S, size: Size, seed: Seed) -> Option<Tree<Rc<dyn DynAction<S>>>>;
}

impl<S, I, O> DynCommand<S> for Command<S, I, O>
where
    S: Resolve + Clone + Debug + 'static,
    I: Resolve + Clone + Debug + Send + Sync + 'static,
    O: Clone + Debug + Hash + Eq + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self, state: &S) -> bool {
        Command::is_available(self, state)
    }

    fn generate(self: Rc<Self>, state: &S, size: Size, seed: Seed) -> Option<Tree<Rc<dyn DynAction<S>>>> {
        let gen = (self.generator)(state)?;
        // every shrink of the input produces the same output variable
        let output = Symbolic::<O>::fresh();
        let mut seed = seed;
        for attempt in 0..GENERATE_RETRIES {
            let (this, next) = seed.split();
            seed = next;
            let tree = match gen.generate(size, this) {
                Ok(tree) => tree,
                Err(error) => {
                    trace!("{} input attempt {attempt} failed: {error}", self.name);
                    continue;
                }
            };
            let tree = match &self.require {
                Some(require) => {
                    let require = Rc::clone(require);
                    let state = state.clone();
                    tree.filter(move |input| require(&state, input))
                }
                None => Some(tree),
            };
            if let Some(tree) = tree {
                let command = Rc::clone(&self);
                return Some(tree.map(move |input| {
                    let action: Rc<dyn DynAction<S>> = Rc::new(Action {
                        command: Rc::clone(&command),
                        input,
                        output,
                    });
                    action
                }));
            }
        }
        trace!("{} gave up after {GENERATE_RETRIES} inputs failed its require", self.name);
        None
    }
}

/// A command applied to a generated input, bound to a symbolic output.
pub(crate) struct Action<S, I, O>
where
    S: Resolve,
    I: Resolve,
{
    command: Rc<Command<S, I, O>>,
    input: I,
    output: Symbolic<O>,
}

/// One step of a concurrent branch. Only the executor runs on the branch
/// thread; conditions are checked afterwards during linearization.
pub(crate) trait BranchStep: Send {
    fn describe(&self) -> &str;

    fn run(&self, env: &mut Environment) -> Result<Value, ActionFailure>;
}

struct TypedStep<I: Resolve, O> {
    description: String,
    input: I,
    output: Symbolic<O>,
    executor: Arc<Executor<I::Resolved, O>>,
}

/// Actions with their input and output types erased.
pub(crate) trait DynAction<S> {
    fn output_id(&self) -> SymbolicId;

    /// `Var3 = push(5)`.
    fn describe(&self) -> String;

    fn describe_output(&self, output: &Value) -> String;

    /// Whether the action may still run in `state` when only `bound`
    /// variables exist.
    fn is_valid(&self, state: &S, bound: &HashSet<SymbolicId>) -> bool;

    /// Fold the action into a symbolic model state.
    fn update(&self, state: &mut S);

    fn execute(&self, state: &mut S, env: &mut Environment) -> Result<Value, ActionFailure>;

    fn branch_step(&self) -> Box<dyn BranchStep>;

    /// Check the action against a captured output without running the
    /// executor. Binds the output and updates `state` on success.
    fn replay(&self, state: &mut S, env: &mut Environment, output: &Value) -> bool;
}

impl<S, I, O> DynAction<S> for Action<S, I, O>
where
    S: Resolve + Clone + Debug + 'static,
    I: Resolve + Clone + Debug + Send + Sync + 'static,
    O: Clone + Debug + Hash + Eq + Send + Sync + 'static,
{
    fn output_id(&self) -> SymbolicId {
        self.output.id()
    }

    fn describe(&self) -> String {
        format!("{} = {}({:?})", self.output, self.command.name, self.input)
    }

    fn describe_output(&self, output: &Value) -> String {
        match output.downcast_ref::<O>() {
            Some(value) => format!("{value:?}"),
            None => "<unknown>".to_string(),
        }
    }

    fn is_valid(&self, state: &S, bound: &HashSet<SymbolicId>) -> bool {
        let mut ids = Vec::new();
        self.input.symbolic_ids(&mut ids);
        ids.iter().all(|id| bound.contains(id))
            && self.command.is_available(state)
            && self.command.requires(state, &self.input)
    }

    fn update(&self, state: &mut S) {
        if let Some(update) = &self.command.update {
            update(state, &self.input, &Var::Symbolic(self.output));
        }
    }

    fn execute(&self, state: &mut S, env: &mut Environment) -> Result<Value, ActionFailure> {
        let action = self.describe();
        debug!("executing {action}");
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.execute_unguarded(&action, state, env)));
        outcome.unwrap_or_else(|payload| {
            Err(ActionFailure::Executor {
                action: action.clone(),
                message: panic_message(payload.as_ref()),
            })
        })
    }

    fn branch_step(&self) -> Box<dyn BranchStep> {
        Box::new(TypedStep {
            description: self.describe(),
            input: self.input.clone(),
            output: self.output,
            executor: Arc::clone(&self.command.executor),
        })
    }

    fn replay(&self, state: &mut S, env: &mut Environment, output: &Value) -> bool {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.replay_unguarded(state, env, output)));
        matches!(outcome, Ok(true))
    }
}

impl<S, I, O> Action<S, I, O>
where
    S: Resolve + Clone + Debug + 'static,
    I: Resolve + Clone + Debug + Send + Sync + 'static,
    O: Clone + Debug + Hash + Eq + Send + Sync + 'static,
{
    fn execute_unguarded(&self, action: &str, state: &mut S, env: &mut Environment) -> Result<Value, ActionFailure> {
        let unresolved = |source: ResolveError| ActionFailure::Resolve {
            action: action.to_string(),
            source,
        };
        let input = self.input.concretize(env).map_err(unresolved)?;
        let resolved_input = self.input.resolve(env).map_err(unresolved)?;

        if self.command.require.is_some() {
            let concrete_state = state.concretize(env).map_err(unresolved)?;
            if !self.command.requires(&concrete_state, &input) {
                return Err(ActionFailure::Precondition {
                    action: action.to_string(),
                    state: format!("{concrete_state:?}"),
                    input: format!("{resolved_input:?}"),
                });
            }
        }

        let output = (self.command.executor)(resolved_input.clone()).map_err(|message| ActionFailure::Executor {
            action: action.to_string(),
            message,
        })?;

        let concrete = env.create_concrete(output.clone());
        env.insert(self.output, concrete.clone());

        let prior = state.clone();
        self.update(state);
        let before = prior.resolve(env).map_err(unresolved)?;
        let after = state.resolve(env).map_err(unresolved)?;

        if let Some(ensure) = &self.command.ensure {
            ensure(&before, &after, &resolved_input, &output).map_err(|message| ActionFailure::Postcondition {
                action: action.to_string(),
                message,
                before: format!("{before:?}"),
                after: format!("{after:?}"),
                input: format!("{resolved_input:?}"),
                output: format!("{output:?}"),
            })?;
        }

        let value: Value = concrete.into_arc();
        Ok(value)
    }

    fn replay_unguarded(&self, state: &mut S, env: &mut Environment, output: &Value) -> bool {
        let (Ok(input), Ok(resolved_input)) = (self.input.concretize(env), self.input.resolve(env)) else {
            return false;
        };
        if self.command.require.is_some() {
            let Ok(concrete_state) = state.concretize(env) else {
                return false;
            };
            if !self.command.requires(&concrete_state, &input) {
                return false;
            }
        }
        let Ok(output) = Arc::clone(output).downcast::<O>() else {
            return false;
        };

        env.insert(self.output, Concrete::from_arc(Arc::clone(&output)));
        let prior = state.clone();
        self.update(state);

        let Some(ensure) = &self.command.ensure else {
            return true;
        };
        match (prior.resolve(env), state.resolve(env)) {
            (Ok(before), Ok(after)) => ensure(&before, &after, &resolved_input, &*output).is_ok(),
            _ => false,
        }
    }
}

impl<I, O> BranchStep for TypedStep<I, O>
where
    I: Resolve + Send + Sync,
    O: Hash + Eq + Send + Sync + 'static,
{
    fn describe(&self) -> &str {
        &self.description
    }

    fn run(&self, env: &mut Environment) -> Result<Value, ActionFailure> {
        let input = self.input.resolve(env).map_err(|source| ActionFailure::Resolve {
            action: self.description.clone(),
            source,
        })?;
        let executor = Arc::clone(&self.executor);
        let output = panic::catch_unwind(AssertUnwindSafe(move || executor(input)))
            .unwrap_or_else(|payload| Err(panic_message(payload.as_ref())))
            .map_err(|message| ActionFailure::Executor {
                action: self.description.clone(),
                message,
            })?;
        let concrete = env.create_concrete(output);
        env.insert(self.output, concrete.clone());
        let value: Value = concrete.into_arc();
        Ok(value)
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Counter {
        value: i64,
    }

    crate::plain_resolve!(Counter);

    fn incr() -> Command<Counter, i64, i64> {
        Command::new("incr", |_: &Counter| Some(Gen::constant(1i64)), |by: i64| by + 100)
            .with_update(|state: &mut Counter, by: &i64, _| state.value += *by)
    }

    fn generate(command: Command<Counter, i64, i64>, state: &Counter) -> Option<Rc<dyn DynAction<Counter>>> {
        let command: Rc<dyn DynCommand<Counter>> = Rc::new(command);
        command
            .generate(state, Size::new(10), Seed::from_u64(5))
            .map(|tree| tree.value)
    }

    #[test]
    fn test_availability() {
        let bounded = Command::new(
            "bounded",
            |state: &Counter| (state.value < 3).then(|| Gen::constant(1i64)),
            |by: i64| by,
        );
        assert!(bounded.is_available(&Counter { value: 2 }));
        assert!(!bounded.is_available(&Counter { value: 3 }));
        assert!(generate(bounded, &Counter { value: 3 }).is_none());
    }

    #[test]
    fn test_describe() {
        let action = generate(incr(), &Counter::default()).unwrap();
        let description = action.describe();
        assert!(description.starts_with("Var"));
        assert!(description.ends_with(" = incr(1)"));
    }

    #[test]
    fn test_execute_binds_output_and_updates() {
        let action = generate(incr(), &Counter::default()).unwrap();
        let mut state = Counter::default();
        let mut env = Environment::new();
        let output = action.execute(&mut state, &mut env).unwrap();
        assert_eq!(output.downcast_ref::<i64>(), Some(&101));
        assert_eq!(state.value, 1);
        assert!(env.contains(action.output_id()));
        assert_eq!(action.describe_output(&output), "101");
    }

    #[test]
    fn test_failed_require_skips_executor() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let command = Command::new("guarded", |_: &Counter| Some(Gen::constant(1i64)), move |by: i64| {
            counted.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            by
        })
        .with_require(|state: &Counter, _| state.value == 0);

        let action = generate(command, &Counter::default()).unwrap();
        let mut state = Counter { value: 5 };
        let failure = action.execute(&mut state, &mut Environment::new()).unwrap_err();
        assert!(matches!(failure, ActionFailure::Precondition { .. }));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert_eq!(state.value, 5);
    }

    fn input_of(action: &dyn DynAction<Counter>) -> i64 {
        let description = action.describe();
        let (_, argument) = description.rsplit_once('(').unwrap();
        argument.trim_end_matches(')').parse().unwrap()
    }

    #[test]
    fn test_require_filters_generated_inputs() {
        let command = Command::new("even", |_: &Counter| Some(Gen::i64_range(0, 100)), |n: i64| n)
            .with_require(|_: &Counter, n: &i64| n % 2 == 0);
        let command: Rc<dyn DynCommand<Counter>> = Rc::new(command);
        for n in 0..20u64 {
            let tree = Rc::clone(&command)
                .generate(&Counter::default(), Size::new(50), Seed::from_u64(n))
                .unwrap();
            assert_eq!(input_of(tree.value.as_ref()) % 2, 0);
            for shrink in tree.shrinks() {
                assert_eq!(input_of(shrink.as_ref()) % 2, 0);
                assert_eq!(shrink.output_id(), tree.value.output_id());
            }
        }
    }

    #[test]
    fn test_postcondition_failure_reports_states() {
        let command = incr().with_ensure(|before: &Counter, after: &Counter, _, output: &i64| {
            if *output == after.value {
                Ok(())
            } else {
                Err(format!("expected {} after {}", after.value, before.value))
            }
        });
        let action = generate(command, &Counter::default()).unwrap();
        let failure = action
            .execute(&mut Counter::default(), &mut Environment::new())
            .unwrap_err();
        match failure {
            ActionFailure::Postcondition {
                message,
                before,
                after,
                output,
                ..
            } => {
                assert_eq!(message, "expected 1 after 0");
                assert_eq!(before, "Counter { value: 0 }");
                assert_eq!(after, "Counter { value: 1 }");
                assert_eq!(output, "101");
            }
            other => panic!("unexpected failure: {other}"),
        }
    }

    #[test]
    fn test_executor_errors_and_panics_are_caught() {
        let failing = Command::fallible("fail", |_: &Counter| Some(Gen::constant(())), |_: ()| {
            Err::<i64, _>("disk full")
        });
        let action = generate_unit(failing);
        let failure = action
            .execute(&mut Counter::default(), &mut Environment::new())
            .unwrap_err();
        assert_eq!(
            failure,
            ActionFailure::Executor {
                action: action.describe(),
                message: "disk full".to_string(),
            }
        );

        let panicking = Command::new("boom", |_: &Counter| Some(Gen::constant(())), |_: ()| -> i64 {
            panic!("executor exploded")
        });
        let action = generate_unit(panicking);
        let failure = action
            .execute(&mut Counter::default(), &mut Environment::new())
            .unwrap_err();
        assert!(failure.to_string().contains("panicked: executor exploded"));
    }

    fn generate_unit(command: Command<Counter, (), i64>) -> Rc<dyn DynAction<Counter>> {
        let command: Rc<dyn DynCommand<Counter>> = Rc::new(command);
        command
            .generate(&Counter::default(), Size::new(1), Seed::from_u64(0))
            .map(|tree| tree.value)
            .unwrap()
    }

    #[test]
    fn test_replay_uses_captured_output() {
        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        let command = incr().with_ensure(move |before: &Counter, _, _, output: &i64| {
            seen.set(seen.get() + 1);
            if *output == before.value + 1 {
                Ok(())
            } else {
                Err("stale".to_string())
            }
        });
        let action = generate(command, &Counter::default()).unwrap();

        let good: Value = Arc::new(1i64);
        let mut state = Counter::default();
        let mut env = Environment::new();
        assert!(action.replay(&mut state, &mut env, &good));
        assert_eq!(state.value, 1);
        assert!(env.contains(action.output_id()));

        let stale: Value = Arc::new(1i64);
        assert!(!action.replay(&mut state, &mut env, &stale));
        assert_eq!(calls.get(), 2);

        let wrong_type: Value = Arc::new("one".to_string());
        assert!(!action.replay(&mut Counter::default(), &mut Environment::new(), &wrong_type));
    }

    #[test]
    fn test_branch_step_runs_executor_only() {
        let action = generate(incr(), &Counter::default()).unwrap();
        let step = action.branch_step();
        let mut env = Environment::new();
        let output = step.run(&mut env).unwrap();
        assert_eq!(output.downcast_ref::<i64>(), Some(&101));
        assert!(env.contains(action.output_id()));
        assert_eq!(step.describe(), action.describe());
    }
}
