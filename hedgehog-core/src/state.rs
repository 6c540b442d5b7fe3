//! State machine testing.
//!
//! Commands are generated against a model state using symbolic variables for
//! results that do not exist yet, then executed against the real system with
//! those variables bound to concrete values:
//!
//! ```
//! use hedgehog_core::*;
//!
//! let machine = StateMachine::new(0i64).command(
//!     Command::new("incr", |_: &i64| Some(Gen::unit()), |_: ()| 1i64)
//!         .with_update(|count: &mut i64, _, _| *count += 1)
//!         .with_ensure(|_, _, _, output: &i64| {
//!             if *output == 1 { Ok(()) } else { Err("incr returned the wrong value".to_string()) }
//!         }),
//! );
//!
//! let result = for_all_sequential(&machine, Range::linear(0, 10))
//!     .run_with_seed(&Config::default().with_tests(20), Seed::from_u64(1));
//! assert!(result.is_pass());
//! ```

mod command;
mod env;
mod parallel;
mod resolve;
mod sequential;
mod var;

pub use command::Command;
pub use env::{Environment, Interner, Value};
pub use parallel::{execute_parallel, for_all_parallel, interleavings, linearize, Branch, Parallel};
pub use resolve::Resolve;
pub use sequential::{execute_sequential, for_all_sequential, Execution, Sequential};
pub use var::{Concrete, Symbolic, SymbolicId, Var};

use command::DynCommand;
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::rc::Rc;

/// A model state together with the commands that act on it.
#[derive(Clone)]
pub struct StateMachine<S> {
    initial: S,
    commands: Vec<Rc<dyn DynCommand<S>>>,
    setup: Option<Rc<dyn Fn()>>,
}

impl<S> StateMachine<S>
where
    S: Resolve + Clone + Debug + 'static,
{
    pub fn new(initial: S) -> Self {
        StateMachine {
            initial,
            commands: Vec::new(),
            setup: None,
        }
    }

    pub fn command<I, O>(mut self, command: Command<S, I, O>) -> Self
    where
        I: Resolve + Clone + Debug + Send + Sync + 'static,
        O: Clone + Debug + Hash + Eq + Send + Sync + 'static,
    {
        self.commands.push(Rc::new(command));
        self
    }

    /// Run `setup` before every execution, e.g. to reset the system under test.
    pub fn with_setup<F>(mut self, setup: F) -> Self
    where
        F: Fn() + 'static,
    {
        self.setup = Some(Rc::new(setup));
        self
    }

    pub fn initial_state(&self) -> &S {
        &self.initial
    }

    pub fn command_names(&self) -> Vec<&str> {
        self.commands.iter().map(|command| command.name()).collect()
    }

    fn run_setup(&self) {
        if let Some(setup) = &self.setup {
            setup();
        }
    }
}

impl<S: Debug> Debug for StateMachine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let commands: Vec<&str> = self.commands.iter().map(|command| command.name()).collect();
        f.debug_struct("StateMachine")
            .field("initial", &self.initial)
            .field("commands", &commands)
            .field("setup", &self.setup.is_some())
            .finish()
    }
}
