//! Error types for Hedgehog property-based testing.

use crate::data::Seed;
use crate::state::{Branch, SymbolicId};
use thiserror::Error;

/// Main error type for Hedgehog property testing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HedgehogError {
    /// Property test failed with a counterexample.
    #[error("{report}")]
    PropertyFailed {
        report: String,
        seed: Seed,
        shrinks: usize,
    },

    /// Too many test cases were discarded.
    #[error("gave up after {discards} discards ({tests_run} tests run)")]
    GaveUp { discards: usize, tests_run: usize },
}

/// Result type for Hedgehog operations.
pub type Result<T> = std::result::Result<T, HedgehogError>;

/// A generator could not produce a value.
///
/// The property runner treats every generation error as a discard.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenError {
    #[error("filter could not satisfy its predicate after {retries} retries")]
    FilterExhausted { retries: usize },

    #[error("{combinator} needs at least one alternative")]
    EmptyChoice { combinator: &'static str },

    #[error("invalid range: {message}")]
    InvalidRange { message: String },
}

/// A symbolic variable could not be resolved against an environment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("{0} is not bound")]
    Unbound(SymbolicId),

    #[error("{variable} is bound to a value that is not a {expected}")]
    TypeMismatch {
        variable: SymbolicId,
        expected: &'static str,
    },
}

/// Why a single state machine action failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionFailure {
    /// A `require` callback rejected the action; the executor never ran.
    #[error("precondition failed for `{action}`\n  state: {state}\n  input: {input}")]
    Precondition {
        action: String,
        state: String,
        input: String,
    },

    /// An `ensure` callback rejected the executor's output.
    #[error(
        "postcondition failed for `{action}`: {message}\n  before: {before}\n  after: {after}\n  input: {input}\n  output: {output}"
    )]
    Postcondition {
        action: String,
        message: String,
        before: String,
        after: String,
        input: String,
        output: String,
    },

    /// The executor returned an error or panicked.
    #[error("`{action}` failed to execute: {message}")]
    Executor { action: String, message: String },

    /// The input or model state referred to a variable the environment lacks.
    #[error("`{action}` could not be resolved: {source}")]
    Resolve {
        action: String,
        #[source]
        source: ResolveError,
    },
}

/// Why a parallel state machine test failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParallelFailure {
    #[error("sequential prefix failed: {0}")]
    Prefix(ActionFailure),

    #[error("{branch} branch failed: {failure}")]
    Branch {
        branch: Branch,
        failure: ActionFailure,
    },

    /// A prefix action rejected its recorded output when replayed, so no
    /// ordering of the branches can be checked.
    #[error("prefix action `{action}` did not accept its recorded output on replay")]
    PrefixReplay { action: String },

    /// The captured results match no sequential ordering of the branches.
    #[error(
        "no valid interleaving found among {interleavings} candidates\n  prefix: {prefix:?}\n  left: {left:?}\n  right: {right:?}"
    )]
    Linearization {
        interleavings: usize,
        prefix: Vec<String>,
        left: Vec<String>,
        right: Vec<String>,
    },
}
