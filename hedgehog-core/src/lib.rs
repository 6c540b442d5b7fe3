//! Core functionality for Hedgehog property-based testing.
//!
//! This crate provides the fundamental building blocks for property-based testing
//! with Hedgehog: a splittable seed, lazy shrink trees, generator combinators,
//! a property runner with integrated shrinking and state machine testing with
//! a linearizability check.

pub mod data;
pub mod error;
pub mod gen;
pub mod property;
pub mod range;
pub mod shrink;
pub mod state;
pub mod tree;

// Re-export the main types
pub use data::*;
pub use error::*;
pub use gen::*;
pub use property::*;
pub use range::*;
pub use state::*;
pub use tree::*;
