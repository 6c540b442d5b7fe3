//! Hedgehog property-based testing library.
//!
//! This is the main entry point for the Hedgehog library, providing
//! a convenient API for property-based testing in Rust.
//!
//! ```
//! use hedgehog::*;
//!
//! let prop = for_all_named(Gen::<i32>::from_range(Range::constant(0, 100)), "x", |&x| x < 50);
//! match prop.run_with_seed(&Config::default(), Seed::from_u64(42)) {
//!     TestResult::Fail(failure) => assert_eq!(failure.counterexample, 50),
//!     other => panic!("expected a failure, got {other}"),
//! }
//! ```

pub use hedgehog_core::*;
