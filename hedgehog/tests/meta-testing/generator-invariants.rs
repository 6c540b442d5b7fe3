//! Generator invariant properties
//!
//! These properties ensure that generators behave correctly with respect to
//! determinism, range bounds and filtering.

use crate::{arbitrary_seed, arbitrary_size};
use hedgehog::*;

/// Property: Generators should be deterministic for same size/seed
pub fn test_generator_determinism() {
    let prop = for_all_named(
        Gen::<(Size, Seed)>::tuple_of(arbitrary_size(), arbitrary_seed()),
        "(size, seed)",
        |&(size, seed): &(Size, Seed)| {
            let gen = Gen::vec_of(Gen::int_range(0, 100));
            match (gen.generate(size, seed), gen.generate(size, seed)) {
                (Ok(first), Ok(second)) => {
                    first.value == second.value
                        && first.shrinks() == second.shrinks()
                }
                _ => false,
            }
        },
    );

    let config = Config::default().with_tests(30).with_shrinks(10);
    match prop.run(&config) {
        TestResult::Pass { .. } => println!("✓ Generator determinism property passed"),
        result => panic!("Generator determinism property failed: {result}"),
    }
}

/// Property: Integers stay inside the size-scaled bounds of their range
pub fn test_integers_respect_range() {
    let prop = for_all_named(
        Gen::<(Size, Seed)>::tuple_of(arbitrary_size(), arbitrary_seed()),
        "(size, seed)",
        |&(size, seed): &(Size, Seed)| {
            let range = Range::linear(-500, 500).with_origin(10);
            let (lower, upper) = range.bounds(size);
            match Gen::<i64>::from_range(range).generate(size, seed) {
                Ok(tree) => (lower..=upper).contains(&tree.value) && range.contains(tree.value),
                Err(_) => false,
            }
        },
    );

    let config = Config::default().with_tests(100);
    match prop.run(&config) {
        TestResult::Pass { .. } => println!("✓ Integer range property passed"),
        result => panic!("Integer range property failed: {result}"),
    }
}

/// Property: Vector lengths stay inside their length range
pub fn test_vectors_respect_length() {
    let prop = for_all_named(
        Gen::<(Size, Seed)>::tuple_of(arbitrary_size(), arbitrary_seed()),
        "(size, seed)",
        |&(size, seed): &(Size, Seed)| {
            let gen = Gen::vec_with_range(Gen::bool(), Range::linear(3, 30));
            match gen.generate(size, seed) {
                Ok(tree) => (3..=30).contains(&tree.value.len()) && tree.shrinks().iter().all(|shrink| shrink.len() >= 3),
                Err(_) => false,
            }
        },
    );

    let config = Config::default().with_tests(100);
    match prop.run(&config) {
        TestResult::Pass { .. } => println!("✓ Vector length property passed"),
        result => panic!("Vector length property failed: {result}"),
    }
}

/// Property: a filtered tree only ever surfaces values that pass the filter
pub fn test_filter_correctness() {
    let prop = for_all_named(
        Gen::<(Size, Seed)>::tuple_of(arbitrary_size(), arbitrary_seed()),
        "(size, seed)",
        |&(size, seed): &(Size, Seed)| {
            let is_odd = |n: &i32| n % 2 != 0;
            let gen = Gen::int_range(-1000, 1000).filter(is_odd);
            let tree = match gen.generate(size, seed) {
                Ok(tree) => tree,
                // exhausting the retries is a discard, not a wrong value
                Err(GenError::FilterExhausted { .. }) => return true,
                Err(_) => return false,
            };
            is_odd(&tree.value) && tree.expand(4).into_iter().all(is_odd)
        },
    );

    let config = Config::default().with_tests(100);
    match prop.run(&config) {
        TestResult::Pass { .. } => println!("✓ Filter correctness property passed"),
        result => panic!("Filter correctness property failed: {result}"),
    }
}
