//! Shrinking properties
//!
//! Shrinks must always make progress towards the origin, and the runner must
//! settle on the smallest counterexample a monotone predicate allows.

use crate::{arbitrary_seed, arbitrary_size};
use hedgehog::*;

/// Property: every integer shrink is strictly closer to the origin
pub fn test_integer_shrinks_move_towards_origin() {
    let prop = for_all_named(
        Gen::<(Size, Seed)>::tuple_of(arbitrary_size(), arbitrary_seed()),
        "(size, seed)",
        |&(size, seed): &(Size, Seed)| {
            let origin = 7i64;
            let gen = Gen::<i64>::from_range(Range::linear(-1000, 1000).with_origin(origin));
            let tree = match gen.generate(size, seed) {
                Ok(tree) => tree,
                Err(_) => return false,
            };
            let distance = (tree.value - origin).abs();
            let shrinks = tree.shrinks();
            let closer = shrinks.iter().all(|&&shrink| (shrink - origin).abs() < distance);
            let ends_at_origin = distance == 0 || shrinks.last() == Some(&&origin);
            closer && ends_at_origin
        },
    );

    let config = Config::default().with_tests(100);
    match prop.run(&config) {
        TestResult::Pass { .. } => println!("✓ Integer shrink direction property passed"),
        result => panic!("Integer shrink direction property failed: {result}"),
    }
}

/// Property: shrinking a vector never makes it longer
pub fn test_vector_shrinks_never_grow() {
    let prop = for_all_named(
        Gen::<(Size, Seed)>::tuple_of(arbitrary_size(), arbitrary_seed()),
        "(size, seed)",
        |&(size, seed): &(Size, Seed)| {
            let gen = Gen::vec_of(Gen::int_range(-50, 50));
            match gen.generate(size, seed) {
                Ok(tree) => {
                    let len = tree.value.len();
                    tree.shrinks().iter().all(|shrink| shrink.len() <= len)
                }
                Err(_) => false,
            }
        },
    );

    let config = Config::default().with_tests(50).with_shrinks(20);
    match prop.run(&config) {
        TestResult::Pass { .. } => println!("✓ Vector shrink length property passed"),
        result => panic!("Vector shrink length property failed: {result}"),
    }
}

/// Scenario: `x < 50` over `0..=100` fails and shrinks to exactly 50
pub fn test_end_to_end_scenario() {
    let prop = for_all_named(Gen::<i32>::from_range(Range::constant(0, 100)), "x", |&x: &i32| x < 50);

    match prop.run_with_seed(&Config::default(), Seed::from_u64(42)) {
        TestResult::Fail(failure) => {
            assert!((50..=100).contains(&failure.original));
            assert!(failure.counterexample <= failure.original);
            assert_eq!(failure.counterexample, 50);
            assert_eq!(failure.shrinks, failure.shrink_path.len());
            if failure.original != 50 {
                assert_eq!(failure.shrink_path.last(), Some(&50));
            }
            assert_eq!(failure.seed, Seed::from_u64(42));
            println!("✓ End to end scenario shrank {} to 50", failure.original);
        }
        result => panic!("Expected the x < 50 property to fail: {result}"),
    }
}

/// Property: whatever seed finds the failure, shrinking lands on the boundary
pub fn test_minimal_counterexample_across_seeds() {
    let prop = for_all_named(
        Gen::<(i64, Seed)>::tuple_of(Gen::i64_range(1, 10_000), arbitrary_seed()),
        "(threshold, seed)",
        |&(threshold, seed): &(i64, Seed)| {
            let inner = for_all(Gen::<i64>::from_range(Range::constant(0, 20_000)), move |&x: &i64| x < threshold);
            match inner.run_with_seed(&Config::default(), seed) {
                TestResult::Fail(failure) => failure.counterexample == threshold,
                // at most half of the range passes, so a hundred draws always fail
                _ => false,
            }
        },
    );

    let config = Config::default().with_tests(30).with_shrinks(5);
    match prop.run(&config) {
        TestResult::Pass { .. } => println!("✓ Minimal counterexample property passed"),
        result => panic!("Minimal counterexample property failed: {result}"),
    }
}
