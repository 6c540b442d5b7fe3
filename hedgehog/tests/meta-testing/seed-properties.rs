//! Seed properties
//!
//! The splittable generator underneath every other component.

use crate::arbitrary_seed;
use hedgehog::*;
use std::collections::HashSet;

/// Property: the same seed always replays the same draws
pub fn test_seed_determinism() {
    let prop = for_all_named(Gen::<u64>::from_range(Range::constant(0, u64::MAX)), "n", |&n: &u64| {
        let draws = |seed: Seed| {
            let (left, right) = seed.split();
            let (a, left) = left.next_u64();
            let (b, _) = left.next_bounded(1000);
            let (c, _) = right.next_f64();
            let (d, _) = right.next_bool();
            (a, b, c.to_bits(), d)
        };
        draws(Seed::from_u64(n)) == draws(Seed::from_u64(n))
    });

    let config = Config::default().with_tests(50);
    match prop.run(&config) {
        TestResult::Pass { .. } => println!("✓ Seed determinism property passed"),
        result => panic!("Seed determinism property failed: {result}"),
    }
}

/// Property: the two halves of a split do not produce the same stream
pub fn test_split_independence() {
    let prop = for_all_named(arbitrary_seed(), "seed", |&seed: &Seed| {
        let (mut left, mut right) = seed.split();
        let mut left_draws = Vec::new();
        let mut right_draws = HashSet::new();
        for _ in 0..32 {
            let (a, next_left) = left.next_u64();
            let (b, next_right) = right.next_u64();
            left = next_left;
            right = next_right;
            left_draws.push(a);
            right_draws.insert(b);
        }
        let window: Vec<u64> = left_draws.iter().take(4).copied().collect();
        left_draws.iter().all(|draw| !right_draws.contains(draw)) && window.windows(2).all(|pair| pair[0] != pair[1])
    });

    let config = Config::default().with_tests(100);
    match prop.run(&config) {
        TestResult::Pass { .. } => println!("✓ Split independence property passed"),
        result => panic!("Split independence property failed: {result}"),
    }
}

/// Property: bounded draws land in `[0, bound)`
pub fn test_bounded_draws_stay_in_bounds() {
    let prop = for_all_named(
        Gen::<(Seed, u64)>::tuple_of(arbitrary_seed(), Gen::u64_range(1, u64::MAX)),
        "(seed, bound)",
        |&(seed, bound): &(Seed, u64)| {
            let (narrow, _) = seed.next_bounded(bound.min(1 << 32));
            let (wide, _) = seed.next_bounded_u64(bound);
            let (float, _) = seed.next_f64();
            narrow < bound.min(1 << 32) && wide < bound && (0.0..1.0).contains(&float)
        },
    );

    let config = Config::default().with_tests(200);
    match prop.run(&config) {
        TestResult::Pass { .. } => println!("✓ Bounded draw property passed"),
        result => panic!("Bounded draw property failed: {result}"),
    }
}
