//! Basic property testing demonstration
//!
//! Generators, integrated shrinking and replaying a failure from its seed.

use hedgehog::*;

fn main() {
    println!("=== Basic Property Testing ===\n");

    example_passing_property();
    example_shrinking();
    example_replay();
    example_classification();
    example_composed_generators();
}

/// Example 1: a property that holds
fn example_passing_property() {
    println!("1. Reversing a vector twice is the identity");

    let prop = for_all_named(Gen::vec_of(Gen::int_range(-100, 100)), "xs", |xs: &Vec<i32>| {
        let mut twice = xs.clone();
        twice.reverse();
        twice.reverse();
        &twice == xs
    });

    match prop.run(&Config::default()) {
        TestResult::Pass { tests_run, .. } => println!("   ✓ passed {tests_run} tests"),
        result => println!("   ✗ {result}"),
    }
    println!();
}

/// Example 2: a failing property shrinks to the boundary
fn example_shrinking() {
    println!("2. Shrinking `x < 50` over 0..=100");

    let prop = for_all_named(Gen::<i32>::from_range(Range::constant(0, 100)), "x", |&x: &i32| x < 50);

    match prop.run(&Config::default()) {
        TestResult::Fail(failure) => {
            println!(
                "   ✗ {} shrank to {} in {} steps",
                failure.original, failure.counterexample, failure.shrinks
            );
            println!("   path: {:?}", failure.shrink_path);
        }
        result => println!("   unexpected: {result}"),
    }
    println!();
}

/// Example 3: the reported seed replays the failure exactly
fn example_replay() {
    println!("3. Replaying a failure from its seed");

    let prop = for_all_named(
        Gen::vec_with_range(Gen::u32_range(0, 1000), Range::linear(0, 20)),
        "xs",
        |xs: &Vec<u32>| xs.iter().sum::<u32>() < 2000,
    );
    let config = Config::default();

    if let TestResult::Fail(first) = prop.run(&config) {
        match prop.run_with_seed(&config, first.seed) {
            TestResult::Fail(again) if again.counterexample == first.counterexample => {
                println!("   ✓ {:?} reproduced from {:?}", again.counterexample, first.seed)
            }
            result => println!("   ✗ replay diverged: {result}"),
        }
    } else {
        println!("   no failure found this run");
    }
    println!();
}

/// Example 4: labelling the generated distribution
fn example_classification() {
    println!("4. Classifying generated values");

    let prop = for_all_named(Gen::int_range(-50, 50), "n", |n: &i32| n.abs() <= 50)
        .classify("negative", |n| *n < 0)
        .classify("zero", |n| *n == 0)
        .classify("positive", |n| *n > 0);

    if let TestResult::Pass { statistics, .. } = prop.run(&Config::default()) {
        let mut labels: Vec<_> = statistics.classifications.iter().collect();
        labels.sort();
        for (label, count) in labels {
            println!("   {label}: {count}");
        }
    }
    println!();
}

/// Example 5: generators built from smaller ones
fn example_composed_generators() {
    println!("5. Composed generators");

    #[derive(Debug, Clone)]
    struct User {
        name: String,
        age: u32,
        admin: bool,
    }

    let user = Gen::<(String, u32, bool)>::tuple3_of(
        Gen::<String>::string_of(Gen::<char>::ascii_alpha(), Range::linear(1, 12)),
        Gen::u32_range(0, 120),
        Gen::frequency(vec![(1, Gen::constant(true)), (9, Gen::constant(false))]),
    )
    .map(|(name, age, admin)| User { name, age, admin });

    for user in user.samples(3, Seed::from_u64(7)) {
        println!("   {user:?}");
    }

    // users younger than 18 are never admins, which the generator does not know
    let prop = for_all_named(user, "user", |user: &User| !(user.admin && user.age < 18));
    match prop.run(&Config::default().with_tests(500)) {
        TestResult::Fail(failure) => println!("   ✗ minimal counterexample: {:?}", failure.counterexample),
        result => println!("   {result}"),
    }
    println!();
}
