//! Parallel state machine properties
//!
//! An account whose deposits are atomic must linearize. One that reads,
//! yields and writes back must be caught.

use hedgehog::*;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn account_machine(balance: Arc<Mutex<u64>>, racy: bool) -> StateMachine<u64> {
    let deposit_balance = Arc::clone(&balance);
    let read_balance = Arc::clone(&balance);
    StateMachine::new(0u64)
        .command(
            Command::new("deposit", |_: &u64| Some(Gen::u64_range(1, 100)), move |amount: u64| {
                if racy {
                    let seen = *deposit_balance.lock();
                    thread::sleep(Duration::from_millis(2));
                    *deposit_balance.lock() = seen + amount;
                    seen + amount
                } else {
                    let mut current = deposit_balance.lock();
                    *current += amount;
                    *current
                }
            })
            .with_update(|model: &mut u64, amount: &u64, _| *model += amount)
            .with_ensure(|before: &u64, after: &u64, amount: &u64, output: &u64| {
                if *output == before + amount && output == after {
                    Ok(())
                } else {
                    Err(format!("deposit of {amount} onto {before} left {output}"))
                }
            }),
        )
        .command(
            Command::new("balance", |_: &u64| Some(Gen::unit()), move |_: ()| *read_balance.lock())
                .with_ensure(|before: &u64, _, _, output: &u64| {
                    if output == before {
                        Ok(())
                    } else {
                        Err(format!("read {output}, model has {before}"))
                    }
                }),
        )
        .with_setup(move || *balance.lock() = 0)
}

/// Property: deposits under a lock always match some sequential order
pub fn test_atomic_counter_is_linearizable() {
    let machine = account_machine(Arc::new(Mutex::new(0)), false);
    let prop = for_all_parallel(&machine, Range::linear(0, 3), Range::linear(1, 3));

    match prop.run(&Config::default().with_tests(30)) {
        TestResult::Pass { .. } => println!("✓ Atomic account linearizability property passed"),
        result => panic!("Atomic account linearizability property failed: {result}"),
    }
}

/// Property: a lost update between two deposits has no valid ordering
pub fn test_racy_counter_is_caught() {
    let machine = account_machine(Arc::new(Mutex::new(0)), true);
    let prop = for_all_parallel(&machine, Range::constant(0, 1), Range::constant(1, 2));

    match prop.run_with_seed(&Config::default().with_tests(30).with_shrinks(10), Seed::from_u64(21)) {
        TestResult::Fail(failure) => {
            assert!(failure.message.contains("no valid interleaving"), "{}", failure.message);
            assert!(!failure.counterexample.left().is_empty());
            assert!(!failure.counterexample.right().is_empty());
            println!("✓ Racy account caught: {:?}", failure.counterexample);
        }
        result => panic!("Expected the racy account to fail linearization: {result}"),
    }
}
