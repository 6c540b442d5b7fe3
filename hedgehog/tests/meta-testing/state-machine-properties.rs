//! State machine properties
//!
//! Interning of concrete values, model states keyed by variables, and a
//! queue checked against a simple list model.

use hedgehog::*;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Property: equal values bound in one environment share a single instance
pub fn test_interning_invariant() {
    let prop = for_all_named(
        Gen::vec_with_range(Gen::u32_range(0, 5), Range::linear(1, 30)),
        "values",
        |values: &Vec<u32>| {
            let env = Environment::new();
            let forked = env.fork();
            let concretes: Vec<Concrete<u32>> = values.iter().map(|&value| env.create_concrete(value)).collect();
            let from_fork: Vec<Concrete<u32>> = values.iter().map(|&value| forked.create_concrete(value)).collect();

            let pairs_agree = concretes.iter().zip(values).all(|(a, x)| {
                concretes
                    .iter()
                    .zip(values)
                    .all(|(b, y)| a.same_instance(b) == (x == y))
            });
            let fork_agrees = concretes.iter().zip(&from_fork).all(|(a, b)| a.same_instance(b));
            pairs_agree && fork_agrees && env.shares_interner(&forked)
        },
    );

    let config = Config::default().with_tests(100);
    match prop.run(&config) {
        TestResult::Pass { .. } => println!("✓ Interning property passed"),
        result => panic!("Interning property failed: {result}"),
    }
}

type Registry = HashMap<Var<u32>, String>;

fn registry_machine(store: Arc<Mutex<HashMap<u32, String>>>) -> StateMachine<Registry> {
    let create_store = Arc::clone(&store);
    let parity_store = Arc::clone(&store);
    let lookup_store = Arc::clone(&store);
    StateMachine::new(Registry::new())
        .command(
            Command::new(
                "create",
                |_: &Registry| Some(Gen::<String>::string_of(Gen::<char>::ascii_alpha(), Range::linear(1, 8))),
                move |name: String| {
                    // only three ids, so distinct creates collide
                    let id = name.len() as u32 % 3;
                    create_store.lock().insert(id, name);
                    id
                },
            )
            .with_update(|state: &mut Registry, name: &String, id: &Var<u32>| {
                state.insert(id.clone(), name.clone());
            })
            .with_ensure(move |_, after: &HashMap<u32, String>, _, id: &u32| {
                let store = parity_store.lock();
                if after.len() != store.len() {
                    return Err(format!("model has {} entries, store has {}", after.len(), store.len()));
                }
                if after.contains_key(id) {
                    Ok(())
                } else {
                    Err(format!("id {id} missing from the model"))
                }
            }),
        )
        .command(
            Command::new(
                "lookup",
                |state: &Registry| {
                    let mut ids: Vec<Var<u32>> = state.keys().cloned().collect();
                    ids.sort();
                    (!ids.is_empty()).then(|| Gen::element(ids))
                },
                move |id: u32| lookup_store.lock().contains_key(&id),
            )
            .with_ensure(|_, _, _, found: &bool| if *found { Ok(()) } else { Err("created id not found".to_string()) }),
        )
        .with_setup(move || store.lock().clear())
}

/// Property: a model keyed by variables stays the same size as the store
/// once equal ids collapse into one key
pub fn test_map_state_parity() {
    let store = Arc::new(Mutex::new(HashMap::new()));
    let machine = registry_machine(Arc::clone(&store));

    match for_all_sequential(&machine, Range::linear(1, 25)).run(&Config::default().with_tests(60)) {
        TestResult::Pass { .. } => println!("✓ Map state parity property passed"),
        result => panic!("Map state parity property failed: {result}"),
    }

    let sequence = machine
        .sequential(Range::constant(6, 6))
        .sample(Size::new(50), Seed::from_u64(11))
        .expect("registry commands are always available");
    let execution = execute_sequential(&machine, &sequence).expect("registry run succeeds");
    let resolved = execution.resolved_state().expect("every id is bound");
    assert_eq!(resolved.len(), store.lock().len());
    assert!(resolved.len() <= 3);
}

fn queue_machine(store: Arc<Mutex<VecDeque<i32>>>, lifo: bool) -> StateMachine<Vec<i32>> {
    let enqueue_store = Arc::clone(&store);
    let dequeue_store = Arc::clone(&store);
    let size_store = Arc::clone(&store);
    StateMachine::new(Vec::new())
        .command(
            Command::new("enqueue", |_: &Vec<i32>| Some(Gen::int_range(0, 100)), move |value: i32| {
                enqueue_store.lock().push_back(value);
            })
            .with_update(|model: &mut Vec<i32>, value: &i32, _| model.push(*value)),
        )
        .command(
            Command::new(
                "dequeue",
                |model: &Vec<i32>| (!model.is_empty()).then(Gen::unit),
                move |_: ()| {
                    let mut queue = dequeue_store.lock();
                    if lifo {
                        queue.pop_back()
                    } else {
                        queue.pop_front()
                    }
                },
            )
            .with_update(|model: &mut Vec<i32>, _, _| {
                model.remove(0);
            })
            .with_ensure(|before: &Vec<i32>, _, _, output: &Option<i32>| {
                if output.as_ref() == before.first() {
                    Ok(())
                } else {
                    Err(format!("dequeued {output:?}, expected {:?}", before.first()))
                }
            }),
        )
        .command(
            Command::new("size", |_: &Vec<i32>| Some(Gen::unit()), move |_: ()| size_store.lock().len())
                .with_ensure(|before: &Vec<i32>, after: &Vec<i32>, _, len: &usize| {
                    if *len == before.len() && before == after {
                        Ok(())
                    } else {
                        Err(format!("size {len}, model has {}", before.len()))
                    }
                }),
        )
        .with_setup(move || store.lock().clear())
}

/// Property: a FIFO queue agrees with the list model, and a LIFO one is
/// caught with a short counterexample
pub fn test_queue_model() {
    let fifo = queue_machine(Arc::new(Mutex::new(VecDeque::new())), false);
    match for_all_sequential(&fifo, Range::linear(0, 40)).run(&Config::default()) {
        TestResult::Pass { .. } => println!("✓ Queue model property passed"),
        result => panic!("Queue model property failed: {result}"),
    }

    let lifo = queue_machine(Arc::new(Mutex::new(VecDeque::new())), true);
    match for_all_sequential(&lifo, Range::linear(0, 40)).run_with_seed(&Config::default(), Seed::from_u64(5)) {
        TestResult::Fail(failure) => {
            assert!(failure.message.contains("dequeued"), "{}", failure.message);
            assert!(failure.counterexample.len() <= failure.original.len());
            let enqueues = failure
                .counterexample
                .descriptions()
                .iter()
                .filter(|description| description.contains("= enqueue("))
                .count();
            assert!(enqueues >= 2, "{:?}", failure.counterexample);
            println!("✓ LIFO queue caught: {:?}", failure.counterexample);
        }
        result => panic!("Expected the LIFO queue to fail: {result}"),
    }
}
