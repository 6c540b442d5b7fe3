//! State machine testing demonstration
//!
//! A tiny file table is driven by generated command sequences. Opening a
//! file returns a handle that later commands refer to through a variable,
//! so the model never needs to know which handle the real table will pick.

use hedgehog::*;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// The system under test.
#[derive(Default)]
struct FileTable {
    next: AtomicU32,
    files: Mutex<HashMap<u32, Vec<u8>>>,
}

impl FileTable {
    fn open(&self) -> u32 {
        let handle = self.next.fetch_add(1, Ordering::SeqCst);
        self.files.lock().insert(handle, Vec::new());
        handle
    }

    fn write(&self, handle: u32, byte: u8) -> std::result::Result<usize, String> {
        let mut files = self.files.lock();
        let file = files.get_mut(&handle).ok_or(format!("bad handle {handle}"))?;
        file.push(byte);
        Ok(file.len())
    }

    fn read(&self, handle: u32) -> Option<Vec<u8>> {
        self.files.lock().get(&handle).cloned()
    }

    fn reset(&self) {
        self.next.store(0, Ordering::SeqCst);
        self.files.lock().clear();
    }
}

/// The model: contents of every file opened so far, keyed by handle variable.
type Model = HashMap<Var<u32>, Vec<u8>>;

fn handles(model: &Model) -> Vec<Var<u32>> {
    let mut handles: Vec<Var<u32>> = model.keys().cloned().collect();
    handles.sort();
    handles
}

fn file_table_machine(table: Arc<FileTable>) -> StateMachine<Model> {
    let open_table = Arc::clone(&table);
    let write_table = Arc::clone(&table);
    let read_table = Arc::clone(&table);

    StateMachine::new(Model::new())
        .command(
            Command::new("open", |_: &Model| Some(Gen::unit()), move |_: ()| open_table.open())
                .with_update(|model: &mut Model, _, handle: &Var<u32>| {
                    model.insert(handle.clone(), Vec::new());
                }),
        )
        .command(
            Command::fallible(
                "write",
                |model: &Model| {
                    let handles = handles(model);
                    (!handles.is_empty()).then(|| {
                        Gen::<(Var<u32>, u32)>::tuple_of(Gen::element(handles), Gen::u32_range(0, 255))
                    })
                },
                move |(handle, byte): (u32, u32)| write_table.write(handle, byte as u8),
            )
            .with_update(|model: &mut Model, (handle, byte): &(Var<u32>, u32), _| {
                if let Some(contents) = model.get_mut(handle) {
                    contents.push(*byte as u8);
                }
            })
            .with_ensure(|_, after: &HashMap<u32, Vec<u8>>, (handle, _): &(u32, u32), len: &usize| {
                match after.get(handle) {
                    Some(contents) if contents.len() == *len => Ok(()),
                    contents => Err(format!("wrote to length {len}, model has {contents:?}")),
                }
            }),
        )
        .command(
            Command::new(
                "read",
                |model: &Model| {
                    let handles = handles(model);
                    (!handles.is_empty()).then(|| Gen::element(handles))
                },
                move |handle: u32| read_table.read(handle),
            )
            .with_ensure(|before: &HashMap<u32, Vec<u8>>, _, handle: &u32, contents: &Option<Vec<u8>>| {
                if contents.as_ref() == before.get(handle) {
                    Ok(())
                } else {
                    Err(format!("read {contents:?}, model has {:?}", before.get(handle)))
                }
            }),
        )
        .with_setup(move || table.reset())
}

fn main() {
    let _ = env_logger::builder().try_init();
    println!("=== State Machine Testing ===\n");

    let table = Arc::new(FileTable::default());
    let machine = file_table_machine(Arc::clone(&table));
    println!("commands: {:?}\n", machine.command_names());

    println!("1. A generated sequence");
    match machine.sequential(Range::linear(1, 8)).sample(Size::new(40), Seed::from_u64(3)) {
        Ok(sequence) => {
            for description in sequence.descriptions() {
                println!("   {description}");
            }
            match execute_sequential(&machine, &sequence) {
                Ok(execution) => println!("   final state: {:?}", execution.resolved_state()),
                Err(failure) => println!("   ✗ {failure}"),
            }
        }
        Err(error) => println!("   could not generate: {error}"),
    }
    println!();

    println!("2. Sequential property");
    match for_all_sequential(&machine, Range::linear(0, 30)).run(&Config::default()) {
        TestResult::Pass { tests_run, .. } => println!("   ✓ passed {tests_run} sequences"),
        result => println!("   ✗ {result}"),
    }
    println!();

    println!("3. Parallel property");
    match for_all_parallel(&machine, Range::linear(1, 4), Range::linear(1, 3)).run(&Config::default().with_tests(30)) {
        TestResult::Pass { tests_run, .. } => println!("   ✓ {tests_run} parallel runs linearized"),
        result => println!("   ✗ {result}"),
    }
}
