//! Property definitions for property-based testing.

use crate::{data::*, error::*, gen::*, tree::*};
use log::{debug, info};
use std::collections::HashMap;
use std::fmt;

/// Statistics gathered during property testing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestStatistics {
    pub classifications: HashMap<String, usize>,
    pub total_tests: usize,
}

impl TestStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_classification(&mut self, name: &str) {
        *self.classifications.entry(name.to_string()).or_insert(0) += 1;
    }
}

/// A failing test case together with its minimal counterexample.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure<T> {
    /// The value that first failed.
    pub original: T,
    /// The smallest failing value the shrink search reached.
    pub counterexample: T,
    /// Every accepted shrink, in order. Ends with `counterexample`.
    pub shrink_path: Vec<T>,
    pub shrinks: usize,
    pub tests_run: usize,
    /// Seed of the whole run; passing it to `run_with_seed` replays the
    /// failure.
    pub seed: Seed,
    /// Size the original value was generated at.
    pub size: Size,
    /// Message returned by the property for the counterexample.
    pub message: String,
    pub variable_name: Option<String>,
    pub property_name: Option<String>,
}

/// Outcome of a property test.
#[derive(Debug, Clone, PartialEq)]
pub enum TestResult<T> {
    Pass {
        tests_run: usize,
        discards: usize,
        statistics: TestStatistics,
        property_name: Option<String>,
    },
    Fail(Failure<T>),
    /// Too many generated values were discarded.
    GaveUp {
        tests_run: usize,
        discards: usize,
        property_name: Option<String>,
    },
}

impl<T> TestResult<T> {
    pub fn is_pass(&self) -> bool {
        matches!(self, TestResult::Pass { .. })
    }

    pub fn failure(&self) -> Option<&Failure<T>> {
        match self {
            TestResult::Fail(failure) => Some(failure),
            _ => None,
        }
    }
}

impl<T: fmt::Debug> fmt::Display for TestResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestResult::Pass {
                tests_run,
                discards,
                statistics,
                property_name,
            } => {
                let prop_name = property_name.as_deref().unwrap_or("property");
                write!(f, "  ✓ {prop_name} passed {tests_run} tests.")?;
                if *discards > 0 {
                    write!(f, " ({discards} discarded)")?;
                }
                if !statistics.classifications.is_empty() {
                    writeln!(f)?;
                    writeln!(f)?;
                    write!(f, "  Test data distribution:")?;
                    let mut names: Vec<_> = statistics.classifications.keys().collect();
                    names.sort();
                    for name in names {
                        let count = statistics.classifications[name];
                        let percentage = count as f64 / statistics.total_tests.max(1) as f64 * 100.0;
                        write!(f, "\n    {percentage:>3.0}% {name}")?;
                    }
                }
                Ok(())
            }
            TestResult::Fail(failure) => {
                let prop_name = failure.property_name.as_deref().unwrap_or("property");
                writeln!(
                    f,
                    "  ✗ {} failed after {} tests and {} shrinks.",
                    prop_name, failure.tests_run, failure.shrinks
                )?;
                writeln!(f)?;
                writeln!(f, "    Shrinking progression:")?;
                let steps = std::iter::once(&failure.original).chain(&failure.shrink_path);
                for (step, value) in steps.enumerate() {
                    match &failure.variable_name {
                        Some(name) => writeln!(f, "      │ forAll {step} = {value:?} -- {name}")?,
                        None if step == 0 => writeln!(f, "      │ Original: {value:?}")?,
                        None => writeln!(f, "      │ Step {step}: {value:?}")?,
                    }
                }
                writeln!(f)?;
                if !failure.message.is_empty() {
                    writeln!(f, "    {}", failure.message)?;
                }
                writeln!(f, "    Minimal counterexample: {:?}", failure.counterexample)?;
                write!(
                    f,
                    "    Reproduce with seed Seed::from_parts({}, {}) at {}",
                    failure.seed.state(),
                    failure.seed.gamma(),
                    failure.size
                )
            }
            TestResult::GaveUp {
                tests_run,
                discards,
                property_name,
            } => {
                let prop_name = property_name.as_deref().unwrap_or("property");
                write!(
                    f,
                    "  ⚐ {prop_name} gave up after {discards} discards, passed {tests_run} tests."
                )
            }
        }
    }
}

type TestFn<T> = Box<dyn Fn(&T) -> std::result::Result<(), String>>;
type ClassificationFn<T> = Box<dyn Fn(&T) -> bool>;

/// A property that can be tested with generated inputs.
pub struct Property<T> {
    generator: Gen<T>,
    test_function: TestFn<T>,
    variable_name: Option<String>,
    property_name: Option<String>,
    classifications: Vec<(String, ClassificationFn<T>)>,
    examples: Vec<T>,
}

const CONDITION_FAILED: &str = "condition returned false";

impl<T> Property<T>
where
    T: 'static + fmt::Debug + Clone,
{
    /// Create a new property from a generator and test function.
    ///
    /// The test function returns `Err` with a description when the value
    /// falsifies the property.
    pub fn new<F>(generator: Gen<T>, test_function: F) -> Self
    where
        F: Fn(&T) -> std::result::Result<(), String> + 'static,
    {
        Property {
            generator,
            test_function: Box::new(test_function),
            variable_name: None,
            property_name: None,
            classifications: Vec::new(),
            examples: Vec::new(),
        }
    }

    /// Create a property that checks a boolean condition.
    pub fn for_all<F>(generator: Gen<T>, condition: F) -> Self
    where
        F: Fn(&T) -> bool + 'static,
    {
        Property::new(generator, move |input| {
            if condition(input) {
                Ok(())
            } else {
                Err(CONDITION_FAILED.to_string())
            }
        })
    }

    /// Create a property that checks a boolean condition with a named variable.
    pub fn for_all_named<F>(generator: Gen<T>, variable_name: &str, condition: F) -> Self
    where
        F: Fn(&T) -> bool + 'static,
    {
        let mut property = Property::for_all(generator, condition);
        property.variable_name = Some(variable_name.to_string());
        property
    }

    /// Name the property in reports.
    pub fn named(mut self, name: &str) -> Self {
        self.property_name = Some(name.to_string());
        self
    }

    /// Add a classification to categorize test inputs.
    pub fn classify<F>(mut self, name: &str, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + 'static,
    {
        self.classifications.push((name.to_string(), Box::new(predicate)));
        self
    }

    /// Check these values before any generated ones.
    ///
    /// Examples count towards `tests_run` but not towards the test limit, and
    /// are reported unshrunk when they fail.
    pub fn with_examples(mut self, examples: Vec<T>) -> Self {
        self.examples = examples;
        self
    }

    /// Run this property with a fresh random seed.
    pub fn run(&self, config: &Config) -> TestResult<T> {
        self.run_with_seed(config, Seed::random())
    }

    /// Run this property deterministically from `seed`.
    pub fn run_with_seed(&self, config: &Config, seed: Seed) -> TestResult<T> {
        let mut statistics = TestStatistics::new();
        let mut tests_run = 0;
        let mut discards = 0;

        for example in &self.examples {
            tests_run += 1;
            self.collect_statistics(example, &mut statistics);
            if let Err(message) = (self.test_function)(example) {
                debug!("example {example:?} falsified the property");
                return TestResult::Fail(Failure {
                    original: example.clone(),
                    counterexample: example.clone(),
                    shrink_path: Vec::new(),
                    shrinks: 0,
                    tests_run,
                    seed,
                    size: Size::new(0),
                    message,
                    variable_name: self.variable_name.clone(),
                    property_name: self.property_name.clone(),
                });
            }
        }

        let mut current_seed = seed;
        for test_num in 0..config.test_limit {
            let size = config.size_for(test_num);
            let (test_seed, next_seed) = current_seed.split();
            current_seed = next_seed;

            let tree = match self.generator.generate(size, test_seed) {
                Ok(tree) => tree,
                Err(error) => {
                    discards += 1;
                    debug!("discarded test {test_num} at {size}: {error}");
                    if discards >= config.discard_limit {
                        info!("gave up after {discards} discards and {tests_run} tests");
                        return TestResult::GaveUp {
                            tests_run,
                            discards,
                            property_name: self.property_name.clone(),
                        };
                    }
                    continue;
                }
            };

            tests_run += 1;
            self.collect_statistics(&tree.value, &mut statistics);
            if let Err(message) = (self.test_function)(&tree.value) {
                debug!("test {tests_run} failed at {size}, shrinking {:?}", tree.value);
                return TestResult::Fail(self.shrink_failure(tree, message, config, tests_run, seed, size));
            }
        }

        statistics.total_tests = tests_run;
        info!("passed {tests_run} tests with {discards} discards");
        TestResult::Pass {
            tests_run,
            discards,
            statistics,
            property_name: self.property_name.clone(),
        }
    }

    /// Run with a fresh seed, turning anything but a pass into an error
    /// carrying the formatted report.
    pub fn check(&self, config: &Config) -> Result<()> {
        self.check_with_seed(config, Seed::random())
    }

    pub fn check_with_seed(&self, config: &Config, seed: Seed) -> Result<()> {
        let result = self.run_with_seed(config, seed);
        match &result {
            TestResult::Pass { .. } => Ok(()),
            TestResult::Fail(failure) => Err(HedgehogError::PropertyFailed {
                report: result.to_string(),
                seed: failure.seed,
                shrinks: failure.shrinks,
            }),
            TestResult::GaveUp {
                tests_run, discards, ..
            } => Err(HedgehogError::GaveUp {
                discards: *discards,
                tests_run: *tests_run,
            }),
        }
    }

    fn collect_statistics(&self, value: &T, statistics: &mut TestStatistics) {
        for (name, predicate) in &self.classifications {
            if predicate(value) {
                statistics.record_classification(name);
            }
        }
    }

    /// Depth-first search for a smaller failing value.
    ///
    /// Takes the first failing child at each level and never backtracks.
    /// Every candidate evaluated counts against the shrink limit.
    fn shrink_failure(
        &self,
        tree: Tree<T>,
        message: String,
        config: &Config,
        tests_run: usize,
        seed: Seed,
        size: Size,
    ) -> Failure<T> {
        let original = tree.value.clone();
        let mut current = tree;
        let mut message = message;
        let mut shrink_path = Vec::new();
        let mut attempts = 0;

        'search: loop {
            let mut next = None;
            for child in current.children() {
                if attempts >= config.shrink_limit {
                    debug!("shrink limit of {} reached", config.shrink_limit);
                    break 'search;
                }
                attempts += 1;
                if let Err(child_message) = (self.test_function)(&child.value) {
                    next = Some((child.clone(), child_message));
                    break;
                }
            }
            match next {
                Some((child, child_message)) => {
                    debug!("shrink {}: {:?}", shrink_path.len() + 1, child.value);
                    shrink_path.push(child.value.clone());
                    current = child;
                    message = child_message;
                }
                None => break,
            }
        }

        Failure {
            original,
            counterexample: current.value,
            shrinks: shrink_path.len(),
            shrink_path,
            tests_run,
            seed,
            size,
            message,
            variable_name: self.variable_name.clone(),
            property_name: self.property_name.clone(),
        }
    }
}

/// Create a property for a generator and test function.
pub fn property<T, F>(generator: Gen<T>, test_function: F) -> Property<T>
where
    T: 'static + fmt::Debug + Clone,
    F: Fn(&T) -> std::result::Result<(), String> + 'static,
{
    Property::new(generator, test_function)
}

/// Create a property that checks a boolean condition.
pub fn for_all<T, F>(generator: Gen<T>, condition: F) -> Property<T>
where
    T: 'static + fmt::Debug + Clone,
    F: Fn(&T) -> bool + 'static,
{
    Property::for_all(generator, condition)
}

/// Create a property that checks a boolean condition with a named variable.
pub fn for_all_named<T, F>(generator: Gen<T>, variable_name: &str, condition: F) -> Property<T>
where
    T: 'static + fmt::Debug + Clone,
    F: Fn(&T) -> bool + 'static,
{
    Property::for_all_named(generator, variable_name, condition)
}
