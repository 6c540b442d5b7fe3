//! Generator combinators for property-based testing.

mod collection;
mod text;

use crate::error::GenError;
use crate::range::{Range, Scalable};
use crate::shrink::{towards, towards_f64};
use crate::{data::*, tree::*};
use log::trace;
use std::fmt;
use std::rc::Rc;

/// How many fresh attempts [`Gen::filter`] makes before giving up.
pub const DEFAULT_FILTER_RETRIES: usize = 100;

type GenFn<T> = dyn Fn(Size, Seed) -> Result<Tree<T>, GenError>;

/// A generator for test data of type `T`.
///
/// Generators are explicit, first-class values that can be composed
/// using combinator functions. This is a key difference from
/// type-directed approaches like QuickCheck.
///
/// A generator is a pure function of its size and seed: the same pair always
/// produces the same tree, shrinks included. Cloning a generator is cheap.
pub struct Gen<T> {
    generator: Rc<GenFn<T>>,
}

impl<T> Clone for Gen<T> {
    fn clone(&self) -> Self {
        Gen {
            generator: Rc::clone(&self.generator),
        }
    }
}

impl<T> fmt::Debug for Gen<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gen")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> Gen<T> {
    /// Create a new generator from a function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Size, Seed) -> Tree<T> + 'static,
    {
        Gen {
            generator: Rc::new(move |size, seed| Ok(f(size, seed))),
        }
    }

    /// Create a generator that may fail to produce a value.
    pub fn fallible<F>(f: F) -> Self
    where
        F: Fn(Size, Seed) -> Result<Tree<T>, GenError> + 'static,
    {
        Gen {
            generator: Rc::new(f),
        }
    }

    /// Generate a value using the given size and seed.
    pub fn generate(&self, size: Size, seed: Seed) -> Result<Tree<T>, GenError> {
        (self.generator)(size, seed)
    }

    /// Create a generator that always produces the same value.
    pub fn constant(value: T) -> Self
    where
        T: Clone + 'static,
    {
        Gen::new(move |_size, _seed| Tree::singleton(value.clone()))
    }
}

impl<T> Gen<T>
where
    T: Clone + 'static,
{
    /// Map a function over the generated values.
    pub fn map<U, F>(self, f: F) -> Gen<U>
    where
        F: Fn(T) -> U + 'static,
        U: 'static,
    {
        let f: Rc<dyn Fn(T) -> U> = Rc::new(f);
        Gen::fallible(move |size, seed| Ok(self.generate(size, seed)?.map_rc(Rc::clone(&f))))
    }

    /// Bind/flatmap for dependent generation.
    ///
    /// The outer generator draws from the left half of a split seed and the
    /// generator `f` returns draws from the right half. Shrinks of the inner
    /// value are tried before shrinks of the outer one.
    pub fn bind<U, F>(self, f: F) -> Gen<U>
    where
        F: Fn(T) -> Gen<U> + 'static,
        U: Clone + 'static,
    {
        let f = Rc::new(f);
        Gen::fallible(move |size, seed| {
            let (outer_seed, inner_seed) = seed.split();
            let tree = self.generate(size, outer_seed)?;
            let root = f(tree.value.clone()).generate(size, inner_seed)?;
            let k = Rc::clone(&f);
            let continuation: Rc<dyn Fn(&T) -> Option<Tree<U>>> =
                Rc::new(move |value: &T| k(value.clone()).generate(size, inner_seed).ok());
            Ok(tree.graft(root, continuation))
        })
    }

    /// Filter generated values by a predicate.
    ///
    /// Retries with fresh seeds up to [`DEFAULT_FILTER_RETRIES`] times. Shrinks
    /// that fail the predicate are replaced by their nearest passing
    /// descendants.
    pub fn filter<F>(self, predicate: F) -> Gen<T>
    where
        F: Fn(&T) -> bool + 'static,
    {
        self.filter_with_retries(DEFAULT_FILTER_RETRIES, predicate)
    }

    /// [`Gen::filter`] with an explicit retry budget.
    pub fn filter_with_retries<F>(self, retries: usize, predicate: F) -> Gen<T>
    where
        F: Fn(&T) -> bool + 'static,
    {
        let predicate: Rc<dyn Fn(&T) -> bool> = Rc::new(predicate);
        Gen::fallible(move |size, seed| {
            let mut seed = seed;
            for attempt in 0..retries {
                let (attempt_seed, next) = seed.split();
                seed = next;
                match self.generate(size, attempt_seed) {
                    Ok(tree) => {
                        if let Some(kept) = tree.filter_rc(Rc::clone(&predicate)) {
                            return Ok(kept);
                        }
                    }
                    Err(error) => trace!("filter attempt {attempt} could not generate: {error}"),
                }
            }
            Err(GenError::FilterExhausted { retries })
        })
    }

    /// A generator that depends on the current size.
    pub fn sized<F>(f: F) -> Gen<T>
    where
        F: Fn(Size) -> Gen<T> + 'static,
    {
        Gen::fallible(move |size, seed| f(size).generate(size, seed))
    }

    /// Run this generator at a fixed size.
    pub fn resize(self, size: Size) -> Gen<T> {
        Gen::fallible(move |_size, seed| self.generate(size, seed))
    }

    /// Adjust the size this generator sees.
    pub fn scale<F>(self, f: F) -> Gen<T>
    where
        F: Fn(Size) -> Size + 'static,
    {
        Gen::fallible(move |size, seed| self.generate(f(size), seed))
    }

    /// Discard all shrinks.
    pub fn no_shrink(self) -> Gen<T> {
        Gen::fallible(move |size, seed| Ok(Tree::singleton(self.generate(size, seed)?.value)))
    }

    /// Draw a single value, ignoring its shrinks.
    pub fn sample(&self, size: Size, seed: Seed) -> Result<T, GenError> {
        Ok(self.generate(size, seed)?.value)
    }

    /// Draw `count` values at sizes spread over `0..100`. Failed draws are
    /// skipped.
    pub fn samples(&self, count: usize, seed: Seed) -> Vec<T> {
        let mut seed = seed;
        let mut values = Vec::with_capacity(count);
        for n in 0..count {
            let (this, next) = seed.split();
            seed = next;
            let size = Size::new(n * 100 / count.max(1));
            if let Ok(value) = self.sample(size, this) {
                values.push(value);
            }
        }
        values
    }

    /// Choose uniformly between generators.
    pub fn one_of(choices: Vec<Gen<T>>) -> Gen<T> {
        Gen::fallible(move |size, seed| {
            if choices.is_empty() {
                return Err(GenError::EmptyChoice {
                    combinator: "one_of",
                });
            }
            let (pick, rest) = seed.split();
            let (index, _) = pick.next_bounded(choices.len() as u64);
            choices[index as usize].generate(size, rest)
        })
    }

    /// Choose between generators in proportion to their weights.
    pub fn frequency(choices: Vec<(u64, Gen<T>)>) -> Gen<T> {
        let total = choices
            .iter()
            .try_fold(0u64, |total, (weight, _)| total.checked_add(*weight));
        Gen::fallible(move |size, seed| {
            let Some(total) = total else {
                return Err(GenError::InvalidRange {
                    message: "frequency weights overflow u64".to_string(),
                });
            };
            if total == 0 {
                return Err(GenError::EmptyChoice {
                    combinator: "frequency",
                });
            }
            let (pick, rest) = seed.split();
            let (mut roll, _) = pick.next_bounded(total);
            for (weight, gen) in &choices {
                if roll < *weight {
                    return gen.generate(size, rest);
                }
                roll -= weight;
            }
            Err(GenError::EmptyChoice {
                combinator: "frequency",
            })
        })
    }

    /// Pick one of the given values. Shrinks towards earlier elements.
    pub fn element(items: Vec<T>) -> Gen<T> {
        if items.is_empty() {
            return Gen::fallible(|_size, _seed| {
                Err(GenError::EmptyChoice {
                    combinator: "element",
                })
            });
        }
        let items: Rc<[T]> = items.into();
        let last = items.len() - 1;
        Gen::<usize>::from_range(Range::constant(0, last)).map(move |index| items[index].clone())
    }
}

/// Primitive generators.
impl Gen<bool> {
    /// Generate a random boolean. Shrinks to the opposite value.
    pub fn bool() -> Self {
        Gen::new(|_size, seed| {
            let (value, _) = seed.next_bool();
            Tree::with_children(value, vec![Tree::singleton(!value)])
        })
    }
}

impl Gen<()> {
    pub fn unit() -> Self {
        Gen::constant(())
    }
}

/// Integer types that can be drawn from a [`Range`].
pub trait Integral: Scalable + fmt::Debug + 'static {
    fn to_i128(self) -> i128;
    fn from_i128(value: i128) -> Self;
}

macro_rules! integral {
    ($($t:ty),*) => {$(
        impl Integral for $t {
            fn to_i128(self) -> i128 {
                self as i128
            }

            fn from_i128(value: i128) -> Self {
                value as $t
            }
        }
    )*};
}

integral!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl<T: Integral> Gen<T> {
    /// Draw uniformly from the range's bounds at the current size.
    ///
    /// Shrinks by halving the distance to the range's origin, finishing with
    /// the origin itself.
    pub fn from_range(range: Range<T>) -> Self {
        Gen::new(move |size, seed| {
            let (lower, upper) = range.bounds(size);
            let (lower, upper) = (lower.to_i128(), upper.to_i128());
            let width = upper - lower + 1;
            let offset = if width > u64::MAX as i128 {
                i128::from(seed.next_u64().0)
            } else {
                i128::from(seed.next_bounded(width as u64).0)
            };
            let origin = range.origin().to_i128();
            Tree::unfold(lower + offset, move |&value| towards(origin, value)).map(T::from_i128)
        })
    }
}

impl Gen<i32> {
    /// Generate an integer in the given range.
    pub fn int_range(min: i32, max: i32) -> Self {
        Self::from_range(Range::constant(min, max))
    }

    /// Generate a positive integer.
    pub fn positive() -> Self {
        Self::int_range(1, i32::MAX)
    }

    /// Generate a natural number (including zero).
    pub fn natural() -> Self {
        Self::int_range(0, i32::MAX)
    }
}

impl Gen<i64> {
    pub fn i64_range(min: i64, max: i64) -> Self {
        Self::from_range(Range::constant(min, max))
    }
}

impl Gen<u32> {
    pub fn u32_range(min: u32, max: u32) -> Self {
        Self::from_range(Range::constant(min, max))
    }
}

impl Gen<u64> {
    pub fn u64_range(min: u64, max: u64) -> Self {
        Self::from_range(Range::constant(min, max))
    }
}

impl Gen<usize> {
    pub fn usize_range(min: usize, max: usize) -> Self {
        Self::from_range(Range::constant(min, max))
    }
}

/// Options for [`Gen::number`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumberOptions {
    pub range: Range<f64>,
    /// Only produce multiples of this step.
    pub multiple_of: Option<f64>,
    /// When false, NaN and the infinities are drawn about 3% of the time.
    pub finite: bool,
}

impl Default for NumberOptions {
    fn default() -> Self {
        NumberOptions::new(Range::linear(-1000.0, 1000.0))
    }
}

impl NumberOptions {
    pub fn new(range: Range<f64>) -> Self {
        NumberOptions {
            range,
            multiple_of: None,
            finite: true,
        }
    }

    pub fn multiple_of(mut self, step: f64) -> Self {
        self.multiple_of = Some(step);
        self
    }

    pub fn allow_non_finite(mut self) -> Self {
        self.finite = false;
        self
    }
}

const NON_FINITE: [f64; 3] = [f64::NAN, f64::INFINITY, f64::NEG_INFINITY];

impl Gen<f64> {
    /// Generate a finite float in `[min, max]`.
    pub fn f64_range(min: f64, max: f64) -> Self {
        Self::number(NumberOptions::new(Range::constant(min, max)))
    }

    /// Generate a float according to `options`.
    pub fn number(options: NumberOptions) -> Self {
        Gen::fallible(move |size, seed| {
            if let Some(step) = options.multiple_of {
                if !(step.is_finite() && step > 0.0) {
                    return Err(GenError::InvalidRange {
                        message: format!("multiple_of must be positive and finite, got {step}"),
                    });
                }
            }
            let (special, seed) = seed.next_bounded(100);
            if !options.finite && (special as usize) < NON_FINITE.len() {
                return Ok(float_tree(NON_FINITE[special as usize], options));
            }

            let (lower, upper) = options.range.bounds(size);
            let (unit, _) = seed.next_f64();
            let mut value = lower + unit * (upper - lower);
            if let Some(step) = options.multiple_of {
                value = snap(value, step, lower, upper).ok_or_else(|| GenError::InvalidRange {
                    message: format!("no multiple of {step} in [{lower}, {upper}]"),
                })?;
            }
            Ok(float_tree(value, options))
        })
    }
}

/// Round to the nearest multiple of `step` inside `[lower, upper]`.
fn snap(value: f64, step: f64, lower: f64, upper: f64) -> Option<f64> {
    let mut snapped = (value / step).round() * step;
    if snapped < lower {
        snapped += step;
    }
    if snapped > upper {
        snapped -= step;
    }
    (lower <= snapped && snapped <= upper).then_some(snapped)
}

fn float_tree(value: f64, options: NumberOptions) -> Tree<f64> {
    let origin = options.range.origin();
    let (lower, upper) = (options.range.lower(), options.range.upper());
    Tree::unfold(value, move |&current| {
        let mut candidates: Vec<f64> = towards_f64(origin, current)
            .into_iter()
            .filter_map(|candidate| match options.multiple_of {
                Some(step) => snap(candidate, step, lower, upper),
                None => Some(candidate),
            })
            .filter(|candidate| {
                !current.is_finite() || (candidate - origin).abs() < (current - origin).abs()
            })
            .collect();
        candidates.dedup();
        candidates
    })
}
