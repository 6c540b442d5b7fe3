//! Generators for collections, options and tuples.

use super::Gen;
use crate::data::{Seed, Size};
use crate::error::GenError;
use crate::range::Range;
use crate::shrink::{self, ListShrink};
use crate::tree::Tree;
use std::collections::BTreeMap;

/// Length range used by [`Gen::vec_of`].
const DEFAULT_LENGTH: (usize, usize) = (0, 100);

fn element_trees<T>(element: &Gen<T>, len: usize, size: Size, seed: Seed) -> Result<Vec<Tree<T>>, GenError> {
    let mut seed = seed;
    let mut trees = Vec::with_capacity(len);
    for _ in 0..len {
        let (this, next) = seed.split();
        seed = next;
        trees.push(element.generate(size, this)?);
    }
    Ok(trees)
}

impl<T: Clone + 'static> Gen<Vec<T>> {
    /// Generate vectors whose length grows with the size, up to 100.
    pub fn vec_of(element: Gen<T>) -> Self {
        Self::vec_with_range(element, Range::linear(DEFAULT_LENGTH.0, DEFAULT_LENGTH.1))
    }

    /// Generate vectors with a length drawn from `length`.
    ///
    /// Shrinks by truncating to every shorter length allowed by the range,
    /// then by shrinking one element at a time.
    pub fn vec_with_range(element: Gen<T>, length: Range<usize>) -> Self {
        Gen::fallible(move |size, seed| {
            let (lower, upper) = length.bounds(size);
            let (length_seed, elements_seed) = seed.split();
            let (offset, _) = length_seed.next_bounded((upper - lower) as u64 + 1);
            let len = lower + offset as usize;
            let trees = element_trees(&element, len, size, elements_seed)?;
            Ok(shrink::list(trees, ListShrink::truncating(length.lower())))
        })
    }

    /// Generate vectors of exactly `len` elements.
    pub fn array_of_length(element: Gen<T>, len: usize) -> Self {
        Gen::fallible(move |size, seed| {
            let trees = element_trees(&element, len, size, seed)?;
            Ok(shrink::list(trees, ListShrink::fixed()))
        })
    }
}

impl<T: Clone + 'static> Gen<Option<T>> {
    /// Generate `None` occasionally, less often as the size grows.
    /// `Some` values shrink to `None` first.
    pub fn option_of(gen: Gen<T>) -> Self {
        Gen::fallible(move |size, seed| {
            let (pick, rest) = seed.split();
            let (roll, _) = pick.next_bounded(size.get() as u64 + 2);
            if roll == 0 {
                return Ok(Tree::singleton(None));
            }
            let some = gen.generate(size, rest)?.map(Some);
            Ok(Tree::lazy(some.value.clone(), move || {
                let mut children = vec![Tree::singleton(None)];
                children.extend(some.children().iter().cloned());
                children
            }))
        })
    }
}

impl<T, E> Gen<Result<T, E>>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// Generate `Ok` or `Err` with equal probability.
    pub fn result_of(ok: Gen<T>, err: Gen<E>) -> Self {
        Gen::fallible(move |size, seed| {
            let (pick, rest) = seed.split();
            let (is_ok, _) = pick.next_bool();
            if is_ok {
                Ok(ok.generate(size, rest)?.map(Ok))
            } else {
                Ok(err.generate(size, rest)?.map(Err))
            }
        })
    }
}

impl<A, B> Gen<(A, B)>
where
    A: Clone + 'static,
    B: Clone + 'static,
{
    /// Generate pairs. Shrinks one position at a time, first position first.
    pub fn tuple_of(first: Gen<A>, second: Gen<B>) -> Self {
        Gen::fallible(move |size, seed| {
            let (left, right) = seed.split();
            let a = first.generate(size, left)?;
            let b = second.generate(size, right)?;
            Ok(shrink::zip(a, b))
        })
    }
}

impl<A, B, C> Gen<(A, B, C)>
where
    A: Clone + 'static,
    B: Clone + 'static,
    C: Clone + 'static,
{
    pub fn tuple3_of(first: Gen<A>, second: Gen<B>, third: Gen<C>) -> Self {
        Gen::fallible(move |size, seed| {
            let (left, rest) = seed.split();
            let (middle, right) = rest.split();
            let a = first.generate(size, left)?;
            let b = second.generate(size, middle)?;
            let c = third.generate(size, right)?;
            Ok(shrink::zip(a, shrink::zip(b, c)).map(|(a, (b, c))| (a, b, c)))
        })
    }
}

impl<V: Clone + 'static> Gen<BTreeMap<String, V>> {
    /// Generate a record with one entry per named field.
    ///
    /// Shrinks one field at a time and keeps every key present. A repeated
    /// field name keeps the last generator's value.
    pub fn record(fields: Vec<(String, Gen<V>)>) -> Self {
        Gen::fallible(move |size, seed| {
            let mut seed = seed;
            let mut trees = Vec::with_capacity(fields.len());
            for (name, gen) in &fields {
                let (this, next) = seed.split();
                seed = next;
                let name = name.clone();
                trees.push(gen.generate(size, this)?.map(move |value| (name.clone(), value)));
            }
            Ok(shrink::list(trees, ListShrink::fixed()).map(|entries| entries.into_iter().collect()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_length_scales_with_size() {
        let gen = Gen::<Vec<i32>>::vec_of(Gen::int_range(0, 9));
        for n in 0..100u64 {
            let value = gen.sample(Size::new(10), Seed::from_u64(n)).unwrap();
            assert!(value.len() <= 10);
        }
        assert!(gen.sample(Size::new(0), Seed::from_u64(1)).unwrap().is_empty());
    }

    #[test]
    fn test_vec_shrinks_truncate_then_substitute() {
        let gen = Gen::<Vec<i32>>::vec_with_range(Gen::int_range(1, 9), Range::constant(2, 6));
        for n in 0..50u64 {
            let tree = gen.generate(Size::new(50), Seed::from_u64(n)).unwrap();
            let value = &tree.value;
            let shrinks = tree.shrinks();
            let truncations = value.len() - 2;
            for (index, shrink) in shrinks.iter().enumerate() {
                assert!(shrink.len() >= 2);
                assert_ne!(*shrink, value);
                if index < truncations {
                    assert!(shrink.len() < value.len());
                    assert_eq!(&value[..shrink.len()], shrink.as_slice());
                } else {
                    assert_eq!(shrink.len(), value.len());
                }
            }
        }
    }

    #[test]
    fn test_array_of_length_is_fixed() {
        let gen = Gen::<Vec<u32>>::array_of_length(Gen::u32_range(0, 100), 4);
        let tree = gen.generate(Size::new(30), Seed::from_u64(9)).unwrap();
        assert_eq!(tree.value.len(), 4);
        assert!(tree.shrinks().iter().all(|shrink| shrink.len() == 4));
    }

    #[test]
    fn test_option_shrinks_to_none_first() {
        let gen = Gen::<Option<i32>>::option_of(Gen::int_range(1, 100));
        let mut saw_some = false;
        for n in 0..50u64 {
            let tree = gen.generate(Size::new(50), Seed::from_u64(n)).unwrap();
            if tree.value.is_some() {
                saw_some = true;
                assert_eq!(tree.shrinks()[0], &None);
            }
        }
        assert!(saw_some);
    }

    #[test]
    fn test_result_of_produces_both() {
        let gen = Gen::<Result<bool, ()>>::result_of(Gen::bool(), Gen::unit());
        let values = gen.samples(50, Seed::from_u64(3));
        assert!(values.iter().any(|value| value.is_ok()));
        assert!(values.iter().any(|value| value.is_err()));
    }

    #[test]
    fn test_tuple_shrinks_one_position_at_a_time() {
        let gen = Gen::<(i32, i32)>::tuple_of(Gen::int_range(0, 50), Gen::int_range(0, 50));
        for n in 0..30u64 {
            let tree = gen.generate(Size::new(50), Seed::from_u64(n)).unwrap();
            let (a, b) = tree.value;
            for (x, y) in tree.shrinks() {
                assert!((*x != a) ^ (*y != b));
            }
        }
    }

    #[test]
    fn test_tuple3_values() {
        let gen = Gen::<(bool, i32, char)>::tuple3_of(Gen::bool(), Gen::int_range(5, 5), Gen::constant('z'));
        let (_, middle, last) = gen.sample(Size::new(1), Seed::from_u64(0)).unwrap();
        assert_eq!((middle, last), (5, 'z'));
    }

    #[test]
    fn test_record_shrinks_preserve_fields() {
        let gen = Gen::record(vec![
            ("age".to_string(), Gen::int_range(0, 120)),
            ("score".to_string(), Gen::int_range(-10, 10)),
        ]);
        for n in 0..30u64 {
            let tree = gen.generate(Size::new(50), Seed::from_u64(n)).unwrap();
            for shrink in tree.shrinks() {
                assert_eq!(shrink.keys().collect::<Vec<_>>(), vec!["age", "score"]);
                let changed = shrink
                    .iter()
                    .filter(|(key, value)| tree.value[key.as_str()] != **value)
                    .count();
                assert_eq!(changed, 1);
            }
        }
    }
}
