//! Turning symbolic values into concrete ones.

use super::env::Environment;
use super::var::{Symbolic, SymbolicId, Var};
use crate::error::ResolveError;
use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

/// Values that may contain variables.
///
/// `resolve` replaces every variable with its plain value; this is what
/// executors and `ensure` callbacks see. `concretize` keeps the `Var`
/// wrappers but swaps symbolic variables for the concrete values they are
/// bound to; this is what `require` callbacks see during execution, so that
/// comparisons between variables keep working.
pub trait Resolve {
    type Resolved: Clone + Debug;

    fn resolve(&self, env: &Environment) -> Result<Self::Resolved, ResolveError>;

    fn concretize(&self, env: &Environment) -> Result<Self, ResolveError>
    where
        Self: Sized;

    /// Push the id of every symbolic variable this value mentions.
    fn symbolic_ids(&self, _ids: &mut Vec<SymbolicId>) {}
}

/// Implement [`Resolve`] for types that never contain variables.
///
/// ```
/// use hedgehog_core::plain_resolve;
///
/// #[derive(Debug, Clone)]
/// struct Account {
///     balance: u64,
/// }
///
/// plain_resolve!(Account);
/// ```
#[macro_export]
macro_rules! plain_resolve {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::Resolve for $ty {
                type Resolved = $ty;

                fn resolve(
                    &self,
                    _env: &$crate::Environment,
                ) -> ::std::result::Result<$ty, $crate::ResolveError> {
                    ::std::result::Result::Ok(::std::clone::Clone::clone(self))
                }

                fn concretize(
                    &self,
                    _env: &$crate::Environment,
                ) -> ::std::result::Result<Self, $crate::ResolveError> {
                    ::std::result::Result::Ok(::std::clone::Clone::clone(self))
                }
            }
        )*
    };
}

plain_resolve!(
    (),
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    f32,
    f64,
    String,
    &'static str,
);

impl<T> Resolve for Var<T>
where
    T: Clone + Debug + Send + Sync + 'static,
{
    type Resolved = T;

    fn resolve(&self, env: &Environment) -> Result<T, ResolveError> {
        match self {
            Var::Symbolic(symbolic) => Ok(env.get(symbolic)?.value().clone()),
            Var::Concrete(concrete) => Ok(concrete.value().clone()),
        }
    }

    fn concretize(&self, env: &Environment) -> Result<Self, ResolveError> {
        match self {
            Var::Symbolic(symbolic) => Ok(Var::Concrete(env.get(symbolic)?)),
            Var::Concrete(concrete) => Ok(Var::Concrete(concrete.clone())),
        }
    }

    fn symbolic_ids(&self, ids: &mut Vec<SymbolicId>) {
        ids.extend(self.id());
    }
}

impl<T> Resolve for Symbolic<T>
where
    T: Clone + Debug + Send + Sync + 'static,
{
    type Resolved = T;

    fn resolve(&self, env: &Environment) -> Result<T, ResolveError> {
        Ok(env.get(self)?.value().clone())
    }

    /// A bare symbolic variable has nowhere to put its value, so it stays
    /// as it is once its binding has been checked.
    fn concretize(&self, env: &Environment) -> Result<Self, ResolveError> {
        env.get(self)?;
        Ok(*self)
    }

    fn symbolic_ids(&self, ids: &mut Vec<SymbolicId>) {
        ids.push(self.id());
    }
}

impl<T: Resolve> Resolve for Option<T> {
    type Resolved = Option<T::Resolved>;

    fn resolve(&self, env: &Environment) -> Result<Self::Resolved, ResolveError> {
        self.as_ref().map(|value| value.resolve(env)).transpose()
    }

    fn concretize(&self, env: &Environment) -> Result<Self, ResolveError> {
        self.as_ref().map(|value| value.concretize(env)).transpose()
    }

    fn symbolic_ids(&self, ids: &mut Vec<SymbolicId>) {
        if let Some(value) = self {
            value.symbolic_ids(ids);
        }
    }
}

impl<T: Resolve> Resolve for Box<T> {
    type Resolved = Box<T::Resolved>;

    fn resolve(&self, env: &Environment) -> Result<Self::Resolved, ResolveError> {
        Ok(Box::new((**self).resolve(env)?))
    }

    fn concretize(&self, env: &Environment) -> Result<Self, ResolveError> {
        Ok(Box::new((**self).concretize(env)?))
    }

    fn symbolic_ids(&self, ids: &mut Vec<SymbolicId>) {
        (**self).symbolic_ids(ids);
    }
}

impl<T: Resolve> Resolve for Vec<T> {
    type Resolved = Vec<T::Resolved>;

    fn resolve(&self, env: &Environment) -> Result<Self::Resolved, ResolveError> {
        self.iter().map(|value| value.resolve(env)).collect()
    }

    fn concretize(&self, env: &Environment) -> Result<Self, ResolveError> {
        self.iter().map(|value| value.concretize(env)).collect()
    }

    fn symbolic_ids(&self, ids: &mut Vec<SymbolicId>) {
        for value in self {
            value.symbolic_ids(ids);
        }
    }
}

macro_rules! tuple_resolve {
    ($($name:ident : $index:tt),+) => {
        impl<$($name: Resolve),+> Resolve for ($($name,)+) {
            type Resolved = ($($name::Resolved,)+);

            fn resolve(&self, env: &Environment) -> Result<Self::Resolved, ResolveError> {
                Ok(($(self.$index.resolve(env)?,)+))
            }

            fn concretize(&self, env: &Environment) -> Result<Self, ResolveError> {
                Ok(($(self.$index.concretize(env)?,)+))
            }

            fn symbolic_ids(&self, ids: &mut Vec<SymbolicId>) {
                $(self.$index.symbolic_ids(ids);)+
            }
        }
    };
}

tuple_resolve!(A: 0, B: 1);
tuple_resolve!(A: 0, B: 1, C: 2);
tuple_resolve!(A: 0, B: 1, C: 2, D: 3);

/// Entries ordered by the variables their keys mention, so that when two keys
/// collapse the one bound last wins regardless of hash order.
fn in_binding_order<K: Resolve, V>(map: &HashMap<K, V>) -> Vec<(&K, &V)> {
    let mut entries: Vec<(Vec<SymbolicId>, (&K, &V))> = map
        .iter()
        .map(|entry| {
            let mut ids = Vec::new();
            entry.0.symbolic_ids(&mut ids);
            (ids, entry)
        })
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    entries.into_iter().map(|(_, entry)| entry).collect()
}

impl<K, V> Resolve for HashMap<K, V>
where
    K: Resolve + Clone + Debug + Eq + Hash,
    K::Resolved: Eq + Hash,
    V: Resolve + Clone + Debug,
{
    type Resolved = HashMap<K::Resolved, V::Resolved>;

    /// Resolves keys and values. Two keys that resolve to the same plain key
    /// collapse into one entry, as they would in a real keyed store; the key
    /// bound last keeps its value.
    fn resolve(&self, env: &Environment) -> Result<Self::Resolved, ResolveError> {
        let mut resolved = HashMap::with_capacity(self.len());
        for (key, value) in in_binding_order(self) {
            let plain = key.resolve(env)?;
            if resolved.insert(plain.clone(), value.resolve(env)?).is_some() {
                warn!("model keys resolved to the same key {plain:?}; the executor may be returning duplicate ids");
            }
        }
        Ok(resolved)
    }

    fn concretize(&self, env: &Environment) -> Result<Self, ResolveError> {
        let mut concrete = HashMap::with_capacity(self.len());
        for (key, value) in in_binding_order(self) {
            let key = key.concretize(env)?;
            if concrete.contains_key(&key) {
                debug!("model key {key:?} concretized onto an existing key");
            }
            concrete.insert(key, value.concretize(env)?);
        }
        Ok(concrete)
    }

    fn symbolic_ids(&self, ids: &mut Vec<SymbolicId>) {
        for (key, value) in self {
            key.symbolic_ids(ids);
            value.symbolic_ids(ids);
        }
    }
}

impl<K, V> Resolve for BTreeMap<K, V>
where
    K: Resolve + Clone + Debug + Ord,
    K::Resolved: Ord,
    V: Resolve + Clone + Debug,
{
    type Resolved = BTreeMap<K::Resolved, V::Resolved>;

    fn resolve(&self, env: &Environment) -> Result<Self::Resolved, ResolveError> {
        let mut resolved = BTreeMap::new();
        for (key, value) in self {
            let plain = key.resolve(env)?;
            if resolved.insert(plain.clone(), value.resolve(env)?).is_some() {
                warn!("model keys resolved to the same key {plain:?}; the executor may be returning duplicate ids");
            }
        }
        Ok(resolved)
    }

    fn concretize(&self, env: &Environment) -> Result<Self, ResolveError> {
        let mut concrete = BTreeMap::new();
        for (key, value) in self {
            let key = key.concretize(env)?;
            if concrete.contains_key(&key) {
                debug!("model key {key:?} concretized onto an existing key");
            }
            concrete.insert(key, value.concretize(env)?);
        }
        Ok(concrete)
    }

    fn symbolic_ids(&self, ids: &mut Vec<SymbolicId>) {
        for (key, value) in self {
            key.symbolic_ids(ids);
            value.symbolic_ids(ids);
        }
    }
}

impl<T> Resolve for HashSet<T>
where
    T: Resolve + Clone + Debug + Eq + Hash,
    T::Resolved: Eq + Hash,
{
    type Resolved = HashSet<T::Resolved>;

    fn resolve(&self, env: &Environment) -> Result<Self::Resolved, ResolveError> {
        self.iter().map(|value| value.resolve(env)).collect()
    }

    fn concretize(&self, env: &Environment) -> Result<Self, ResolveError> {
        self.iter().map(|value| value.concretize(env)).collect()
    }

    fn symbolic_ids(&self, ids: &mut Vec<SymbolicId>) {
        for value in self {
            value.symbolic_ids(ids);
        }
    }
}

impl<T> Resolve for BTreeSet<T>
where
    T: Resolve + Clone + Debug + Ord,
    T::Resolved: Ord,
{
    type Resolved = BTreeSet<T::Resolved>;

    fn resolve(&self, env: &Environment) -> Result<Self::Resolved, ResolveError> {
        self.iter().map(|value| value.resolve(env)).collect()
    }

    fn concretize(&self, env: &Environment) -> Result<Self, ResolveError> {
        self.iter().map(|value| value.concretize(env)).collect()
    }

    fn symbolic_ids(&self, ids: &mut Vec<SymbolicId>) {
        for value in self {
            value.symbolic_ids(ids);
        }
    }
}
