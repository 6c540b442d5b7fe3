//! Bindings from symbolic variables to concrete values.

use super::var::{Concrete, Symbolic, SymbolicId};
use crate::error::ResolveError;
use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::borrow::Borrow;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A concrete value with its type erased.
pub type Value = Arc<dyn Any + Send + Sync>;

struct Interned<T>(Arc<T>);

impl<T: Hash> Hash for Interned<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (*self.0).hash(state);
    }
}

impl<T: PartialEq> PartialEq for Interned<T> {
    fn eq(&self, other: &Self) -> bool {
        *self.0 == *other.0
    }
}

impl<T: Eq> Eq for Interned<T> {}

impl<T> Borrow<T> for Interned<T> {
    fn borrow(&self) -> &T {
        &self.0
    }
}

/// Hands out one shared allocation per distinct value.
///
/// Values are keyed by their type and their `Hash`/`Eq` structure. One table
/// exists per type, behind a single lock.
#[derive(Default)]
pub struct Interner {
    tables: Mutex<HashMap<TypeId, Box<dyn Any + Send>>>,
}

impl Interner {
    pub fn intern<T>(&self, value: T) -> Arc<T>
    where
        T: Hash + Eq + Send + Sync + 'static,
    {
        let mut tables = self.tables.lock();
        let table = tables
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(HashSet::<Interned<T>>::new()));
        let Some(table) = table.downcast_mut::<HashSet<Interned<T>>>() else {
            return Arc::new(value);
        };
        if let Some(existing) = table.get(&value) {
            return Arc::clone(&existing.0);
        }
        let interned = Arc::new(value);
        table.insert(Interned(Arc::clone(&interned)));
        interned
    }

    /// Number of types with an intern table.
    pub fn len(&self) -> usize {
        self.tables.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.lock().is_empty()
    }
}

/// Environment for mapping symbolic variables to concrete values during execution.
///
/// Clones copy the bindings and share the interner, so structurally equal
/// values created in any clone are the same instance. Independently
/// constructed environments share nothing.
#[derive(Clone, Default)]
pub struct Environment {
    bindings: HashMap<SymbolicId, Value>,
    interner: Arc<Interner>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of this environment for a concurrent branch.
    pub fn fork(&self) -> Self {
        self.clone()
    }

    /// Intern `value`. Equal values give the same instance.
    pub fn create_concrete<T>(&self, value: T) -> Concrete<T>
    where
        T: Hash + Eq + Send + Sync + 'static,
    {
        Concrete::from_arc(self.interner.intern(value))
    }

    pub fn insert<T: Send + Sync + 'static>(&mut self, symbolic: Symbolic<T>, concrete: Concrete<T>) {
        let value: Value = concrete.into_arc();
        self.bindings.insert(symbolic.id(), value);
    }

    pub fn get<T: Send + Sync + 'static>(&self, symbolic: &Symbolic<T>) -> Result<Concrete<T>, ResolveError> {
        let id = symbolic.id();
        let value = self.bindings.get(&id).ok_or(ResolveError::Unbound(id))?;
        Arc::clone(value)
            .downcast::<T>()
            .map(Concrete::from_arc)
            .map_err(|_| ResolveError::TypeMismatch {
                variable: id,
                expected: std::any::type_name::<T>(),
            })
    }

    pub fn contains(&self, id: SymbolicId) -> bool {
        self.bindings.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn shares_interner(&self, other: &Environment) -> bool {
        Arc::ptr_eq(&self.interner, &other.interner)
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<_> = self.bindings.keys().collect();
        ids.sort();
        f.debug_struct("Environment").field("bound", &ids).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_environment() {
        let mut env = Environment::new();
        let sym: Symbolic<i32> = Symbolic::new(SymbolicId(0));

        env.insert(sym, Concrete::new(42));
        assert_eq!(env.get(&sym).map(|c| *c.value()), Ok(42));
        assert!(env.contains(SymbolicId(0)));

        let missing: Symbolic<i32> = Symbolic::new(SymbolicId(1));
        assert_eq!(env.get(&missing), Err(ResolveError::Unbound(SymbolicId(1))));

        let wrong: Symbolic<String> = Symbolic::new(SymbolicId(0));
        assert!(matches!(env.get(&wrong), Err(ResolveError::TypeMismatch { .. })));
    }

    #[test]
    fn test_interning_within_environment() {
        let env = Environment::new();
        let a = env.create_concrete(vec![1, 2, 3]);
        let b = env.create_concrete(vec![1, 2, 3]);
        let c = env.create_concrete(vec![3, 2, 1]);
        assert!(a.same_instance(&b));
        assert!(!a.same_instance(&c));
    }

    #[test]
    fn test_interning_shared_by_clones() {
        let env = Environment::new();
        let fork = env.fork();
        assert!(env.shares_interner(&fork));
        let a = env.create_concrete("order-7".to_string());
        let b = fork.create_concrete("order-7".to_string());
        assert!(a.same_instance(&b));
    }

    #[test]
    fn test_independent_environments_do_not_share() {
        let a = Environment::new().create_concrete(11u64);
        let b = Environment::new().create_concrete(11u64);
        assert_eq!(a, b);
        assert!(!a.same_instance(&b));
    }

    #[test]
    fn test_interning_is_thread_safe() {
        let env = Environment::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let fork = env.fork();
                thread::spawn(move || {
                    (0..100u32)
                        .map(|n| fork.create_concrete(n % 10))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let all: Vec<Vec<Concrete<u32>>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for values in &all {
            for value in values {
                let canonical = env.create_concrete(*value.value());
                assert!(value.same_instance(&canonical));
            }
        }
    }
}
