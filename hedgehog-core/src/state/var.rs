//! Symbolic and concrete variables.

use std::cmp::Ordering;
use std::fmt::{self, Debug, Display};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{self, AtomicU64};
use std::sync::Arc;

/// Ids are unique for the lifetime of the process and never reused.
static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// A unique identifier for symbolic variables during generation phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolicId(pub u64);

impl SymbolicId {
    /// Mint an id no other variable in this process has.
    pub fn fresh() -> Self {
        SymbolicId(NEXT_ID.fetch_add(1, atomic::Ordering::Relaxed))
    }
}

impl Display for SymbolicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Var{}", self.0)
    }
}

/// Symbolic variables represent the potential results of actions during generation.
/// They allow later actions to reference the results of earlier actions before execution.
pub struct Symbolic<T> {
    id: SymbolicId,
    _phantom: PhantomData<fn() -> T>,
}

impl<T> Symbolic<T> {
    pub fn new(id: SymbolicId) -> Self {
        Self {
            id,
            _phantom: PhantomData,
        }
    }

    pub fn fresh() -> Self {
        Self::new(SymbolicId::fresh())
    }

    pub fn id(&self) -> SymbolicId {
        self.id
    }
}

impl<T> Clone for Symbolic<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Symbolic<T> {}

impl<T> PartialEq for Symbolic<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Symbolic<T> {}

impl<T> PartialOrd for Symbolic<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Symbolic<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl<T> Hash for Symbolic<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> Debug for Symbolic<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl<T> Display for Symbolic<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Concrete variables hold actual values during execution phase.
///
/// Equality is structural. Values created through the same
/// [`Environment`](super::Environment) family are interned, so equal values
/// also share one allocation; see [`Concrete::same_instance`].
pub struct Concrete<T> {
    value: Arc<T>,
}

impl<T> Concrete<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: Arc::new(value),
        }
    }

    pub(crate) fn from_arc(value: Arc<T>) -> Self {
        Self { value }
    }

    pub(crate) fn into_arc(self) -> Arc<T> {
        self.value
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    /// Whether both refer to the very same interned value.
    pub fn same_instance(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl<T> Clone for Concrete<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
        }
    }
}

impl<T: PartialEq> PartialEq for Concrete<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T: Eq> Eq for Concrete<T> {}

impl<T: Hash> Hash for Concrete<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T: Debug> Debug for Concrete<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt(f)
    }
}

impl<T: Display> Display for Concrete<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Variable type that can be either Symbolic (during generation) or Concrete (during execution).
///
/// Symbolic variables compare by id and concrete ones by value. A symbolic
/// variable never equals a concrete one.
pub enum Var<T> {
    Symbolic(Symbolic<T>),
    Concrete(Concrete<T>),
}

impl<T> Var<T> {
    pub fn symbolic(id: SymbolicId) -> Self {
        Self::Symbolic(Symbolic::new(id))
    }

    pub fn concrete(value: T) -> Self {
        Self::Concrete(Concrete::new(value))
    }

    /// The id of a symbolic variable.
    pub fn id(&self) -> Option<SymbolicId> {
        match self {
            Var::Symbolic(symbolic) => Some(symbolic.id()),
            Var::Concrete(_) => None,
        }
    }

    pub fn is_symbolic(&self) -> bool {
        matches!(self, Var::Symbolic(_))
    }
}

impl<T> Clone for Var<T> {
    fn clone(&self) -> Self {
        match self {
            Var::Symbolic(symbolic) => Var::Symbolic(*symbolic),
            Var::Concrete(concrete) => Var::Concrete(concrete.clone()),
        }
    }
}

impl<T> From<Symbolic<T>> for Var<T> {
    fn from(symbolic: Symbolic<T>) -> Self {
        Var::Symbolic(symbolic)
    }
}

impl<T> From<Concrete<T>> for Var<T> {
    fn from(concrete: Concrete<T>) -> Self {
        Var::Concrete(concrete)
    }
}

impl<T: PartialEq> PartialEq for Var<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Var::Symbolic(a), Var::Symbolic(b)) => a == b,
            (Var::Concrete(a), Var::Concrete(b)) => a == b,
            _ => false,
        }
    }
}

impl<T: Eq> Eq for Var<T> {}

impl<T: Hash> Hash for Var<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Var::Symbolic(symbolic) => {
                0u8.hash(state);
                symbolic.hash(state);
            }
            Var::Concrete(concrete) => {
                1u8.hash(state);
                concrete.hash(state);
            }
        }
    }
}

impl<T: Ord> PartialOrd for Var<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Symbolic variables sort before concrete ones.
impl<T: Ord> Ord for Var<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Var::Symbolic(a), Var::Symbolic(b)) => a.cmp(b),
            (Var::Concrete(a), Var::Concrete(b)) => a.value().cmp(b.value()),
            (Var::Symbolic(_), Var::Concrete(_)) => Ordering::Less,
            (Var::Concrete(_), Var::Symbolic(_)) => Ordering::Greater,
        }
    }
}

impl<T: Debug> Debug for Var<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Var::Symbolic(symbolic) => Debug::fmt(symbolic, f),
            Var::Concrete(concrete) => Debug::fmt(concrete, f),
        }
    }
}

impl<T: Display> Display for Var<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Var::Symbolic(sym) => write!(f, "{sym}"),
            Var::Concrete(con) => write!(f, "{con}"),
        }
    }
}
