//! Numeric ranges that scale with the size parameter.

use crate::data::Size;

/// Size at which a linear range reaches its full bounds.
const MAX_SIZE: usize = 100;

/// How a range's bounds respond to the size parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    /// Bounds are fixed regardless of size.
    Constant,
    /// Bounds grow linearly from the origin, reaching their limits at size 100.
    Linear,
}

/// A range of values with an origin that shrinking moves towards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range<T> {
    lower: T,
    upper: T,
    origin: T,
    scale: Scale,
}

/// Values that can be scaled between an origin and a bound.
pub trait Scalable: Copy + PartialOrd {
    fn zero() -> Self;

    /// Move `percent` percent of the way from `origin` to `bound`.
    fn scale_towards(origin: Self, bound: Self, percent: usize) -> Self;
}

macro_rules! scalable_int {
    ($($t:ty),*) => {$(
        impl Scalable for $t {
            fn zero() -> Self {
                0
            }

            fn scale_towards(origin: Self, bound: Self, percent: usize) -> Self {
                let origin_wide = origin as i128;
                let diff = bound as i128 - origin_wide;
                (origin_wide + diff * percent as i128 / MAX_SIZE as i128) as $t
            }
        }
    )*};
}

scalable_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl Scalable for f64 {
    fn zero() -> Self {
        0.0
    }

    fn scale_towards(origin: Self, bound: Self, percent: usize) -> Self {
        origin + (bound - origin) * (percent as f64 / MAX_SIZE as f64)
    }
}

impl<T: Scalable> Range<T> {
    /// A linear range; the common default.
    pub fn new(lower: T, upper: T) -> Self {
        Self::linear(lower, upper)
    }

    /// A range whose bounds ignore the size parameter.
    pub fn constant(lower: T, upper: T) -> Self {
        Self::build(lower, upper, Scale::Constant)
    }

    /// A range whose bounds grow with the size parameter.
    pub fn linear(lower: T, upper: T) -> Self {
        Self::build(lower, upper, Scale::Linear)
    }

    /// A range containing exactly one value.
    pub fn singleton(value: T) -> Self {
        Self::build(value, value, Scale::Constant)
    }

    fn build(lower: T, upper: T, scale: Scale) -> Self {
        let (lower, upper) = if upper < lower {
            (upper, lower)
        } else {
            (lower, upper)
        };
        let zero = T::zero();
        let origin = if lower <= zero && zero <= upper {
            zero
        } else if lower > zero {
            lower
        } else {
            upper
        };
        Range {
            lower,
            upper,
            origin,
            scale,
        }
    }

    /// Move the origin, clamped into the bounds.
    pub fn with_origin(mut self, origin: T) -> Self {
        self.origin = if origin < self.lower {
            self.lower
        } else if origin > self.upper {
            self.upper
        } else {
            origin
        };
        self
    }

    pub fn lower(&self) -> T {
        self.lower
    }

    pub fn upper(&self) -> T {
        self.upper
    }

    pub fn origin(&self) -> T {
        self.origin
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    /// The bounds in effect at the given size.
    pub fn bounds(&self, size: Size) -> (T, T) {
        match self.scale {
            Scale::Constant => (self.lower, self.upper),
            Scale::Linear => {
                let percent = size.get().min(MAX_SIZE);
                (
                    T::scale_towards(self.origin, self.lower, percent),
                    T::scale_towards(self.origin, self.upper, percent),
                )
            }
        }
    }

    pub fn contains(&self, value: T) -> bool {
        self.lower <= value && value <= self.upper
    }
}
