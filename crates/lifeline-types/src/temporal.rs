use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Trace time in milliseconds.
///
/// Trace clocks are fractional, so the value is an `f64`. Ordering and
/// equality use [`f64::total_cmp`], which makes `Timestamp` usable as a
/// sort key and in binary searches.
#[derive(Clone, Copy, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(f64);

impl Timestamp {
    /// The trace origin.
    pub const ZERO: Self = Self(0.0);

    /// Create a timestamp without validating the value.
    pub const fn from_ms(ms: f64) -> Self {
        Self(ms)
    }

    /// Create a timestamp, rejecting NaN and infinities.
    pub fn new(ms: f64) -> Result<Self, TypeError> {
        if ms.is_finite() {
            Ok(Self(ms))
        } else {
            Err(TypeError::NonFiniteTimestamp(ms.to_string()))
        }
    }

    /// Milliseconds since the trace origin.
    pub fn as_ms(self) -> f64 {
        self.0
    }

    /// This timestamp moved forward by `amount` milliseconds.
    ///
    /// A negative amount moves it backward.
    pub fn shifted(self, amount: f64) -> Self {
        Self(self.0 + amount)
    }

    /// Milliseconds elapsed from `earlier` to `self`.
    pub fn since(self, earlier: Self) -> f64 {
        self.0 - earlier.0
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Timestamp {}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

// total_cmp equality is bitwise equality, so hashing the bits is consistent.
impl Hash for Timestamp {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl From<f64> for Timestamp {
    fn from(ms: f64) -> Self {
        Self(ms)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({}ms)", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}
