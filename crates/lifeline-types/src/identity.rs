use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Key naming an object slot within one trace.
///
/// Trace producers emit either numeric ids or string ids (usually pointer
/// values such as `"0x7f3a10"`). An id is *not* unique over the whole trace:
/// once an object is deleted, its id may be handed to a new object. Pairing
/// an id with a timestamp is what identifies a single lifetime.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObjectId {
    /// Integer id.
    Numeric(u64),
    /// Free-form string id.
    Named(String),
}

impl ObjectId {
    /// Returns `true` for numeric ids.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Numeric(_))
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "ObjectId({n})"),
            Self::Named(s) => write!(f, "ObjectId({s:?})"),
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Named(s) => write!(f, "{s}"),
        }
    }
}

/// Parses decimal digits as a numeric id and anything else as a named id.
impl FromStr for ObjectId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TypeError::EmptyObjectId);
        }
        match s.parse::<u64>() {
            Ok(n) => Ok(Self::Numeric(n)),
            Err(_) => Ok(Self::Named(s.to_string())),
        }
    }
}

impl From<u64> for ObjectId {
    fn from(n: u64) -> Self {
        Self::Numeric(n)
    }
}

impl From<&str> for ObjectId {
    fn from(s: &str) -> Self {
        Self::Named(s.to_string())
    }
}

impl From<String> for ObjectId {
    fn from(s: String) -> Self {
        Self::Named(s)
    }
}
