//! Driver-facing lifecycle events.

use lifeline_types::{Args, ObjectId, Timestamp};
use serde::{Deserialize, Serialize};

/// One lifecycle event as delivered by a trace ingestion driver.
///
/// Serialized with an `"event"` tag:
///
/// ```json
/// {"event": "created", "id": 5, "category": "cc", "name": "Foo", "ts": 10.0}
/// {"event": "snapshot", "id": 5, "category": "cc", "name": "Foo", "ts": 15.0, "args": {"a": 1}}
/// {"event": "deleted", "id": 5, "category": "cc", "name": "Foo", "ts": 20.0}
/// ```
///
/// `cat` is accepted as an alias of `category`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    Created {
        id: ObjectId,
        #[serde(alias = "cat")]
        category: String,
        name: String,
        ts: Timestamp,
    },
    Snapshot {
        id: ObjectId,
        #[serde(alias = "cat")]
        category: String,
        name: String,
        ts: Timestamp,
        #[serde(default)]
        args: Args,
    },
    Deleted {
        id: ObjectId,
        #[serde(alias = "cat")]
        category: String,
        name: String,
        ts: Timestamp,
    },
}

impl LifecycleEvent {
    /// The object the event refers to.
    pub fn id(&self) -> &ObjectId {
        match self {
            Self::Created { id, .. } | Self::Snapshot { id, .. } | Self::Deleted { id, .. } => id,
        }
    }

    /// When the event happened.
    pub fn ts(&self) -> Timestamp {
        match self {
            Self::Created { ts, .. } | Self::Snapshot { ts, .. } | Self::Deleted { ts, .. } => *ts,
        }
    }

    /// The serialized tag of this event.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::Snapshot { .. } => "snapshot",
            Self::Deleted { .. } => "deleted",
        }
    }
}
