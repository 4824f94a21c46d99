//! One lifetime of an object id and the snapshots recorded during it.

use lifeline_types::{Args, ObjectId, TimeRange, Timestamp};
use serde::{Deserialize, Serialize};

use crate::behavior::ObjectBehavior;
use crate::error::{ModelError, ModelResult};

/// Stable handle to an instance inside an [`ObjectCollection`].
///
/// `slot` is the registration position of the instance's id and `index` its
/// position within that id's lifetimes. Instances are never removed, so a
/// handle stays valid for the life of the collection.
///
/// [`ObjectCollection`]: crate::ObjectCollection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceRef {
    /// Registration position of the id in the collection.
    pub slot: usize,
    /// Position of the lifetime among the id's lifetimes.
    pub index: usize,
}

/// How a lifetime came to start.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Creation {
    /// A creation event was recorded.
    Explicit,
    /// Inferred from a snapshot or deletion with no preceding creation.
    Implicit,
}

/// How (and whether) a lifetime ended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Deletion {
    /// Still alive.
    #[default]
    Open,
    /// A deletion event was recorded at this time.
    Explicit(Timestamp),
    /// Closed without a deletion event: superseded by a re-creation, or
    /// still alive when recording ended.
    Implicit(Timestamp),
}

impl Deletion {
    pub fn ts(&self) -> Option<Timestamp> {
        match self {
            Self::Open => None,
            Self::Explicit(ts) | Self::Implicit(ts) => Some(*ts),
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    pub fn was_explicit(&self) -> bool {
        matches!(self, Self::Explicit(_))
    }

    fn shifted(self, amount: f64) -> Self {
        match self {
            Self::Open => Self::Open,
            Self::Explicit(ts) => Self::Explicit(ts.shifted(amount)),
            Self::Implicit(ts) => Self::Implicit(ts.shifted(amount)),
        }
    }
}

/// Identity of a lifetime about to be created, handed to behavior factories.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstanceSeed {
    pub id: ObjectId,
    pub handle: InstanceRef,
    pub category: String,
    pub name: String,
    pub creation_ts: Timestamp,
    pub creation: Creation,
}

/// Immutable capture of an object's state at one point in its lifetime.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    ts: Timestamp,
    args: Args,
    instance: InstanceRef,
}

impl Snapshot {
    pub fn ts(&self) -> Timestamp {
        self.ts
    }

    pub fn args(&self) -> &Args {
        &self.args
    }

    /// Handle of the owning lifetime; resolve it with
    /// [`ObjectCollection::instance`](crate::ObjectCollection::instance).
    pub fn instance(&self) -> InstanceRef {
        self.instance
    }
}

/// One lifetime `[creation_ts, deletion_ts)` of an object id.
///
/// # Invariants
///
/// - `category` and `name` never change after construction.
/// - Snapshot timestamps strictly increase and lie within
///   `creation_ts..=deletion_ts` (or after `creation_ts` while open).
/// - Once closed, a lifetime is never reopened.
#[derive(Debug)]
pub struct ObjectInstance {
    id: ObjectId,
    handle: InstanceRef,
    category: String,
    name: String,
    creation_ts: Timestamp,
    creation: Creation,
    deletion: Deletion,
    snapshots: Vec<Snapshot>,
    bounds: TimeRange,
    // Detached only while one of its own initialization hooks runs.
    behavior: Option<Box<dyn ObjectBehavior>>,
}

impl ObjectInstance {
    /// Create an open lifetime with no snapshots.
    pub fn new(seed: InstanceSeed, behavior: Box<dyn ObjectBehavior>) -> Self {
        Self {
            id: seed.id,
            handle: seed.handle,
            category: seed.category,
            name: seed.name,
            creation_ts: seed.creation_ts,
            creation: seed.creation,
            deletion: Deletion::Open,
            snapshots: Vec::new(),
            bounds: TimeRange::empty(),
            behavior: Some(behavior),
        }
    }

    /// The id this lifetime belongs to.
    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    /// Handle resolving back to this instance through the collection.
    pub fn handle(&self) -> InstanceRef {
        self.handle
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Object name; selects the behavior.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key under which the collection indexes this instance.
    pub fn type_name(&self) -> &str {
        &self.name
    }

    pub fn creation_ts(&self) -> Timestamp {
        self.creation_ts
    }

    /// `false` when the lifetime was inferred from a snapshot or deletion.
    pub fn creation_ts_was_explicit(&self) -> bool {
        self.creation == Creation::Explicit
    }

    pub fn deletion(&self) -> Deletion {
        self.deletion
    }

    /// `None` while the lifetime is open.
    pub fn deletion_ts(&self) -> Option<Timestamp> {
        self.deletion.ts()
    }

    /// `true` only when a deletion event closed the lifetime.
    pub fn deletion_ts_was_explicit(&self) -> bool {
        self.deletion.was_explicit()
    }

    pub fn is_open(&self) -> bool {
        self.deletion.is_open()
    }

    /// Snapshots in timestamp order.
    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn last_snapshot(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }

    /// Range computed by the last [`update_bounds`](Self::update_bounds).
    pub fn bounds(&self) -> TimeRange {
        self.bounds
    }

    /// The type-specific behavior selected at construction.
    pub fn behavior(&self) -> Option<&dyn ObjectBehavior> {
        self.behavior.as_deref()
    }

    /// Whether `ts` falls in the half-open interval `[creation_ts, deletion_ts)`.
    pub fn covers(&self, ts: Timestamp) -> bool {
        ts >= self.creation_ts && self.deletion_ts().map_or(true, |deleted| ts < deleted)
    }

    /// Check that an event's category and name match this lifetime.
    pub fn ensure_identity(&self, category: &str, name: &str) -> ModelResult<()> {
        if self.category != category {
            return Err(ModelError::CategoryMismatch {
                id: self.id.clone(),
                expected: self.category.clone(),
                actual: category.to_string(),
            });
        }
        if self.name != name {
            return Err(ModelError::NameMismatch {
                id: self.id.clone(),
                expected: self.name.clone(),
                actual: name.to_string(),
            });
        }
        Ok(())
    }

    /// Append a snapshot at `ts`.
    pub fn add_snapshot(&mut self, ts: Timestamp, args: Args) -> ModelResult<&Snapshot> {
        if ts < self.creation_ts {
            return Err(self.out_of_order(
                ts,
                format!("snapshot precedes creation at {}", self.creation_ts),
            ));
        }
        if let Some(deleted) = self.deletion_ts() {
            if ts > deleted {
                return Err(self.out_of_order(
                    ts,
                    format!("snapshot follows deletion at {deleted}"),
                ));
            }
        }
        if let Some(last) = self.snapshots.last() {
            if ts <= last.ts {
                return Err(self.out_of_order(
                    ts,
                    format!("snapshot does not follow the previous snapshot at {}", last.ts),
                ));
            }
        }

        self.snapshots.push(Snapshot {
            ts,
            args,
            instance: self.handle,
        });
        let last = self.snapshots.len() - 1;
        Ok(&self.snapshots[last])
    }

    /// Close the lifetime at `ts` because a deletion event was recorded.
    pub fn mark_deleted(&mut self, ts: Timestamp) -> ModelResult<()> {
        self.close(Deletion::Explicit(ts))
    }

    /// Close the lifetime at `ts` without a recorded deletion.
    pub fn close_implicitly(&mut self, ts: Timestamp) -> ModelResult<()> {
        self.close(Deletion::Implicit(ts))
    }

    /// Check that the lifetime could be closed at `ts` without closing it.
    pub fn check_close(&self, ts: Timestamp) -> ModelResult<()> {
        if let Some(deleted_at) = self.deletion_ts() {
            return Err(ModelError::AlreadyDeleted {
                id: self.id.clone(),
                deleted_at,
                ts,
            });
        }
        if ts < self.creation_ts {
            return Err(self.out_of_order(
                ts,
                format!("deletion precedes creation at {}", self.creation_ts),
            ));
        }
        if let Some(last) = self.last_snapshot() {
            if ts < last.ts {
                return Err(self.out_of_order(
                    ts,
                    format!("deletion precedes the snapshot at {}", last.ts),
                ));
            }
        }
        Ok(())
    }

    fn close(&mut self, deletion: Deletion) -> ModelResult<()> {
        let Some(ts) = deletion.ts() else {
            return Ok(());
        };
        self.check_close(ts)?;
        self.deletion = deletion;
        Ok(())
    }

    /// Latest snapshot taken at or before `ts`.
    pub fn get_snapshot_at(&self, ts: Timestamp) -> Option<&Snapshot> {
        let after = self.snapshots.partition_point(|s| s.ts <= ts);
        after.checked_sub(1).map(|i| &self.snapshots[i])
    }

    /// Recompute [`bounds`](Self::bounds) from creation, deletion, and snapshots.
    pub fn update_bounds(&mut self) {
        self.bounds.reset();
        self.bounds.add_value(self.creation_ts);
        if let Some(deleted) = self.deletion_ts() {
            self.bounds.add_value(deleted);
        }
        if let Some(last) = self.snapshots.last() {
            self.bounds.add_value(last.ts);
        }
        if let Some(behavior) = &self.behavior {
            behavior.extend_bounds(&mut self.bounds);
        }
    }

    /// Move every timestamp of this lifetime forward by `amount`.
    pub fn shift_timestamps_forward(&mut self, amount: f64) {
        self.creation_ts = self.creation_ts.shifted(amount);
        self.deletion = self.deletion.shifted(amount);
        for snapshot in &mut self.snapshots {
            snapshot.ts = snapshot.ts.shifted(amount);
        }
        self.bounds.shift(amount);
        if let Some(behavior) = &mut self.behavior {
            behavior.shift_timestamps_forward(amount);
        }
    }

    pub(crate) fn take_behavior(&mut self) -> Option<Box<dyn ObjectBehavior>> {
        self.behavior.take()
    }

    pub(crate) fn restore_behavior(&mut self, behavior: Box<dyn ObjectBehavior>) {
        self.behavior = Some(behavior);
    }

    fn out_of_order(&self, ts: Timestamp, reason: String) -> ModelError {
        ModelError::OutOfOrder {
            id: self.id.clone(),
            ts,
            reason,
        }
    }
}
