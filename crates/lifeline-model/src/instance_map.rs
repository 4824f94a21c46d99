//! Ordered lifetimes of a single object id.
//!
//! [`TimeToObjectInstanceMap`] owns every [`ObjectInstance`] created for one
//! id and decides which lifetime an incoming event belongs to. Missing
//! creation and deletion events are inferred instead of rejected, so traces
//! whose recording started after an object was created (or ended before it
//! was deleted) still index cleanly.
//!
//! # Invariants
//!
//! - Lifetimes are ordered by `creation_ts` and pairwise non-overlapping:
//!   each one ends at or before the next one begins.
//! - Only the last lifetime may be open.

use lifeline_types::{Args, ObjectId, Timestamp};
use tracing::debug;

use crate::error::{ModelError, ModelResult};
use crate::instance::{Creation, InstanceRef, InstanceSeed, ObjectInstance, Snapshot};

/// Source of new lifetimes for a [`TimeToObjectInstanceMap`].
///
/// The collection implements this to attach registered behavior and to
/// index each new instance by type name.
pub trait InstanceFactory {
    fn create_instance(&mut self, seed: InstanceSeed) -> ObjectInstance;
}

/// All lifetimes ever observed for one id, in creation order.
#[derive(Debug)]
pub struct TimeToObjectInstanceMap {
    id: ObjectId,
    slot: usize,
    instances: Vec<ObjectInstance>,
}

impl TimeToObjectInstanceMap {
    /// Create an empty map for `id`. `slot` is the id's registration position
    /// in the owning collection and becomes part of every instance handle.
    pub fn new(id: ObjectId, slot: usize) -> Self {
        Self {
            id,
            slot,
            instances: Vec::new(),
        }
    }

    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    /// Registration position of the id in the owning collection.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Every lifetime, in creation order.
    pub fn instances(&self) -> &[ObjectInstance] {
        &self.instances
    }

    /// Number of lifetimes recorded for the id.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// The most recently created lifetime.
    pub fn last_instance(&self) -> Option<&ObjectInstance> {
        self.instances.last()
    }

    /// The last lifetime, if it is still open.
    pub fn open_instance(&self) -> Option<&ObjectInstance> {
        self.instances.last().filter(|inst| inst.is_open())
    }

    /// Lifetime at `index` in creation order.
    pub fn get(&self, index: usize) -> Option<&ObjectInstance> {
        self.instances.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut ObjectInstance> {
        self.instances.get_mut(index)
    }

    // ---------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------

    /// Record an explicit creation at `ts`.
    ///
    /// A creation at the open lifetime's own `creation_ts` is a duplicate and
    /// returns that lifetime unchanged. A creation at any later time closes
    /// the open lifetime implicitly before starting the new one.
    pub fn id_was_created(
        &mut self,
        factory: &mut dyn InstanceFactory,
        category: &str,
        name: &str,
        ts: Timestamp,
    ) -> ModelResult<&ObjectInstance> {
        if let Some(last) = self.instances.last() {
            let created = last.creation_ts();
            match last.deletion_ts() {
                None if ts == created => {
                    last.ensure_identity(category, name)?;
                    debug!(id = %self.id, %ts, "duplicate creation ignored");
                    let last_index = self.instances.len() - 1;
                    return Ok(&self.instances[last_index]);
                }
                None if ts < created => {
                    return Err(self.out_of_order(
                        ts,
                        format!("creation precedes the open lifetime created at {created}"),
                    ));
                }
                None => {
                    self.close_open_implicitly(ts)?;
                    debug!(id = %self.id, %ts, "re-creation implicitly closed the open lifetime");
                }
                Some(deleted_at) if ts < deleted_at => {
                    return Err(self.out_of_order(
                        ts,
                        format!("creation precedes the previous lifetime's deletion at {deleted_at}"),
                    ));
                }
                Some(_) => {}
            }
        }

        let instance = self.spawn(factory, category, name, ts, Creation::Explicit);
        Ok(&*instance)
    }

    /// Record a snapshot at `ts`, resolving or inferring its lifetime.
    ///
    /// Resolution order:
    /// 1. the open lifetime, when `ts` is at or after its creation;
    /// 2. a new implicit lifetime, when `ts` is at or after the end of the
    ///    last lifetime (or the id has none yet);
    /// 3. an earlier lifetime whose interval contains `ts`.
    ///
    /// Anything else is out of order. Category and name are checked before
    /// the lifetime is touched, so a rejected event leaves the map unchanged.
    pub fn add_snapshot(
        &mut self,
        factory: &mut dyn InstanceFactory,
        category: &str,
        name: &str,
        ts: Timestamp,
        args: Args,
    ) -> ModelResult<&Snapshot> {
        let index = self.resolve_for_snapshot(factory, category, name, ts)?;
        self.instances[index].add_snapshot(ts, args)
    }

    fn resolve_for_snapshot(
        &mut self,
        factory: &mut dyn InstanceFactory,
        category: &str,
        name: &str,
        ts: Timestamp,
    ) -> ModelResult<usize> {
        let Some(last) = self.instances.last() else {
            debug!(id = %self.id, %ts, "snapshot implicitly created the first lifetime");
            self.spawn(factory, category, name, ts, Creation::Implicit);
            return Ok(0);
        };

        match last.deletion_ts() {
            None if ts >= last.creation_ts() => {
                last.ensure_identity(category, name)?;
                return Ok(self.instances.len() - 1);
            }
            Some(deleted_at) if ts >= deleted_at => {
                debug!(id = %self.id, %ts, "snapshot implicitly created a new lifetime");
                self.spawn(factory, category, name, ts, Creation::Implicit);
                return Ok(self.instances.len() - 1);
            }
            _ => {}
        }

        match self.position_at(ts) {
            Some(index) => {
                self.instances[index].ensure_identity(category, name)?;
                Ok(index)
            }
            None => Err(self.out_of_order(ts, "no lifetime accepts a snapshot at this time".into())),
        }
    }

    /// Record an explicit deletion at `ts`.
    ///
    /// Closes the open lifetime. With no open lifetime, the object is taken
    /// to have existed before recording began: a lifetime is created at `ts`
    /// and closed immediately. Repeating the last deletion is a no-op and
    /// returns `None`.
    pub fn id_was_deleted(
        &mut self,
        factory: &mut dyn InstanceFactory,
        category: &str,
        name: &str,
        ts: Timestamp,
    ) -> ModelResult<Option<&ObjectInstance>> {
        if let Some(last_index) = self.instances.len().checked_sub(1) {
            let last = &mut self.instances[last_index];
            match last.deletion_ts() {
                None => {
                    last.ensure_identity(category, name)?;
                    last.mark_deleted(ts)?;
                    return Ok(Some(&self.instances[last_index]));
                }
                Some(deleted_at) if ts == deleted_at => {
                    debug!(id = %self.id, %ts, "repeated deletion ignored");
                    return Ok(None);
                }
                Some(deleted_at) if ts < deleted_at => {
                    return Err(ModelError::AlreadyDeleted {
                        id: self.id.clone(),
                        deleted_at,
                        ts,
                    });
                }
                Some(_) => {}
            }
        }

        debug!(id = %self.id, %ts, "deletion without a live lifetime; inferring one");
        let instance = self.spawn(factory, category, name, ts, Creation::Implicit);
        instance.mark_deleted(ts)?;
        Ok(Some(&*instance))
    }

    /// Close the open lifetime at `ts` without a recorded deletion.
    ///
    /// Returns `false` when there was nothing open.
    pub fn close_open_implicitly(&mut self, ts: Timestamp) -> ModelResult<bool> {
        match self.instances.last_mut() {
            Some(last) if last.is_open() => {
                last.close_implicitly(ts)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    /// The lifetime whose `[creation_ts, deletion_ts)` contains `ts`.
    pub fn get_instance_at(&self, ts: Timestamp) -> Option<&ObjectInstance> {
        self.position_at(ts).map(|index| &self.instances[index])
    }

    fn position_at(&self, ts: Timestamp) -> Option<usize> {
        // Last lifetime created at or before `ts`; a zero-length lifetime
        // sharing its creation time with a later one is skipped this way.
        let after = self.instances.partition_point(|inst| inst.creation_ts() <= ts);
        let index = after.checked_sub(1)?;
        self.instances[index].covers(ts).then_some(index)
    }

    fn spawn(
        &mut self,
        factory: &mut dyn InstanceFactory,
        category: &str,
        name: &str,
        ts: Timestamp,
        creation: Creation,
    ) -> &mut ObjectInstance {
        let seed = InstanceSeed {
            id: self.id.clone(),
            handle: InstanceRef {
                slot: self.slot,
                index: self.instances.len(),
            },
            category: category.to_string(),
            name: name.to_string(),
            creation_ts: ts,
            creation,
        };
        self.instances.push(factory.create_instance(seed));
        let last = self.instances.len() - 1;
        &mut self.instances[last]
    }

    fn out_of_order(&self, ts: Timestamp, reason: String) -> ModelError {
        ModelError::OutOfOrder {
            id: self.id.clone(),
            ts,
            reason,
        }
    }
}
