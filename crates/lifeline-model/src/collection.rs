//! Registry of every object lifetime observed in one trace.
//!
//! [`ObjectCollection`] owns one [`TimeToObjectInstanceMap`] per id, indexes
//! instances by type name, and runs the post-ingestion passes:
//!
//! 1. [`auto_delete_objects`](ObjectCollection::auto_delete_objects)
//! 2. [`pre_initialize_all_objects`](ObjectCollection::pre_initialize_all_objects)
//! 3. [`initialize_all_objects`](ObjectCollection::initialize_all_objects)
//! 4. [`update_bounds`](ObjectCollection::update_bounds)
//!
//! [`finalize`](ObjectCollection::finalize) runs them in that order.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use lifeline_types::{Args, ObjectId, TimeRange, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::behavior::{ObjectBehavior, TypeRegistry};
use crate::config::{FinalizeConfig, FinalizeReport};
use crate::error::{ModelError, ModelResult};
use crate::event::LifecycleEvent;
use crate::instance::{InstanceRef, InstanceSeed, ObjectInstance, Snapshot};
use crate::instance_map::{InstanceFactory, TimeToObjectInstanceMap};

/// Progress of the two-phase initialization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InitPhase {
    /// Events are being ingested; no hooks have run.
    Ingesting,
    /// Every instance has run `pre_initialize`.
    PreInitialized,
    /// Every instance has run `initialize`.
    Initialized,
}

impl fmt::Display for InitPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ingesting => "ingesting",
            Self::PreInitialized => "pre-initialized",
            Self::Initialized => "initialized",
        };
        write!(f, "{s}")
    }
}

/// Item visited by [`ObjectCollection::iterate_all_events`].
#[derive(Clone, Copy, Debug)]
pub enum ObjectEvent<'a> {
    Instance(&'a ObjectInstance),
    Snapshot(&'a Snapshot),
}

type Hook = fn(&mut dyn ObjectBehavior, &ObjectInstance, &ObjectCollection) -> ModelResult<()>;

/// All object lifetimes and snapshots of one trace, by id and by type name.
#[derive(Debug)]
pub struct ObjectCollection {
    registry: TypeRegistry,
    /// Per-id maps in registration order; a map's position is its slot.
    maps: Vec<TimeToObjectInstanceMap>,
    slots: HashMap<ObjectId, usize>,
    instances_by_type_name: HashMap<String, Vec<InstanceRef>>,
    bounds: TimeRange,
    latest_ts: Option<Timestamp>,
    phase: InitPhase,
}

/// Factory handed to the per-id maps: attaches behavior and records the
/// new instance in the type-name index.
struct Catalog<'a> {
    registry: &'a TypeRegistry,
    instances_by_type_name: &'a mut HashMap<String, Vec<InstanceRef>>,
}

impl InstanceFactory for Catalog<'_> {
    fn create_instance(&mut self, seed: InstanceSeed) -> ObjectInstance {
        let handle = seed.handle;
        let instance = self.registry.instantiate(seed);
        self.instances_by_type_name
            .entry(instance.type_name().to_string())
            .or_default()
            .push(handle);
        instance
    }
}

impl ObjectCollection {
    pub fn new(registry: TypeRegistry) -> Self {
        Self {
            registry,
            maps: Vec::new(),
            slots: HashMap::new(),
            instances_by_type_name: HashMap::new(),
            bounds: TimeRange::empty(),
            latest_ts: None,
            phase: InitPhase::Ingesting,
        }
    }

    pub fn phase(&self) -> InitPhase {
        self.phase
    }

    /// Number of distinct ids.
    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    pub fn instance_count(&self) -> usize {
        self.maps.iter().map(TimeToObjectInstanceMap::len).sum()
    }

    pub fn snapshot_count(&self) -> usize {
        self.iter_object_instances()
            .map(|inst| inst.snapshots().len())
            .sum()
    }

    /// Ids in the order their first event arrived.
    pub fn ids(&self) -> impl Iterator<Item = &ObjectId> + '_ {
        self.maps.iter().map(TimeToObjectInstanceMap::id)
    }

    pub fn instance_map(&self, id: &ObjectId) -> Option<&TimeToObjectInstanceMap> {
        self.slots.get(id).map(|&slot| &self.maps[slot])
    }

    /// Resolve a handle, e.g. a snapshot's back-reference.
    pub fn instance(&self, handle: InstanceRef) -> Option<&ObjectInstance> {
        self.maps.get(handle.slot)?.get(handle.index)
    }

    fn instance_mut(&mut self, handle: InstanceRef) -> Option<&mut ObjectInstance> {
        self.maps.get_mut(handle.slot)?.get_mut(handle.index)
    }

    /// Largest timestamp of any accepted event.
    pub fn latest_timestamp(&self) -> Option<Timestamp> {
        self.latest_ts
    }

    // ---------------------------------------------------------------
    // Ingestion
    // ---------------------------------------------------------------

    /// Record an explicit creation of `id`.
    pub fn id_was_created(
        &mut self,
        id: &ObjectId,
        category: &str,
        name: &str,
        ts: Timestamp,
    ) -> ModelResult<&ObjectInstance> {
        let (map, mut catalog, latest) = self.ingestion_target(id);
        let instance = map.id_was_created(&mut catalog, category, name, ts)?;
        observe(latest, ts);
        Ok(instance)
    }

    /// Record a snapshot of `id`.
    ///
    /// Fails with [`ModelError::CategoryMismatch`] or
    /// [`ModelError::NameMismatch`] when the lifetime the snapshot resolves
    /// to was created with a different category or name; the snapshot is
    /// not recorded in that case.
    pub fn add_snapshot(
        &mut self,
        id: &ObjectId,
        category: &str,
        name: &str,
        ts: Timestamp,
        args: Args,
    ) -> ModelResult<&Snapshot> {
        let (map, mut catalog, latest) = self.ingestion_target(id);
        let snapshot = map.add_snapshot(&mut catalog, category, name, ts, args)?;
        observe(latest, ts);
        Ok(snapshot)
    }

    /// Record an explicit deletion of `id`.
    ///
    /// Returns the lifetime that was closed, or `None` when the deletion
    /// repeated one already recorded. Category and name are checked like
    /// [`add_snapshot`](Self::add_snapshot).
    pub fn id_was_deleted(
        &mut self,
        id: &ObjectId,
        category: &str,
        name: &str,
        ts: Timestamp,
    ) -> ModelResult<Option<&ObjectInstance>> {
        let (map, mut catalog, latest) = self.ingestion_target(id);
        let closed = map.id_was_deleted(&mut catalog, category, name, ts)?;
        observe(latest, ts);
        Ok(closed)
    }

    /// Route one driver event to the matching ingestion call.
    pub fn apply(&mut self, event: &LifecycleEvent) -> ModelResult<()> {
        match event {
            LifecycleEvent::Created {
                id,
                category,
                name,
                ts,
            } => self.id_was_created(id, category, name, *ts).map(|_| ()),
            LifecycleEvent::Snapshot {
                id,
                category,
                name,
                ts,
                args,
            } => self
                .add_snapshot(id, category, name, *ts, args.clone())
                .map(|_| ()),
            LifecycleEvent::Deleted {
                id,
                category,
                name,
                ts,
            } => self.id_was_deleted(id, category, name, *ts).map(|_| ()),
        }
    }

    fn ingestion_target(
        &mut self,
        id: &ObjectId,
    ) -> (&mut TimeToObjectInstanceMap, Catalog<'_>, &mut Option<Timestamp>) {
        let slot = match self.slots.get(id) {
            Some(&slot) => slot,
            None => {
                let slot = self.maps.len();
                self.maps.push(TimeToObjectInstanceMap::new(id.clone(), slot));
                self.slots.insert(id.clone(), slot);
                debug!(%id, slot, "registered object id");
                slot
            }
        };
        let catalog = Catalog {
            registry: &self.registry,
            instances_by_type_name: &mut self.instances_by_type_name,
        };
        (&mut self.maps[slot], catalog, &mut self.latest_ts)
    }

    // ---------------------------------------------------------------
    // Batch passes
    // ---------------------------------------------------------------

    /// Close every still-open lifetime at `max_ts` as an implicit deletion.
    ///
    /// Lifetimes that are already closed are left alone. Returns the number
    /// of lifetimes closed. Every open lifetime is checked first, so on error
    /// none of them has been closed.
    pub fn auto_delete_objects(&mut self, max_ts: Timestamp) -> ModelResult<usize> {
        for open in self.maps.iter().filter_map(TimeToObjectInstanceMap::open_instance) {
            open.check_close(max_ts)?;
        }
        let mut closed = 0;
        for map in &mut self.maps {
            if map.close_open_implicitly(max_ts)? {
                closed += 1;
            }
        }
        info!(closed, %max_ts, "auto-deleted open objects");
        Ok(closed)
    }

    /// Run phase one of initialization on every instance.
    pub fn pre_initialize_all_objects(&mut self) -> ModelResult<()> {
        self.expect_phase(InitPhase::Ingesting)?;
        self.run_hooks(|behavior, instance, objects| behavior.pre_initialize(instance, objects))?;
        self.phase = InitPhase::PreInitialized;
        info!(instances = self.instance_count(), "pre-initialized all objects");
        Ok(())
    }

    /// Run phase two of initialization on every instance.
    ///
    /// Requires [`pre_initialize_all_objects`](Self::pre_initialize_all_objects)
    /// to have completed.
    pub fn initialize_all_objects(&mut self) -> ModelResult<()> {
        self.expect_phase(InitPhase::PreInitialized)?;
        self.run_hooks(|behavior, instance, objects| behavior.initialize(instance, objects))?;
        self.phase = InitPhase::Initialized;
        info!(instances = self.instance_count(), "initialized all objects");
        Ok(())
    }

    fn expect_phase(&self, expected: InitPhase) -> ModelResult<()> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(ModelError::PhaseOrder {
                expected,
                actual: self.phase,
            })
        }
    }

    fn run_hooks(&mut self, hook: Hook) -> ModelResult<()> {
        let handles: Vec<InstanceRef> = self
            .iter_object_instances()
            .map(ObjectInstance::handle)
            .collect();

        for handle in handles {
            let Some(mut behavior) = self.instance_mut(handle).and_then(ObjectInstance::take_behavior)
            else {
                continue;
            };
            let result = match self.instance(handle) {
                Some(instance) => hook(behavior.as_mut(), instance, self),
                None => Ok(()),
            };
            if let Some(instance) = self.instance_mut(handle) {
                instance.restore_behavior(behavior);
            }
            result?;
        }
        Ok(())
    }

    /// Recompute every instance's bounds and their union.
    pub fn update_bounds(&mut self) {
        self.bounds.reset();
        for map in &mut self.maps {
            for index in 0..map.len() {
                if let Some(instance) = map.get_mut(index) {
                    instance.update_bounds();
                    self.bounds.add_range(&instance.bounds());
                }
            }
        }
    }

    /// Range computed by the last [`update_bounds`](Self::update_bounds).
    pub fn bounds(&self) -> TimeRange {
        self.bounds
    }

    /// Move every timestamp in the collection forward by `amount`.
    pub fn shift_timestamps_forward(&mut self, amount: f64) {
        for map in &mut self.maps {
            for index in 0..map.len() {
                if let Some(instance) = map.get_mut(index) {
                    instance.shift_timestamps_forward(amount);
                }
            }
        }
        self.bounds.shift(amount);
        self.latest_ts = self.latest_ts.map(|ts| ts.shifted(amount));
    }

    /// Run every post-ingestion pass in order.
    pub fn finalize(&mut self, config: &FinalizeConfig) -> ModelResult<FinalizeReport> {
        let mut report = FinalizeReport::default();

        if config.auto_delete {
            if let Some(end) = config.end_of_trace.or(self.latest_ts) {
                report.auto_deleted = self.auto_delete_objects(end)?;
            }
        }

        self.pre_initialize_all_objects()?;
        self.initialize_all_objects()?;
        self.update_bounds();

        let shift = if config.rebase_to_zero {
            self.bounds.min().map_or(0.0, |min| -min.as_ms())
        } else {
            config.shift_forward
        };
        if shift != 0.0 {
            self.shift_timestamps_forward(shift);
        }

        report.ids = self.len();
        report.instances = self.instance_count();
        report.snapshots = self.snapshot_count();
        report.shifted_by = shift;
        report.bounds = self.bounds;
        info!(
            ids = report.ids,
            instances = report.instances,
            snapshots = report.snapshots,
            "finalized object collection"
        );
        Ok(report)
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    /// The lifetime of `id` alive at `ts`.
    pub fn get_object_instance_at(&self, id: &ObjectId, ts: Timestamp) -> Option<&ObjectInstance> {
        self.instance_map(id)?.get_instance_at(ts)
    }

    /// The latest snapshot of `id` at or before `ts`, within the lifetime
    /// alive at `ts`.
    pub fn get_snapshot_at(&self, id: &ObjectId, ts: Timestamp) -> Option<&Snapshot> {
        self.get_object_instance_at(id, ts)?.get_snapshot_at(ts)
    }

    /// Every instance: ids in registration order, lifetimes in creation order.
    pub fn iter_object_instances(&self) -> impl Iterator<Item = &ObjectInstance> + '_ {
        self.maps.iter().flat_map(|map| map.instances().iter())
    }

    /// Callback form of [`iter_object_instances`](Self::iter_object_instances).
    pub fn for_each_object_instance(&self, visit: impl FnMut(&ObjectInstance)) {
        self.iter_object_instances().for_each(visit);
    }

    pub fn get_all_object_instances(&self) -> Vec<&ObjectInstance> {
        self.iter_object_instances().collect()
    }

    /// Instances named `name` in creation order; empty for unknown names.
    pub fn get_all_instances_named(&self, name: &str) -> Vec<&ObjectInstance> {
        self.instances_by_type_name
            .get(name)
            .map(|handles| self.resolve(handles))
            .unwrap_or_default()
    }

    pub fn get_all_instances_by_type_name(&self) -> BTreeMap<&str, Vec<&ObjectInstance>> {
        self.instances_by_type_name
            .iter()
            .map(|(name, handles)| (name.as_str(), self.resolve(handles)))
            .collect()
    }

    fn resolve(&self, handles: &[InstanceRef]) -> Vec<&ObjectInstance> {
        handles.iter().filter_map(|&h| self.instance(h)).collect()
    }

    /// Add the category of every instance to `dict`.
    pub fn add_categories_to_dict(&self, dict: &mut BTreeSet<String>) {
        for instance in self.iter_object_instances() {
            dict.insert(instance.category().to_string());
        }
    }

    /// Visit every instance followed by its snapshots.
    pub fn iterate_all_events(&self, mut callback: impl FnMut(ObjectEvent<'_>)) {
        for instance in self.iter_object_instances() {
            callback(ObjectEvent::Instance(instance));
            for snapshot in instance.snapshots() {
                callback(ObjectEvent::Snapshot(snapshot));
            }
        }
    }
}

fn observe(latest: &mut Option<Timestamp>, ts: Timestamp) {
    *latest = Some(latest.map_or(ts, |seen| seen.max(ts)));
}

impl Default for ObjectCollection {
    fn default() -> Self {
        Self::new(TypeRegistry::default())
    }
}
