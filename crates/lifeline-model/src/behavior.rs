//! Type-specific behavior selected by object name.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use lifeline_types::TimeRange;

use crate::collection::ObjectCollection;
use crate::error::ModelResult;
use crate::instance::{InstanceSeed, ObjectInstance};

/// Post-processing attached to each lifetime according to its name.
///
/// Hooks run only after ingestion is complete. All `pre_initialize` calls
/// for the whole collection finish before the first `initialize` call, so
/// `initialize` may rely on every other instance having run phase one.
///
/// While a hook runs, the collection lends it read access to every instance.
/// The hook's own instance is visible too, but with its behavior detached.
pub trait ObjectBehavior: fmt::Debug + Send + Sync {
    /// Short label of the behavior variant.
    fn kind(&self) -> &str {
        "generic"
    }

    /// First initialization phase.
    fn pre_initialize(
        &mut self,
        _instance: &ObjectInstance,
        _objects: &ObjectCollection,
    ) -> ModelResult<()> {
        Ok(())
    }

    /// Second initialization phase.
    fn initialize(
        &mut self,
        _instance: &ObjectInstance,
        _objects: &ObjectCollection,
    ) -> ModelResult<()> {
        Ok(())
    }

    /// Widen the instance's bounds beyond its own timestamps.
    fn extend_bounds(&self, _bounds: &mut TimeRange) {}

    /// Shift any timestamps the behavior derived during initialization.
    fn shift_timestamps_forward(&mut self, _amount: f64) {}
}

/// Behavior used for names with no registered factory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GenericObject;

impl ObjectBehavior for GenericObject {}

fn generic_behavior(_seed: &InstanceSeed) -> Box<dyn ObjectBehavior> {
    Box::new(GenericObject)
}

/// Builds the behavior for a new lifetime.
pub type BehaviorFactory = Arc<dyn Fn(&InstanceSeed) -> Box<dyn ObjectBehavior> + Send + Sync>;

/// Name-keyed table of behavior factories.
///
/// The registry is configuration: it is built by the embedding application
/// and handed to [`ObjectCollection::new`]. Names without an entry resolve to
/// the fallback factory, which defaults to [`GenericObject`].
#[derive(Clone)]
pub struct TypeRegistry {
    factories: HashMap<String, BehaviorFactory>,
    fallback: BehaviorFactory,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            fallback: Arc::new(generic_behavior),
        }
    }

    /// Register `factory` for `name`, returning the factory it replaces.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> Option<BehaviorFactory>
    where
        F: Fn(&InstanceSeed) -> Box<dyn ObjectBehavior> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory))
    }

    /// Builder form of [`register`](Self::register).
    pub fn with<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&InstanceSeed) -> Box<dyn ObjectBehavior> + Send + Sync + 'static,
    {
        self.register(name, factory);
        self
    }

    /// Replace the factory used for unregistered names.
    pub fn set_fallback<F>(&mut self, factory: F)
    where
        F: Fn(&InstanceSeed) -> Box<dyn ObjectBehavior> + Send + Sync + 'static,
    {
        self.fallback = Arc::new(factory);
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// The behavior a lifetime with this seed gets.
    pub fn behavior_for(&self, seed: &InstanceSeed) -> Box<dyn ObjectBehavior> {
        match self.factories.get(&seed.name) {
            Some(factory) => factory(seed),
            None => (self.fallback)(seed),
        }
    }

    /// Construct the instance for `seed` with its registered behavior.
    pub fn instantiate(&self, seed: InstanceSeed) -> ObjectInstance {
        let behavior = self.behavior_for(&seed);
        ObjectInstance::new(seed, behavior)
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("names", &self.names())
            .finish_non_exhaustive()
    }
}
