//! Object lifecycle index for Lifeline.
//!
//! Trace drivers feed this crate creation, snapshot, and deletion events for
//! objects keyed by reusable ids. It provides:
//! - `ObjectInstance` lifetimes with time-ordered `Snapshot`s
//! - `TimeToObjectInstanceMap`, the per-id sequence of non-overlapping lifetimes
//! - `ObjectCollection`, the registry of all ids with point-in-time queries
//! - `TypeRegistry` / `ObjectBehavior` for name-specific post-processing
//! - Two-phase initialization, auto-deletion, bounds, and time shifting

pub mod behavior;
pub mod collection;
pub mod config;
pub mod error;
pub mod event;
pub mod instance;
pub mod instance_map;

pub use behavior::{BehaviorFactory, GenericObject, ObjectBehavior, TypeRegistry};
pub use collection::{InitPhase, ObjectCollection, ObjectEvent};
pub use config::{FinalizeConfig, FinalizeReport};
pub use error::{ModelError, ModelResult};
pub use event::LifecycleEvent;
pub use instance::{Creation, Deletion, InstanceRef, InstanceSeed, ObjectInstance, Snapshot};
pub use instance_map::{InstanceFactory, TimeToObjectInstanceMap};
