//! Foundation types for Lifeline.
//!
//! This crate provides the identity, temporal, and range types shared by the
//! object lifecycle index and its drivers. Every other Lifeline crate depends
//! on `lifeline-types`.
//!
//! # Key Types
//!
//! - [`ObjectId`]: Reusable key naming an object slot in a trace
//! - [`Timestamp`]: Trace time in milliseconds, totally ordered
//! - [`TimeRange`]: Minimal range covering a set of timestamps
//! - [`Args`]: Opaque snapshot payload

pub mod error;
pub mod identity;
pub mod range;
pub mod temporal;

pub use error::TypeError;
pub use identity::ObjectId;
pub use range::TimeRange;
pub use temporal::Timestamp;

/// Opaque state payload carried by a snapshot.
pub type Args = serde_json::Value;
