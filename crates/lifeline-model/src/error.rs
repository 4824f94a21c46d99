//! Error types for lifecycle ingestion and finalization.

use lifeline_types::{ObjectId, Timestamp};

use crate::collection::InitPhase;

/// Errors produced by lifecycle ingestion and finalization.
///
/// Every variant aborts only the call that raised it; other ids in the
/// collection stay valid and queryable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// An event carries a category different from the one its lifetime began with.
    #[error("object {id}: event has cat={actual} but the lifetime was created with cat={expected}")]
    CategoryMismatch {
        /// The object the event refers to.
        id: ObjectId,
        /// Category the lifetime was created with.
        expected: String,
        /// Category carried by the event.
        actual: String,
    },

    /// An event carries a name different from the one its lifetime began with.
    #[error("object {id}: event has name={actual} but the lifetime was created with name={expected}")]
    NameMismatch {
        /// The object the event refers to.
        id: ObjectId,
        /// Name the lifetime was created with.
        expected: String,
        /// Name carried by the event.
        actual: String,
    },

    /// An event violates the temporal order of its lifetime.
    #[error("object {id}: event at {ts} is out of order: {reason}")]
    OutOfOrder {
        /// The object the event refers to.
        id: ObjectId,
        /// Timestamp of the rejected event.
        ts: Timestamp,
        /// Which ordering rule the event broke.
        reason: String,
    },

    /// A deletion targets a lifetime that is already closed.
    #[error("object {id}: already deleted at {deleted_at}, cannot delete at {ts}")]
    AlreadyDeleted {
        /// The object the deletion refers to.
        id: ObjectId,
        /// When the lifetime was closed.
        deleted_at: Timestamp,
        /// Timestamp of the rejected deletion.
        ts: Timestamp,
    },

    /// A batch pass was invoked outside its place in the finalization order.
    #[error("initialization pass requires phase {expected}, collection is in phase {actual}")]
    PhaseOrder {
        /// Phase the pass must start from.
        expected: InitPhase,
        /// Phase the collection was in.
        actual: InitPhase,
    },

    /// A type-specific behavior hook rejected its instance.
    #[error("object {id}: behavior hook failed: {reason}")]
    Behavior {
        /// The instance whose hook failed.
        id: ObjectId,
        /// Message supplied by the hook.
        reason: String,
    },
}

/// Convenience alias for model results.
pub type ModelResult<T> = Result<T, ModelError>;
