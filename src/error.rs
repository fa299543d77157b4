//! Error types for the dataflow engine.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors raised by graph registration, scheduling, and execution.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    /// A resource name was re-registered with a different Rust type.
    #[error("resource `{name}` already registered with a different type")]
    TypeMismatch {
        /// Resource name.
        name: String,
    },

    /// A resource name was re-registered with different lifecycle flags.
    #[error("resource `{name}` already registered with different flags")]
    FlagMismatch {
        /// Resource name.
        name: String,
    },

    /// A second node attempted to register as the producer of a resource
    /// that already has one.
    #[error(
        "resource `{name}` already has producer `{existing_producer}`; `{attempted_producer}` cannot also produce it"
    )]
    ProducerConflict {
        /// Resource name.
        name: String,
        /// Name of the node already bound as producer.
        existing_producer: String,
        /// Name of the node that attempted to bind as a second producer.
        attempted_producer: String,
    },

    /// A handle's `get()` was called before the resource was made available.
    #[error("resource `{name}` was read before it was made available")]
    UnavailableRead {
        /// Resource name.
        name: String,
    },

    /// A node's body returned without making one of its declared outputs available.
    #[error("node `{node}` did not make resource `{resource}` available")]
    MissingProducer {
        /// Node name.
        node: String,
        /// Resource name.
        resource: String,
    },

    /// An `execute_once` node declared a produced resource that is not `permanent`.
    #[error("node `{node}` is execute_once but produces non-permanent resource `{resource}`")]
    OneshotWithResetable {
        /// Node name.
        node: String,
        /// Resource name.
        resource: String,
    },

    /// The initial sweep plus readiness propagation left nodes that were
    /// never scheduled; a cycle or an unmet external dependency is likely.
    #[error("graph stalled with {remaining} node(s) never scheduled; check for a cycle")]
    CycleDetected {
        /// Count of nodes that never became ready.
        remaining: usize,
    },

    /// A node's body panicked while executing.
    #[error("node `{node}` panicked: {message}")]
    NodePanicked {
        /// Node name.
        node: String,
        /// Panic payload, converted to a string when possible.
        message: String,
    },

    /// `get_resource` was called with a name that has no matching record.
    #[error("resource `{name}` not found in graph")]
    UnknownResource {
        /// Resource name.
        name: String,
    },

    /// A resource or node handle outlived the graph that owns it.
    #[error("{what} no longer exists; the graph may have been dropped or reset")]
    Expired {
        /// What was being upgraded, for the error message (e.g. "resource `x`").
        what: String,
    },

    /// Internal engine error (e.g. pool construction failure).
    #[error("internal engine error: {0}")]
    Internal(String),
}
