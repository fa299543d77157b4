//! Typed resources: the value slots that flow between compute nodes.
//!
//! A [`ResourceRecord`] is the bookkeeping object the graph owns for one
//! named resource. Node bodies never touch it directly; they interact
//! through [`InputHandle`]/[`OutputHandle`], which hold only weak
//! references so the graph remains the sole owner.

mod handle;
mod record;

pub use handle::{InputHandle, OutputHandle, ResourceRef};
pub(crate) use record::ResourceRecord;

/// Lifecycle policy for a resource, chosen at first registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceFlags {
    /// Returns to `available = false` on every [`crate::Graph::reset`].
    Resetable,
    /// Created once; retains its value and availability across `reset`.
    Permanent,
    /// Logically owned by a single consumer that takes the value rather
    /// than borrowing it. The engine does not enforce the move itself
    /// (Rust's ownership system already prevents two readers from both
    /// mutating it); this flag exists so registration-time flag matching
    /// can distinguish it from `Resetable` for callers that care.
    Moveable,
}
