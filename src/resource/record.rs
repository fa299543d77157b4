use std::any::{Any, TypeId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use parking_lot::{Mutex, RwLock};

use crate::error::{EngineError, EngineResult};
use crate::exec::ExecRecord;
use crate::resource::ResourceFlags;

/// One named, typed value slot in the graph.
///
/// Owned exclusively by the graph's resource map. Exec records reference
/// it only through [`Weak`] pointers, matching the engine's rule that the
/// graph is the single owner of all bookkeeping state.
pub(crate) struct ResourceRecord {
    name: String,
    type_id: TypeId,
    flags: ResourceFlags,
    value: RwLock<Option<Arc<dyn Any + Send + Sync>>>,
    available: AtomicBool,
    producer: RwLock<Option<Weak<ExecRecord>>>,
    consumers: RwLock<Vec<Weak<ExecRecord>>>,
    time_available: Mutex<Option<Instant>>,
}

impl ResourceRecord {
    pub(crate) fn new(name: String, type_id: TypeId, flags: ResourceFlags) -> Self {
        Self {
            name,
            type_id,
            flags,
            value: RwLock::new(None),
            available: AtomicBool::new(false),
            producer: RwLock::new(None),
            consumers: RwLock::new(Vec::new()),
            time_available: Mutex::new(None),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn flags(&self) -> ResourceFlags {
        self.flags
    }

    pub(crate) fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    pub(crate) fn time_available(&self) -> Option<Instant> {
        *self.time_available.lock()
    }

    /// Checks that `T` matches the type this resource was first registered
    /// with. Called on every subsequent registration of the same name.
    pub(crate) fn check_type<T: Any>(&self) -> EngineResult<()> {
        if self.type_id == TypeId::of::<T>() {
            Ok(())
        } else {
            Err(EngineError::TypeMismatch {
                name: self.name.clone(),
            })
        }
    }

    /// Checks that `flags` matches the flags this resource was first
    /// registered with.
    pub(crate) fn check_flags(&self, flags: ResourceFlags) -> EngineResult<()> {
        if self.flags == flags {
            Ok(())
        } else {
            Err(EngineError::FlagMismatch {
                name: self.name.clone(),
            })
        }
    }

    /// Binds `node` as the producer of this resource. Fails if a different
    /// node already claimed production (see `REDESIGN FLAGS` in
    /// SPEC_FULL.md: the source silently rebinds, this engine rejects it).
    pub(crate) fn bind_producer(&self, node: &Arc<ExecRecord>) -> EngineResult<()> {
        let mut producer = self.producer.write();
        if let Some(existing) = producer.as_ref().and_then(Weak::upgrade) {
            if !Arc::ptr_eq(&existing, node) {
                return Err(EngineError::ProducerConflict {
                    name: self.name.clone(),
                    existing_producer: existing.name(),
                    attempted_producer: node.name(),
                });
            }
            return Ok(());
        }
        *producer = Some(Arc::downgrade(node));
        Ok(())
    }

    pub(crate) fn add_consumer(&self, node: &Arc<ExecRecord>) {
        self.consumers.write().push(Arc::downgrade(node));
    }

    pub(crate) fn set_value<T: Any + Send + Sync + 'static>(&self, v: T) {
        *self.value.write() = Some(Arc::new(v));
    }

    fn value_arc<T: Any + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        let arc = self.value.read().clone()?;
        arc.downcast::<T>().ok()
    }

    pub(crate) fn get_value<T: Any + Send + Sync + 'static>(&self) -> EngineResult<Arc<T>> {
        if !self.is_available() {
            return Err(EngineError::UnavailableRead {
                name: self.name.clone(),
            });
        }
        self.value_arc::<T>().ok_or_else(|| EngineError::TypeMismatch {
            name: self.name.clone(),
        })
    }

    /// Transitions `available` from false to true, returning whether this
    /// call performed the transition. Idempotent: a second call is a no-op
    /// and returns `false`.
    fn latch_available(&self) -> bool {
        self.available
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Makes the resource available and notifies every consumer, but only
    /// on the false-to-true transition (idempotent w.r.t. repeated calls).
    pub(crate) fn make_available_and_notify(&self) {
        if self.latch_available() {
            *self.time_available.lock() = Some(Instant::now());
            for weak in self.consumers.read().iter() {
                if let Some(node) = weak.upgrade() {
                    node.trigger();
                }
            }
        }
    }

    /// Returns this resource to `available = false` and drops its value.
    /// Never called on `Permanent` resources by [`crate::Graph::reset`].
    pub(crate) fn reset_availability(&self) {
        self.available.store(false, Ordering::Release);
        *self.value.write() = None;
        *self.time_available.lock() = None;
    }
}
