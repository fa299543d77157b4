use std::any::Any;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::{Arc, Weak};

use crate::error::{EngineError, EngineResult};
use crate::resource::record::ResourceRecord;

fn upgrade(weak: &Weak<ResourceRecord>, name: &str) -> EngineResult<Arc<ResourceRecord>> {
    weak.upgrade().ok_or_else(|| EngineError::Expired {
        what: format!("resource `{name}`"),
    })
}

/// A value read out of an available resource.
///
/// Derefs to `T`. Holding one keeps the resource's current value alive
/// even if the producer overwrites it on a later run, since the value is
/// stored behind a reference-counted cell that is swapped, not mutated,
/// on every `set`/`emplace`.
pub struct ResourceRef<T>(Arc<T>);

impl<T> Deref for ResourceRef<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> ResourceRef<T> {
    pub(crate) fn new(value: Arc<T>) -> Self {
        Self(value)
    }
}

/// A node's declared input. Created by [`crate::graph::Registry::register_input_resource`].
pub struct InputHandle<T> {
    record: Weak<ResourceRecord>,
    name: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync + 'static> InputHandle<T> {
    pub(crate) fn new(record: Weak<ResourceRecord>, name: String) -> Self {
        Self {
            record,
            name,
            _marker: PhantomData,
        }
    }

    /// Returns the produced value. Fails with [`EngineError::UnavailableRead`]
    /// if the producer has not yet called `make_available()` this run.
    pub fn get(&self) -> EngineResult<ResourceRef<T>> {
        let record = upgrade(&self.record, &self.name)?;
        record.get_value::<T>().map(ResourceRef)
    }

    /// True if the resource currently holds an available value.
    pub fn is_available(&self) -> bool {
        self.record
            .upgrade()
            .map(|r| r.is_available())
            .unwrap_or(false)
    }
}

/// A node's declared output. Created by [`crate::graph::Registry::register_output_resource`].
pub struct OutputHandle<T> {
    record: Weak<ResourceRecord>,
    name: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync + 'static> OutputHandle<T> {
    pub(crate) fn new(record: Weak<ResourceRecord>, name: String) -> Self {
        Self {
            record,
            name,
            _marker: PhantomData,
        }
    }

    /// Returns the value currently stored, if the resource is available.
    pub fn get(&self) -> EngineResult<ResourceRef<T>> {
        let record = upgrade(&self.record, &self.name)?;
        record.get_value::<T>().map(ResourceRef)
    }

    /// Stores `value` in the resource slot. Does not mark it available;
    /// call [`OutputHandle::make_available`] once the value is ready to be
    /// read by consumers.
    pub fn set(&self, value: T) -> EngineResult<()> {
        let record = upgrade(&self.record, &self.name)?;
        record.set_value(value);
        Ok(())
    }

    /// Constructs `value` in place. Rust has no variadic in-place
    /// construction, so this is an ergonomic alias for [`OutputHandle::set`]
    /// kept to mirror the source API's `emplace`/`set` pair.
    pub fn emplace(&self, value: T) -> EngineResult<()> {
        self.set(value)
    }

    /// Marks the resource available, notifying every consumer in
    /// registration order. Idempotent: the second and later calls within a
    /// run are no-ops.
    pub fn make_available(&self) -> EngineResult<()> {
        let record = upgrade(&self.record, &self.name)?;
        record.make_available_and_notify();
        Ok(())
    }
}
