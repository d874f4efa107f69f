//! # Schema Catalog
//!
//! Process-wide cache of resolved table schemas, keyed by the concrete record
//! type. Each slot is assigned at most once: concurrent first users of the
//! same type serialize on the slot, one of them introspects, and every caller
//! gets the same `Arc<TableSchema>`.

use std::any::TypeId;
use std::sync::{Arc, LazyLock};

use dashmap::DashMap;
use parking_lot::Mutex;

use super::TableSchema;
use crate::error::Result;

type Slot = Arc<Mutex<Option<Arc<TableSchema>>>>;

static GLOBAL: LazyLock<SchemaCatalog> = LazyLock::new(SchemaCatalog::new);

/// Memoizing schema registry
#[derive(Debug, Default)]
pub struct SchemaCatalog {
    slots: DashMap<TypeId, Slot>,
}

impl SchemaCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        SchemaCatalog {
            slots: DashMap::new(),
        }
    }

    /// The catalog shared by every record type that does not bring its own
    pub fn global() -> &'static SchemaCatalog {
        &GLOBAL
    }

    /// Cached schema for `T`, if it has been resolved
    pub fn get<T: 'static>(&self) -> Option<Arc<TableSchema>> {
        let slot = self.slots.get(&TypeId::of::<T>())?.value().clone();
        let guard = slot.lock();
        guard.clone()
    }

    /// Return the cached schema for `T`, running `init` if there is none yet.
    ///
    /// `init` runs with only `T`'s slot locked. If it fails, the slot stays
    /// empty and the next caller retries.
    pub fn get_or_try_init<T, F>(&self, init: F) -> Result<Arc<TableSchema>>
    where
        T: 'static,
        F: FnOnce() -> Result<TableSchema>,
    {
        let slot = self
            .slots
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .value()
            .clone();

        let mut guard = slot.lock();
        if let Some(schema) = guard.as_ref() {
            return Ok(Arc::clone(schema));
        }

        let schema = Arc::new(init()?);
        *guard = Some(Arc::clone(&schema));
        Ok(schema)
    }

    /// Number of record types with a resolved schema
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|entry| entry.value().lock().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
