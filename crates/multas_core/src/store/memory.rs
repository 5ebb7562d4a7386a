//! In-process document store.
//!
//! # Responsibility
//! - Provide a dependency-free `RecordStore` for demos and tests.
//! - Allow callers to inject one-shot failures per operation kind.
//!
//! # Invariants
//! - Batches are validated in full before any document is touched.
//! - An injected fault fails exactly one matching call, then clears.

use crate::store::{
    merge_fields, Document, Fields, RecordStore, StoreError, StoreResult, WriteBatch,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Operation kind targeted by an injected failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StoreFault {
    Fetch,
    Update,
    Commit,
}

#[derive(Debug, Default)]
struct MemoryState {
    /// Collection name -> documents in insertion order.
    collections: BTreeMap<String, Vec<Document>>,
    pending_faults: Vec<StoreFault>,
    next_id: u64,
    update_calls: u64,
    commit_calls: u64,
}

impl MemoryState {
    fn take_fault(&mut self, fault: StoreFault) -> StoreResult<()> {
        match self.pending_faults.iter().position(|pending| *pending == fault) {
            Some(index) => {
                self.pending_faults.remove(index);
                Err(StoreError::Unavailable(format!("injected {fault:?} failure")))
            }
            None => Ok(()),
        }
    }

    fn document_mut(&mut self, collection: &str, id: &str) -> StoreResult<&mut Document> {
        self.collections
            .get_mut(collection)
            .and_then(|documents| documents.iter_mut().find(|document| document.id == id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })
    }

    fn contains(&self, collection: &str, id: &str) -> bool {
        self.collections
            .get(collection)
            .is_some_and(|documents| documents.iter().any(|document| document.id == id))
    }
}

/// Mutex-guarded in-memory document store.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    state: Mutex<MemoryState>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a document with a generated id (`doc-<n>`) and returns the id.
    pub fn insert(&self, collection: &str, fields: Fields) -> String {
        let mut state = self.lock();
        state.next_id += 1;
        let id = format!("doc-{}", state.next_id);
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(Document::new(id.clone(), fields));
        id
    }

    /// Inserts or replaces a document under a caller-provided id.
    pub fn put(&self, collection: &str, document: Document) {
        let mut state = self.lock();
        let documents = state.collections.entry(collection.to_string()).or_default();
        match documents.iter_mut().find(|existing| existing.id == document.id) {
            Some(existing) => *existing = document,
            None => documents.push(document),
        }
    }

    /// Returns a copy of one stored document.
    pub fn get(&self, collection: &str, id: &str) -> Option<Document> {
        self.lock()
            .collections
            .get(collection)
            .and_then(|documents| documents.iter().find(|document| document.id == id))
            .cloned()
    }

    /// Makes the next call of `fault` kind fail with `Unavailable`.
    pub fn fail_next(&self, fault: StoreFault) {
        self.lock().pending_faults.push(fault);
    }

    /// Number of `update_field` calls received, including failed ones.
    pub fn update_calls(&self) -> u64 {
        self.lock().update_calls
    }

    /// Number of `commit_batch` calls received, including failed ones.
    pub fn commit_calls(&self) -> u64 {
        self.lock().commit_calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // A poisoned lock only means a test panicked mid-call; the map is
        // still structurally valid.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RecordStore for InMemoryRecordStore {
    fn fetch_all(&self, collection: &str) -> StoreResult<Vec<Document>> {
        let mut state = self.lock();
        state.take_fault(StoreFault::Fetch)?;
        Ok(state
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }

    fn update_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> StoreResult<()> {
        let mut state = self.lock();
        state.update_calls += 1;
        state.take_fault(StoreFault::Update)?;
        let document = state.document_mut(collection, id)?;
        document.fields.insert(field.to_string(), value);
        Ok(())
    }

    fn commit_batch(&self, batch: WriteBatch) -> StoreResult<()> {
        let mut state = self.lock();
        state.commit_calls += 1;
        state.take_fault(StoreFault::Commit)?;

        if let Some(missing) = batch
            .writes()
            .iter()
            .find(|write| !state.contains(&write.collection, &write.id))
        {
            return Err(StoreError::NotFound {
                collection: missing.collection.clone(),
                id: missing.id.clone(),
            });
        }

        for write in batch.into_writes() {
            let document = state.document_mut(&write.collection, &write.id)?;
            merge_fields(&mut document.fields, &write.fields);
        }
        Ok(())
    }
}
