//! In-process document store.

use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use serde_json::Value;

use super::{DocumentPath, DocumentStore, Snapshot, StoreEvent};
use crate::{ResultEngine, Subscription, Watchers};

#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<HashMap<DocumentPath, Value>>,
    watchers: Watchers<StoreEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn current(&self, path: &DocumentPath) -> Option<Value> {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }

    /// Number of live subscriptions, across all paths.
    pub fn subscribers(&self) -> usize {
        self.watchers.active()
    }
}

impl DocumentStore for MemoryStore {
    async fn get(&self, path: &DocumentPath) -> ResultEngine<Option<Value>> {
        Ok(self.current(path))
    }

    async fn set(&self, path: &DocumentPath, data: Value) -> ResultEngine<()> {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.clone(), data.clone());
        self.watchers.notify(
            path.as_str(),
            StoreEvent::Snapshot(Snapshot {
                path: path.clone(),
                data: Some(data),
            }),
        );
        Ok(())
    }

    async fn subscribe(&self, path: &DocumentPath) -> ResultEngine<Subscription<StoreEvent>> {
        let initial = StoreEvent::Snapshot(Snapshot {
            path: path.clone(),
            data: self.current(path),
        });
        Ok(self.watchers.watch(path.as_str(), initial))
    }
}
