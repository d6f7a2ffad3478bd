//! Document store boundary.
//!
//! A document store holds one JSON document per path and supports point
//! reads, full overwrites and real-time subscriptions. A subscription first
//! delivers the current snapshot, then one snapshot per write to the path.

use std::{fmt, future::Future};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{EngineError, ResultEngine, Subscription};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

mod memory;
mod sqlite;

/// Slash separated document path, e.g. `users/{uid}/expenses/all`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentPath(String);

impl DocumentPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn budget(uid: &str) -> Self {
        Self(format!("users/{uid}/settings/budget"))
    }

    pub fn expenses(uid: &str) -> Self {
        Self(format!("users/{uid}/expenses/all"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Full copy of a document at a point in time. `data` is `None` when the
/// document does not exist.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub path: DocumentPath,
    pub data: Option<Value>,
}

impl Snapshot {
    pub fn exists(&self) -> bool {
        self.data.is_some()
    }

    /// Decodes the document into `T`; `Ok(None)` when it does not exist.
    pub fn decode<T: DeserializeOwned>(&self) -> ResultEngine<Option<T>> {
        self.data
            .clone()
            .map(|data| decode(&self.path, data))
            .transpose()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum StoreEvent {
    Snapshot(Snapshot),
    Error(String),
}

pub trait DocumentStore: Send + Sync {
    fn get(&self, path: &DocumentPath) -> impl Future<Output = ResultEngine<Option<Value>>> + Send;

    /// Overwrites the whole document.
    fn set(
        &self,
        path: &DocumentPath,
        data: Value,
    ) -> impl Future<Output = ResultEngine<()>> + Send;

    fn subscribe(
        &self,
        path: &DocumentPath,
    ) -> impl Future<Output = ResultEngine<Subscription<StoreEvent>>> + Send;
}

fn decode<T: DeserializeOwned>(path: &DocumentPath, data: Value) -> ResultEngine<T> {
    serde_json::from_value(data).map_err(|err| EngineError::InvalidDocument {
        path: path.to_string(),
        reason: err.to_string(),
    })
}

/// Point read decoded into `T`.
pub async fn read<T: DeserializeOwned>(
    store: &impl DocumentStore,
    path: &DocumentPath,
) -> ResultEngine<Option<T>> {
    store
        .get(path)
        .await?
        .map(|data| decode(path, data))
        .transpose()
}

/// Full overwrite with the serialized `value`.
pub async fn write<T: Serialize>(
    store: &impl DocumentStore,
    path: &DocumentPath,
    value: &T,
) -> ResultEngine<()> {
    let data = serde_json::to_value(value)?;
    store.set(path, data).await
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn paths_are_per_user() {
        assert_eq!(DocumentPath::budget("u1").as_str(), "users/u1/settings/budget");
        assert_eq!(DocumentPath::expenses("u1").as_str(), "users/u1/expenses/all");
    }

    #[test]
    fn decode_reports_the_path() {
        let snapshot = Snapshot {
            path: DocumentPath::budget("u1"),
            data: Some(json!({ "amount": "lots" })),
        };
        let err = snapshot.decode::<crate::BudgetSetting>().unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidDocument { ref path, .. } if path == "users/u1/settings/budget"
        ));
    }

    #[test]
    fn missing_document_decodes_to_none() {
        let snapshot = Snapshot {
            path: DocumentPath::budget("u1"),
            data: None,
        };
        assert!(!snapshot.exists());
        assert_eq!(snapshot.decode::<crate::BudgetSetting>().unwrap(), None);
    }
}
