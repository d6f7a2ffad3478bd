//! Document store persisted in the `documents` table.
//!
//! Each row holds one document as JSON text. Change notification is
//! in-process: only subscribers attached to this `SqliteStore` see writes
//! made through it.

use chrono::Utc;
use sea_orm::{ActiveValue, DatabaseConnection, EntityTrait, sea_query::OnConflict};
use serde_json::Value;

use super::{DocumentPath, DocumentStore, Snapshot, StoreEvent};
use crate::{ResultEngine, Subscription, Watchers};

mod documents {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
    #[sea_orm(table_name = "documents")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub path: String,
        pub data: String,
        pub updated_at: DateTimeUtc,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

#[derive(Debug)]
pub struct SqliteStore {
    database: DatabaseConnection,
    watchers: Watchers<StoreEvent>,
}

impl SqliteStore {
    pub fn new(database: DatabaseConnection) -> Self {
        Self {
            database,
            watchers: Watchers::default(),
        }
    }

    pub fn subscribers(&self) -> usize {
        self.watchers.active()
    }
}

impl DocumentStore for SqliteStore {
    async fn get(&self, path: &DocumentPath) -> ResultEngine<Option<Value>> {
        let Some(row) = documents::Entity::find_by_id(path.as_str())
            .one(&self.database)
            .await?
        else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&row.data)?))
    }

    async fn set(&self, path: &DocumentPath, data: Value) -> ResultEngine<()> {
        let row = documents::ActiveModel {
            path: ActiveValue::Set(path.to_string()),
            data: ActiveValue::Set(serde_json::to_string(&data)?),
            updated_at: ActiveValue::Set(Utc::now()),
        };
        documents::Entity::insert(row)
            .on_conflict(
                OnConflict::column(documents::Column::Path)
                    .update_columns([documents::Column::Data, documents::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(&self.database)
            .await?;

        tracing::debug!("document {path} written");
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
        let initial = match self.get(path).await {
            Ok(data) => StoreEvent::Snapshot(Snapshot {
                path: path.clone(),
                data,
            }),
            Err(crate::EngineError::Database(err)) => return Err(err.into()),
            Err(err) => StoreEvent::Error(err.to_string()),
        };
        Ok(self.watchers.watch(path.as_str(), initial))
    }
}
