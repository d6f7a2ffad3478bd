use std::sync::Arc;

use chrono::{TimeZone, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use serde_json::json;
use uuid::Uuid;

use engine::{
    DocumentPath, DocumentStore, EngineError, ExpenseDraft, ExpensesDocument, IdentityProvider,
    LocalIdentity, MIN_PASSWORD_LEN, Navigation, Route, SessionController, SqliteStore,
    StoreEvent, auth, expenses,
};
use migration::MigratorTrait;

async fn database() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
}

async fn file_database() -> (DatabaseConnection, String, std::path::PathBuf) {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target/test_dbs");
    std::fs::create_dir_all(&root).unwrap();

    let path = root.join(format!("engine_{}.db", Uuid::new_v4()));
    let url = format!("sqlite:{}?mode=rwc", path.display());
    let db = Database::connect(&url).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    (db, url, path)
}

#[tokio::test]
async fn register_signs_the_user_in() {
    let identity = LocalIdentity::new(database().await);
    let mut auth_state = identity.subscribe();
    assert_eq!(auth_state.recv().await, Some(None));

    let user = identity.register(" Ana@Example.com ", "secret123").await.unwrap();

    assert_eq!(user.email, "ana@example.com");
    assert_eq!(identity.current_user(), Some(user.clone()));
    assert_eq!(auth_state.recv().await, Some(Some(user)));
}

#[tokio::test]
async fn registration_rules() {
    let identity = LocalIdentity::new(database().await);

    assert!(matches!(
        identity.register("not-an-email", "secret123").await,
        Err(EngineError::InvalidEmail(_))
    ));
    assert_eq!(
        identity.register("ana@example.com", "12345").await.unwrap_err(),
        EngineError::WeakPassword(MIN_PASSWORD_LEN)
    );

    identity.register("ana@example.com", "secret123").await.unwrap();
    assert_eq!(
        identity.register("ANA@example.com", "other-secret").await.unwrap_err(),
        EngineError::EmailInUse("ana@example.com".to_string())
    );
}

#[tokio::test]
async fn login_checks_the_password() {
    let identity = LocalIdentity::new(database().await);
    let registered = identity.register("ana@example.com", "secret123").await.unwrap();
    identity.logout().await.unwrap();
    assert_eq!(identity.current_user(), None);

    assert_eq!(
        identity.login("ana@example.com", "wrong-password").await.unwrap_err(),
        EngineError::InvalidCredentials
    );
    assert_eq!(
        identity.login("bob@example.com", "secret123").await.unwrap_err(),
        EngineError::InvalidCredentials
    );

    let user = identity.login("ANA@example.com", "secret123").await.unwrap();
    assert_eq!(user, registered);
}

#[tokio::test]
async fn passwords_are_not_stored_in_clear() {
    let db = database().await;
    let identity = LocalIdentity::new(db.clone());
    identity.register("ana@example.com", "secret123").await.unwrap();

    let row = db
        .query_one(Statement::from_string(
            db.get_database_backend(),
            "SELECT password_hash, salt FROM users".to_string(),
        ))
        .await
        .unwrap()
        .unwrap();
    let hash: String = row.try_get("", "password_hash").unwrap();
    let salt: String = row.try_get("", "salt").unwrap();
    assert!(!hash.contains("secret123"));
    assert!(!salt.is_empty());
}

#[tokio::test]
async fn auth_flows_navigate_or_report() {
    let identity = LocalIdentity::new(database().await);

    assert_eq!(
        auth::sign_up(&identity, "ana@example.com", "secret123").await,
        Ok(Navigation::Push(Route::Dashboard))
    );
    let failure = auth::sign_up(&identity, "ana@example.com", "secret123")
        .await
        .unwrap_err();
    assert_eq!(failure.to_string(), "\"ana@example.com\" is already in use!");

    assert_eq!(auth::sign_out(&identity).await, Some(Navigation::Replace(Route::SignIn)));

    let failure = auth::sign_in(&identity, "ana@example.com", "nope-nope")
        .await
        .unwrap_err();
    assert_eq!(failure.to_string(), "Invalid credentials");
    assert_eq!(
        auth::sign_in(&identity, "ana@example.com", "secret123").await,
        Ok(Navigation::Push(Route::Dashboard))
    );
}

#[tokio::test]
async fn sqlite_store_overwrites_and_notifies() {
    let store = SqliteStore::new(database().await);
    let path = DocumentPath::budget("u1");
    assert_eq!(store.get(&path).await.unwrap(), None);

    let mut sub = store.subscribe(&path).await.unwrap();
    store.set(&path, json!({ "amount": 1, "stale": true })).await.unwrap();
    store.set(&path, json!({ "amount": 2 })).await.unwrap();

    assert_eq!(store.get(&path).await.unwrap(), Some(json!({ "amount": 2 })));

    let mut seen = Vec::new();
    while let Some(StoreEvent::Snapshot(snapshot)) = sub.try_recv() {
        seen.push(snapshot.data);
    }
    assert_eq!(
        seen,
        vec![None, Some(json!({ "amount": 1, "stale": true })), Some(json!({ "amount": 2 }))]
    );

    sub.unsubscribe();
    assert_eq!(store.subscribers(), 0);
}

#[tokio::test]
async fn sqlite_store_reports_corrupt_documents_on_subscribe() {
    let db = database().await;
    db.execute(Statement::from_sql_and_values(
        db.get_database_backend(),
        "INSERT INTO documents (path, data, updated_at) VALUES (?, ?, ?)",
        vec!["users/u1/expenses/all".into(), "{not json".into(), Utc::now().into()],
    ))
    .await
    .unwrap();

    let store = SqliteStore::new(db);
    let mut sub = store.subscribe(&DocumentPath::expenses("u1")).await.unwrap();
    assert!(matches!(sub.try_recv(), Some(StoreEvent::Error(_))));
}

#[tokio::test]
async fn expense_dates_survive_the_store() {
    let store = SqliteStore::new(database().await);
    let path = DocumentPath::expenses("u1");
    let created_at = Utc.timestamp_opt(1_700_000_123, 456_000_000).unwrap();

    let (_, items) = expenses::with_added(&[], &ExpenseDraft::new("9.99", "Food", ""), created_at);
    engine::store::write(&store, &path, &ExpensesDocument::new(items)).await.unwrap();

    let document: ExpensesDocument = engine::store::read(&store, &path).await.unwrap().unwrap();
    assert_eq!(document.items[0].created_at, created_at);
    assert_eq!(document.items[0].id.0, created_at.timestamp_millis());
}

#[tokio::test]
async fn session_state_persists_across_connections() {
    let (db, url, path) = file_database().await;
    let identity = Arc::new(LocalIdentity::new(db.clone()));
    identity.register("ana@example.com", "secret123").await.unwrap();

    {
        let store = Arc::new(SqliteStore::new(db.clone()));
        let mut controller = SessionController::new(Arc::clone(&identity), store);
        controller.start().await;
        controller.settle().await;
        controller
            .add_expense(&ExpenseDraft::new("40", "Food", "groceries"))
            .await
            .unwrap();
        controller.save_budget("120").await;
        controller.settle().await;
        assert_eq!(controller.expenses().len(), 1);
    }
    drop(db);

    let db = Database::connect(&url).await.unwrap();
    let identity = Arc::new(LocalIdentity::new(db.clone()));
    identity.login("ana@example.com", "secret123").await.unwrap();
    let mut controller = SessionController::new(identity, Arc::new(SqliteStore::new(db)));
    controller.start().await;
    controller.settle().await;

    assert_eq!(controller.budget(), "120");
    assert_eq!(controller.expenses().len(), 1);
    assert_eq!(controller.expenses()[0].note.as_deref(), Some("groceries"));
    assert_eq!(controller.summary().percent_spent.to_string(), "33.3");

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn migrations_roll_back_and_reapply() {
    let db = database().await;
    let path = DocumentPath::budget("u1");
    SqliteStore::new(db.clone())
        .set(&path, json!({ "amount": 1 }))
        .await
        .unwrap();

    migration::Migrator::down(&db, None).await.unwrap();
    assert!(matches!(
        SqliteStore::new(db.clone()).get(&path).await,
        Err(EngineError::Database(_))
    ));

    migration::Migrator::up(&db, None).await.unwrap();
    assert_eq!(SqliteStore::new(db).get(&path).await.unwrap(), None);
}
