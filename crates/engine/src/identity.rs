//! Identity provider boundary and the local, database backed provider.

use std::{
    future::Future,
    sync::{Mutex, PoisonError},
};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, Subscription, Watchers};

pub const MIN_PASSWORD_LEN: usize = 6;
const HASH_ROUNDS: usize = 10_000;
const AUTH_TOPIC: &str = "auth";

/// Signed-in user as reported by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub uid: String,
    pub email: String,
}

pub trait IdentityProvider: Send + Sync {
    /// Creates the account and signs it in.
    fn register(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = ResultEngine<User>> + Send;

    fn login(&self, email: &str, password: &str) -> impl Future<Output = ResultEngine<User>> + Send;

    fn logout(&self) -> impl Future<Output = ResultEngine<()>> + Send;

    /// Auth state stream. The current state is delivered first.
    fn subscribe(&self) -> Subscription<Option<User>>;
}

mod users {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
    #[sea_orm(table_name = "users")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub uid: String,
        #[sea_orm(unique)]
        pub email: String,
        pub password_hash: String,
        pub salt: String,
        pub created_at: DateTimeUtc,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// Identity provider over the `users` table.
///
/// The signed-in user is process state: it starts signed out and changes
/// only through `register`, `login` and `logout`.
#[derive(Debug)]
pub struct LocalIdentity {
    database: DatabaseConnection,
    current: Mutex<Option<User>>,
    watchers: Watchers<Option<User>>,
}

impl LocalIdentity {
    pub fn new(database: DatabaseConnection) -> Self {
        Self {
            database,
            current: Mutex::new(None),
            watchers: Watchers::default(),
        }
    }

    pub fn current_user(&self) -> Option<User> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn subscribers(&self) -> usize {
        self.watchers.active()
    }

    fn switch_to(&self, user: Option<User>) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = user.clone();
        self.watchers.notify(AUTH_TOPIC, user);
    }

    async fn find_by_email(&self, email: &str) -> ResultEngine<Option<users::Model>> {
        Ok(users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.database)
            .await?)
    }
}

impl IdentityProvider for LocalIdentity {
    async fn register(&self, email: &str, password: &str) -> ResultEngine<User> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(EngineError::WeakPassword(MIN_PASSWORD_LEN));
        }
        if self.find_by_email(&email).await?.is_some() {
            return Err(EngineError::EmailInUse(email));
        }

        let salt = Uuid::new_v4().simple().to_string();
        let user = User {
            uid: Uuid::new_v4().to_string(),
            email,
        };
        users::ActiveModel {
            uid: ActiveValue::Set(user.uid.clone()),
            email: ActiveValue::Set(user.email.clone()),
            password_hash: ActiveValue::Set(hash_password(&salt, password)),
            salt: ActiveValue::Set(salt),
            created_at: ActiveValue::Set(Utc::now()),
        }
        .insert(&self.database)
        .await?;

        tracing::info!("registered user {}", user.uid);
        self.switch_to(Some(user.clone()));
        Ok(user)
    }

    async fn login(&self, email: &str, password: &str) -> ResultEngine<User> {
        let email = email.trim().to_lowercase();
        let Some(model) = self.find_by_email(&email).await? else {
            return Err(EngineError::InvalidCredentials);
        };
        if hash_password(&model.salt, password) != model.password_hash {
            return Err(EngineError::InvalidCredentials);
        }

        let user = User {
            uid: model.uid,
            email: model.email,
        };
        tracing::info!("user {} signed in", user.uid);
        self.switch_to(Some(user.clone()));
        Ok(user)
    }

    async fn logout(&self) -> ResultEngine<()> {
        if let Some(user) = self.current_user() {
            tracing::info!("user {} signed out", user.uid);
        }
        self.switch_to(None);
        Ok(())
    }

    fn subscribe(&self) -> Subscription<Option<User>> {
        self.watchers.watch(AUTH_TOPIC, self.current_user())
    }
}

/// Trims and lowercases `email`, rejecting anything not shaped like
/// `local@domain.tld`.
pub(crate) fn normalize_email(email: &str) -> ResultEngine<String> {
    let email = email.trim().to_lowercase();
    let invalid = || EngineError::InvalidEmail(email.clone());

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || email.chars().any(char::is_whitespace)
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return Err(invalid());
    }
    Ok(email)
}

/// Salted, iterated SHA-256, base64 encoded.
fn hash_password(salt: &str, password: &str) -> String {
    let mut digest = Sha256::new()
        .chain_update(salt.as_bytes())
        .chain_update(password.as_bytes())
        .finalize();
    for _ in 1..HASH_ROUNDS {
        digest = Sha256::new()
            .chain_update(digest)
            .chain_update(password.as_bytes())
            .finalize();
    }
    STANDARD.encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Ana@Example.COM ").unwrap(), "ana@example.com");
    }

    #[test]
    fn malformed_emails_are_rejected() {
        let malformed = [
            "",
            "ana",
            "@example.com",
            "ana@",
            "ana@example",
            "ana@.com",
            "a na@x.io",
            "a@b@c.io",
        ];
        for email in malformed {
            assert!(
                matches!(normalize_email(email), Err(EngineError::InvalidEmail(_))),
                "{email:?} accepted"
            );
        }
    }

    #[test]
    fn hashes_depend_on_salt_and_password() {
        let a = hash_password("salt", "secret1");
        assert_eq!(a, hash_password("salt", "secret1"));
        assert_ne!(a, hash_password("pepper", "secret1"));
        assert_ne!(a, hash_password("salt", "secret2"));
    }
}
