//! The module contains the errors the engine can throw.
//!
//! Authentication errors ([`InvalidEmail`], [`WeakPassword`], [`EmailInUse`],
//! [`InvalidCredentials`]) are meant to be shown to the user. Everything else
//! is a storage or decoding failure that callers log and drop.
//!
//!  [`InvalidEmail`]: EngineError::InvalidEmail
//!  [`WeakPassword`]: EngineError::WeakPassword
//!  [`EmailInUse`]: EngineError::EmailInUse
//!  [`InvalidCredentials`]: EngineError::InvalidCredentials
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid email: {0}")]
    InvalidEmail(String),
    #[error("Password should be at least {0} characters")]
    WeakPassword(usize),
    #[error("\"{0}\" is already in use!")]
    EmailInUse(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid document at {path}: {reason}")]
    InvalidDocument { path: String, reason: String },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// Returns `true` for errors caused by what the user typed in an auth form.
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::InvalidEmail(_)
                | Self::WeakPassword(_)
                | Self::EmailInUse(_)
                | Self::InvalidCredentials
        )
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidEmail(a), Self::InvalidEmail(b)) => a == b,
            (Self::WeakPassword(a), Self::WeakPassword(b)) => a == b,
            (Self::EmailInUse(a), Self::EmailInUse(b)) => a == b,
            (Self::InvalidCredentials, Self::InvalidCredentials) => true,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (
                Self::InvalidDocument { path: a, reason: r },
                Self::InvalidDocument { path: b, reason: s },
            ) => a == b && r == s,
            (Self::Json(a), Self::Json(b)) => a.to_string() == b.to_string(),
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
