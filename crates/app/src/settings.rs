//! Settings for the `spent` binary.
//!
//! Sources, later ones winning: `config/spent.toml` (or `--config`),
//! `SPENT_*` environment variables (`__` separates sections, e.g.
//! `SPENT_ACCOUNT__PASSWORD`), command-line flags.
//!
//! ```toml
//! [app]
//! level = "info"
//!
//! [database]
//! kind = "sqlite"
//! path = "spent.db"
//!
//! [account]
//! email = "ana@example.com"
//! ```
use serde::Deserialize;

use crate::error::{AppError, Result};

const DEFAULT_CONFIG_PATH: &str = "config/spent.toml";

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite { path: String },
}

impl Default for Database {
    fn default() -> Self {
        Self::Sqlite {
            path: "spent.db".to_string(),
        }
    }
}

impl Database {
    pub fn url(&self) -> String {
        match self {
            Self::Memory => String::from("sqlite::memory:"),
            Self::Sqlite { path } => format!("sqlite:{path}?mode=rwc"),
        }
    }
}

/// Credentials. The password is never taken from a command-line flag.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Account {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl Account {
    pub fn credentials(&self) -> Result<(&str, &str)> {
        let email = self
            .email
            .as_deref()
            .ok_or(AppError::MissingSetting("account email"))?;
        let password = self
            .password
            .as_deref()
            .ok_or(AppError::MissingSetting("account password"))?;
        Ok((email, password))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub database: Database,
    pub account: Account,
}

/// `SPENT_` prefix, `__` between sections: `SPENT_ACCOUNT__PASSWORD`.
fn environment() -> config::Environment {
    config::Environment::with_prefix("SPENT")
        .prefix_separator("_")
        .separator("__")
}

impl Settings {
    pub fn new(path: Option<&str>) -> Result<Self> {
        let file =
            config::File::with_name(path.unwrap_or(DEFAULT_CONFIG_PATH)).required(path.is_some());
        Self::layered(file, environment())
    }

    fn layered(
        file: impl config::Source + Send + Sync + 'static,
        env: config::Environment,
    ) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(file)
            .add_source(env)
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Applies command-line flags, which win over every other source.
    pub fn override_with(&mut self, email: Option<String>, database: Option<String>) {
        if let Some(email) = email {
            self.account.email = Some(email);
        }
        if let Some(path) = database {
            self.database = Database::Sqlite { path };
        }
    }
}
