use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("{0}")]
    Auth(#[from] engine::AuthFailure),
    #[error("missing {0}: set it in the config file or the environment")]
    MissingSetting(&'static str),
    #[error("{0} was not saved, see the log for details")]
    NotSaved(&'static str),
}
