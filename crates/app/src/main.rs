use std::sync::Arc;

use clap::Parser;
use engine::{LocalIdentity, SessionController, SqliteStore, auth};
use migration::{Migrator, MigratorTrait};

use crate::{
    cli::{Cli, Command},
    error::Result,
};

mod cli;
mod error;
mod render;
mod settings;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let mut settings = settings::Settings::new(cli.config.as_deref())?;
    settings.override_with(cli.email, cli.database);

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "spent={level},engine={level}",
            level = settings.app.level
        ))
        .with_writer(std::io::stderr)
        .init();

    run(settings, cli.command).await?;
    Ok(())
}

async fn run(settings: settings::Settings, command: Command) -> Result<()> {
    let db = connect(&settings.database).await?;
    let identity = Arc::new(LocalIdentity::new(db.clone()));
    let store = Arc::new(SqliteStore::new(db));

    let (email, password) = settings.account.credentials()?;
    let navigation = match command {
        Command::SignUp => auth::sign_up(&*identity, email, password).await?,
        _ => auth::sign_in(&*identity, email, password).await?,
    };
    tracing::debug!("navigating to {navigation:?}");

    let mut controller = SessionController::new(identity, store);
    controller.start().await;
    controller.settle().await;

    let result = cli::execute(&mut controller, command).await;
    controller.shutdown();
    result
}

async fn connect(config: &settings::Database) -> Result<sea_orm::DatabaseConnection> {
    let database = sea_orm::Database::connect(config.url()).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
