//! CLI subcommand implementations.

pub mod migrate;
pub mod reminders;
pub mod vapid;

use secrecy::SecretString;
use sqlx::PgPool;

/// Connect using `DATABASE_URL`, loading `.env` first if present.
async fn connect() -> Result<PgPool, ConnectError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL")
        .map(SecretString::from)
        .map_err(|_| ConnectError::MissingEnvVar("DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    Ok(duenotes_server::db::create_pool(&database_url).await?)
}

/// Errors establishing the database connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
