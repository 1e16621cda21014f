//! Embedded schema migrations applied at start-up.

use diesel::{Connection, PgConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::info;

/// Migrations compiled in from `backend/migrations`.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Failure while bringing the schema up to date.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MigrationError {
    /// The database could not be reached.
    #[error("failed to connect for migrations: {message}")]
    Connect { message: String },
    /// A migration failed to apply.
    #[error("database migration failed: {message}")]
    Apply { message: String },
    /// The blocking migration task panicked or was cancelled.
    #[error("migration task aborted: {message}")]
    Aborted { message: String },
}

fn apply_pending(database_url: &str) -> Result<usize, MigrationError> {
    let mut connection = PgConnection::establish(database_url).map_err(|error| {
        MigrationError::Connect {
            message: error.to_string(),
        }
    })?;
    let applied = connection
        .run_pending_migrations(MIGRATIONS)
        .map_err(|error| MigrationError::Apply {
            message: error.to_string(),
        })?;
    Ok(applied.len())
}

/// Apply every pending migration on a blocking worker thread.
///
/// # Errors
///
/// Returns [`MigrationError`] when the database is unreachable or a
/// migration fails; already-applied migrations are left in place.
pub async fn run_migrations(database_url: &str) -> Result<(), MigrationError> {
    let url = database_url.to_owned();
    let applied = tokio::task::spawn_blocking(move || apply_pending(&url))
        .await
        .map_err(|error| MigrationError::Aborted {
            message: error.to_string(),
        })??;
    info!(applied, "database schema up to date");
    Ok(())
}
