//! Embedded schema migrations for the Postgres stores.

use sqlx::PgPool;
use sqlx::migrate::{MigrateError, Migrator};
use tracing::info;

/// Migrations under `gatekeep_core/migrations/`, compiled into the binary.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Bring the schema behind `pool` up to date.
pub async fn migrate(pool: &PgPool) -> Result<(), MigrateError> {
    info!(known = MIGRATOR.iter().count(), "applying schema migrations");
    MIGRATOR.run(pool).await
}
