//! Database connection and schema management.

use sea_orm::{ConnectionTrait, Database as SeaDatabase, DatabaseConnection, Statement};
use sea_orm_migration::{migrator::MigrationStatus, MigratorTrait};

use crate::config::Config;
use crate::errors::AppResult;

pub mod migrations;

pub use migrations::Migrator;

/// Database handle shared by the repositories.
#[derive(Clone)]
pub struct Database {
    connection: DatabaseConnection,
}

impl Database {
    /// Connect and bring the schema up to date.
    ///
    /// The service refuses to start on a stale schema: the rotation
    /// protocol depends on the unique token index and the family/user
    /// indexes existing before the first request.
    pub async fn connect(config: &Config) -> AppResult<Self> {
        let db = Self::connect_without_migrations(config).await?;
        db.run_migrations().await?;

        tracing::info!(db_name = %config.db_name, "Database connected, schema is current");
        Ok(db)
    }

    /// Connect without touching the schema (used by the migrate command).
    pub async fn connect_without_migrations(config: &Config) -> AppResult<Self> {
        let connection = SeaDatabase::connect(config.database_url()).await?;
        Ok(Self { connection })
    }

    /// Get a clone of the underlying connection.
    pub fn get_connection(&self) -> DatabaseConnection {
        self.connection.clone()
    }

    /// Apply pending migrations.
    pub async fn run_migrations(&self) -> AppResult<()> {
        Migrator::up(&self.connection, None).await?;
        Ok(())
    }

    /// Roll back the most recent migration.
    pub async fn rollback_migration(&self) -> AppResult<()> {
        Migrator::down(&self.connection, Some(1)).await?;
        Ok(())
    }

    /// Applied/pending state of every known migration, in order.
    pub async fn migration_status(&self) -> AppResult<Vec<(String, bool)>> {
        let migrations = Migrator::get_migration_with_status(&self.connection).await?;

        Ok(migrations
            .iter()
            .map(|m| {
                let applied = matches!(m.status(), MigrationStatus::Applied);
                (m.name().to_string(), applied)
            })
            .collect())
    }

    /// Drop everything and re-run all migrations from scratch.
    pub async fn fresh_migrations(&self) -> AppResult<()> {
        Migrator::fresh(&self.connection).await?;
        Ok(())
    }

    /// Connectivity probe for the health endpoint.
    pub async fn ping(&self) -> AppResult<()> {
        let backend = self.connection.get_database_backend();
        self.connection
            .execute(Statement::from_string(backend, "SELECT 1".to_owned()))
            .await?;
        Ok(())
    }
}
