//! Storage bootstrap for the ech0 backend: backend selection, connection,
//! declarative schema sync and versioned data migrations.
//! Used by the backend and the migration CLI.

pub mod config;
pub mod entities;
pub mod error;
pub mod infra;

pub use config::db::{DatabaseSettings, DbKind, StorageSpec};
pub use error::DbInfraError;
pub use infra::db::core::{
    bootstrap_storage, migrate_schema, open_storage, orchestrate_migration, sanitize_db_url,
};
pub use infra::db::schema_sync::{sync_schema, SyncReport};
