use std::future::Future;
use std::time::{Duration, Instant};

use migration::{migrate, MigrationCommand, MigrationName, Migrator, MigratorTrait};
use rand::Rng;
use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr, Statement};
use tracing::{error, info, trace, warn};

use crate::config::db::{
    prepare_storage_dir, sqlite_file_prerequisites, DatabaseSettings, DbKind, PoolPurpose,
    StorageSpec,
};
use crate::error::DbInfraError;
use crate::infra::db::diagnostics::{self, Counter};
use crate::infra::db::locking::{BootstrapLock, MySqlNamedLock, SqliteFileLock};
use crate::infra::db::schema_sync::{sync_schema, SyncReport};

/// Default wait for another process holding the bootstrap lock.
const DEFAULT_LOCK_ACQUIRE_MS: u64 = 30_000;

async fn retry_connection<T, F, Fut>(
    mut connect_fn: F,
    max_attempts: u32,
    interval_ms: u64,
) -> Result<T, DbInfraError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbInfraError>>,
{
    let mut last_error = None;

    for attempt in 1..=max_attempts {
        match connect_fn().await {
            Ok(result) => {
                if attempt > 1 {
                    info!(
                        "connection_retry=success attempts={} interval_ms={}",
                        attempt, interval_ms
                    );
                }
                return Ok(result);
            }
            Err(e) => {
                last_error = Some(e);
                if attempt < max_attempts {
                    warn!(
                        "connection_retry=failed attempt={} max_attempts={} interval_ms={}",
                        attempt, max_attempts, interval_ms
                    );
                    tokio::time::sleep(Duration::from_millis(interval_ms)).await;
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| DbInfraError::Connection {
        message: "no error recorded after max attempts".to_string(),
    }))
}

async fn connect(spec: &StorageSpec, purpose: PoolPurpose) -> Result<DatabaseConnection, DbInfraError> {
    let opt = spec.connect_options(purpose);

    match spec.kind() {
        // a MySQL server started alongside us may still be coming up
        DbKind::MySql => {
            retry_connection(
                || {
                    let opt = opt.clone();
                    async move {
                        Database::connect(opt)
                            .await
                            .map_err(|e| DbInfraError::Connection {
                                message: format!("{purpose:?} pool: {e}"),
                            })
                    }
                },
                5,
                500,
            )
            .await
        }
        DbKind::Sqlite => Database::connect(opt)
            .await
            .map_err(|e| DbInfraError::Connection {
                message: format!("{purpose:?} pool: {e}"),
            }),
    }
}

/// Open the shared connection pool for the configured backend.
/// Does NOT create directories or run any migrations.
pub async fn open_storage(spec: &StorageSpec) -> Result<DatabaseConnection, DbInfraError> {
    info!(
        db_kind = %spec.kind(),
        target = %sanitize_db_url(spec.url()),
        "storage=open"
    );
    connect(spec, PoolPurpose::Runtime).await
}

/// Single-session pool used to hold the MySQL named lock.
pub async fn build_admin_pool(spec: &StorageSpec) -> Result<DatabaseConnection, DbInfraError> {
    connect(spec, PoolPurpose::Admin).await
}

/// Single entrypoint used by the backend: resolve the settings, prepare the
/// storage directory, open the pool and bring the schema up to date.
/// The returned pool is only handed out once the schema is complete.
pub async fn bootstrap_storage(
    settings: &DatabaseSettings,
) -> Result<DatabaseConnection, DbInfraError> {
    let spec = StorageSpec::resolve(settings)?;
    prepare_storage_dir(&spec)?;

    let conn = open_storage(&spec).await?;
    migrate_schema(&conn, &spec).await?;

    info!(db_kind = %spec.kind(), "storage=ready");
    Ok(conn)
}

/// Sanitize database URL by masking password in connection strings.
/// Used for generating lock keys and logging.
pub fn sanitize_db_url(url: &str) -> String {
    let Some((auth_part, host_part)) = url.rsplit_once('@') else {
        return url.to_string();
    };

    match auth_part.rfind(':') {
        // "mysql://user" has its only colon in the scheme
        Some(colon_pos) if !auth_part[colon_pos..].starts_with("://") => {
            format!("{}:***@{}", &auth_part[..colon_pos], host_part)
        }
        _ => url.to_string(),
    }
}

async fn fast_path_schema_check(conn: &DatabaseConnection) -> Result<bool, DbInfraError> {
    diagnostics::incr(Counter::SchemaCheck);

    let expected_count = Migrator::migrations().len();
    let expected_last = Migrator::migrations()
        .last()
        .map(|m| m.name().to_string())
        .unwrap_or_default();

    let (current_count, current_last) = match Migrator::get_applied_migrations(conn).await {
        Ok(migrations) => {
            let last = migrations.last().map(|m| m.name().to_string());
            (migrations.len(), last)
        }
        Err(DbErr::Exec(_)) => {
            trace!(fastpath = "miss", reason = "migration_table_missing");
            diagnostics::incr(Counter::FastPathMiss);
            return Ok(false);
        }
        Err(e) => {
            return Err(DbInfraError::migration(format!(
                "failed to get applied migrations: {e}"
            )));
        }
    };

    let is_up_to_date = current_count == expected_count
        && (!expected_last.is_empty() && current_last.as_deref() == Some(&expected_last));

    if is_up_to_date {
        diagnostics::incr(Counter::FastPathHit);
    } else {
        diagnostics::incr(Counter::FastPathMiss);
    }
    let fastpath = if is_up_to_date { "hit" } else { "miss" };
    trace!(
        fastpath,
        current_count,
        expected_count,
        current_last = %current_last.as_deref().unwrap_or(""),
        expected_last = %expected_last
    );

    Ok(is_up_to_date)
}

/// Bring the schema up to date under the bootstrap lock: declarative sync of
/// the entity tables, then the versioned data migrations (legacy upgrade).
pub async fn migrate_schema(
    conn: &DatabaseConnection,
    spec: &StorageSpec,
) -> Result<SyncReport, DbInfraError> {
    info!(db_kind = %spec.kind(), "migrate=start");

    let result = match spec.kind() {
        DbKind::Sqlite => {
            let lock_path = spec.sqlite_lock_path().ok_or_else(|| DbInfraError::Config {
                message: "sqlite storage has no lock path".to_string(),
            })?;
            migrate_with_lock(conn, SqliteFileLock::new(&lock_path), spec).await
        }
        DbKind::MySql => {
            let admin_pool = build_admin_pool(spec).await?;
            let key = format!("ech0:migrate:{}", sanitize_db_url(spec.url()));
            let result =
                migrate_with_lock(conn, MySqlNamedLock::new(admin_pool.clone(), &key), spec).await;
            if let Err(e) = admin_pool.close().await {
                warn!(error = %e, "failed to close admin pool");
            }
            result
        }
    };

    if let Err(ref e) = result {
        diagnostics::incr(Counter::MigrationFailed);
        let message = e.to_string();
        if message.contains("database is locked") || message.contains("SQLITE_BUSY") {
            error!("sqlite_busy op=migrate err={}", message);
        }
    }

    info!("migrate=done");
    diagnostics::log_snapshot("migrate_schema");

    result
}

fn lock_acquire_timeout() -> Duration {
    let ms = std::env::var("ECH0_MIGRATE_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(DEFAULT_LOCK_ACQUIRE_MS);
    Duration::from_millis(ms)
}

async fn migrate_with_lock<L>(
    pool: &DatabaseConnection,
    mut lock: L,
    spec: &StorageSpec,
) -> Result<SyncReport, DbInfraError>
where
    L: BootstrapLock,
{
    let acquire_timeout = lock_acquire_timeout();
    let start = Instant::now();

    let mut attempts: u32 = 0;
    let guard = loop {
        attempts += 1;

        if let Some(acquired_guard) = lock.try_acquire().await? {
            diagnostics::incr(Counter::LockAcquired);
            trace!(
                lock = "won",
                db_kind = %spec.kind(),
                attempts,
                elapsed_ms = start.elapsed().as_millis()
            );
            break acquired_guard;
        }

        if start.elapsed() >= acquire_timeout {
            diagnostics::incr(Counter::LockTimeout);
            return Err(DbInfraError::migration(format!(
                "bootstrap lock acquisition timeout after {:?} ({} attempts)",
                start.elapsed(),
                attempts
            )));
        }

        let base_delay_ms = (5u64 << attempts.saturating_sub(1).min(8)).min(200);
        let jitter_ms = rand::rng().random::<u64>() % 4;
        trace!(lock = "backoff", attempts, delay_ms = base_delay_ms + jitter_ms);

        tokio::time::sleep(Duration::from_millis(base_delay_ms + jitter_ms)).await;
    };

    let result = migrate_with_guard(pool, spec).await;

    if let Err(release_err) = guard.release().await {
        warn!(error = %release_err, "Failed to release bootstrap lock");
    }

    result
}

async fn migrate_with_guard(
    pool: &DatabaseConnection,
    spec: &StorageSpec,
) -> Result<SyncReport, DbInfraError> {
    let start = Instant::now();

    if spec.kind() == DbKind::Sqlite {
        setup_sqlite_file_prerequisites(pool).await?;
    }

    let report = sync_schema(pool).await?;

    if fast_path_schema_check(pool).await? {
        info!("migrate=skipped up_to_date=true");
        return Ok(report);
    }

    migrate(pool, MigrationCommand::Up)
        .await
        .map_err(|e| DbInfraError::migration(format!("migration execution failed: {e}")))?;

    diagnostics::incr(Counter::MigratorRan);
    info!(
        migrator = "ran",
        db_kind = %spec.kind(),
        elapsed_ms = start.elapsed().as_millis()
    );

    let expected_count = Migrator::migrations().len();
    let applied_count = migration::count_applied_migrations(pool)
        .await
        .map_err(|e| DbInfraError::migration(format!("failed to count migrations: {e}")))?;

    if applied_count != expected_count {
        return Err(DbInfraError::migration(format!(
            "verification failed: expected {expected_count} migrations, but {applied_count} were applied (db_kind={})",
            spec.kind()
        )));
    }

    Ok(report)
}

async fn setup_sqlite_file_prerequisites(pool: &DatabaseConnection) -> Result<(), DbInfraError> {
    for pragma in sqlite_file_prerequisites() {
        pool.execute(Statement::from_string(DatabaseBackend::Sqlite, pragma))
            .await
            .map_err(|e| DbInfraError::migration(format!("failed to apply '{pragma}': {e}")))?;
    }
    Ok(())
}

/// Entry point for the migration CLI. `Up` runs the full locked schema
/// bootstrap; `Down` and `Status` go straight to the migrator.
pub async fn orchestrate_migration(
    settings: &DatabaseSettings,
    command: MigrationCommand,
) -> Result<(), DbInfraError> {
    let spec = StorageSpec::resolve(settings)?;
    prepare_storage_dir(&spec)?;
    let conn = open_storage(&spec).await?;

    match command {
        MigrationCommand::Up => {
            migrate_schema(&conn, &spec).await?;
        }
        MigrationCommand::Down | MigrationCommand::Status => {
            migrate(&conn, command)
                .await
                .map_err(|e| DbInfraError::migration(format!("migration execution failed: {e}")))?;
        }
    }

    if let Err(e) = conn.close().await {
        warn!(error = %e, "failed to close connection after migration");
    }
    Ok(())
}
