use backend::{startup_from, AppError, ConfigSource, SecretSource};
use migration::count_applied_migrations;
use sea_orm::{ConnectionTrait, DatabaseBackend, Statement};
use tempfile::TempDir;

use crate::common::{sqlite_yaml, write_config_file};

#[tokio::test]
async fn inline_config_bootstraps_sqlite_storage() {
    let tmp = TempDir::new().expect("temp dir");
    let source = ConfigSource::Inline(sqlite_yaml(tmp.path()));

    let state = startup_from(&source, Some("abc123".into()))
        .await
        .expect("startup");

    assert!(tmp.path().join("data").is_dir(), "storage directory created");
    assert_eq!(state.config.server.port, "6277");
    assert_eq!(state.security.secret().as_bytes(), b"abc123");
    assert_eq!(state.security.token_ttl.as_secs(), 72);
    assert_eq!(count_applied_migrations(state.db()).await.unwrap(), 1);

    let ok = state
        .db()
        .execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            "SELECT COUNT(*) FROM echos",
        ))
        .await;
    assert!(ok.is_ok(), "echos table should exist");
}

#[tokio::test]
async fn restart_against_existing_database_is_clean() {
    let tmp = TempDir::new().expect("temp dir");
    let source = write_config_file(tmp.path(), &sqlite_yaml(tmp.path()));

    let first = startup_from(&source, None).await.expect("first start");
    assert_eq!(first.security.secret().source(), SecretSource::Generated);
    let first_secret = first.security.secret().clone();
    first.db.close().await.expect("close");

    let second = startup_from(&source, None).await.expect("second start");
    assert_eq!(count_applied_migrations(second.db()).await.unwrap(), 1);
    assert_ne!(&first_secret, second.security.secret());
}

#[tokio::test]
async fn unknown_backend_aborts_before_touching_disk() {
    let tmp = TempDir::new().expect("temp dir");
    let yaml = sqlite_yaml(tmp.path()).replace("type: sqlite", "type: postgres");

    let err = startup_from(&ConfigSource::Inline(yaml), Some("s".into()))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::UnsupportedBackend { ref kind } if kind == "postgres"));
    assert!(!tmp.path().join("data").exists());
}

#[tokio::test]
async fn config_failure_stops_before_storage() {
    let tmp = TempDir::new().expect("temp dir");
    let source = ConfigSource::File(tmp.path().join("missing.yaml"));

    let err = startup_from(&source, None).await.unwrap_err();
    assert!(err.to_string().starts_with("read config failed: "), "{err}");
}

#[tokio::test]
async fn unwritable_storage_directory_is_a_filesystem_error() {
    let tmp = TempDir::new().expect("temp dir");
    // a regular file where the data directory should go
    std::fs::write(tmp.path().join("data"), b"not a directory").unwrap();

    let err = startup_from(&ConfigSource::Inline(sqlite_yaml(tmp.path())), None)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Filesystem { .. }), "{err}");
    assert!(err.to_string().starts_with("create database directory failed:"));
}
