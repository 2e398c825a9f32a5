use db_infra::entities::{Images, KeyValues};
use db_infra::{migrate_schema, open_storage, StorageSpec};
use migration::{count_applied_migrations, get_latest_migration_version, Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, DatabaseBackend, EntityTrait, QueryOrder, Statement};
use tempfile::TempDir;

use crate::common::{count_rows, exec, seed_v1_dataset, sqlite_settings, V1_USERS_TABLE};

const LEGACY_MIGRATION: &str = "m20250601_000001_legacy_v1_upgrade";

#[tokio::test]
async fn upgrades_v1_messages_into_echos_and_images() {
    let tmp = TempDir::new().expect("temp dir");
    let spec = StorageSpec::resolve(&sqlite_settings(tmp.path(), "ech0.db")).unwrap();
    let conn = open_storage(&spec).await.expect("open");
    seed_v1_dataset(&conn).await;

    migrate_schema(&conn, &spec).await.expect("migrate");

    assert_eq!(count_rows(&conn, "echos").await, 3);
    assert_eq!(count_rows(&conn, "images").await, 2);
    // the v1 table is left in place
    assert_eq!(count_rows(&conn, "messages").await, 3);

    let images = Images::find()
        .order_by_asc(db_infra::entities::images::Column::MessageId)
        .all(&conn)
        .await
        .expect("load images");
    assert_eq!(images[0].message_id, 1);
    assert_eq!(images[0].image_url.as_deref(), Some("/images/a.png"));
    assert_eq!(images[1].message_id, 3);
    assert_eq!(images[1].image_source.as_deref(), Some("url"));

    let row = conn
        .query_one(Statement::from_string(
            DatabaseBackend::Sqlite,
            "SELECT content, layout, private, fav_count FROM echos WHERE id = 2",
        ))
        .await
        .unwrap()
        .expect("echo 2 copied with its id");
    assert_eq!(row.try_get::<String>("", "content").unwrap(), "no picture");
    assert_eq!(row.try_get::<String>("", "layout").unwrap(), "waterfall");
    assert!(row.try_get::<bool>("", "private").unwrap());
    assert_eq!(row.try_get::<i32>("", "fav_count").unwrap(), 0);

    assert_eq!(
        get_latest_migration_version(&conn).await.unwrap().as_deref(),
        Some(LEGACY_MIGRATION)
    );
}

#[tokio::test]
async fn second_run_does_not_duplicate_upgraded_rows() {
    let tmp = TempDir::new().expect("temp dir");
    let spec = StorageSpec::resolve(&sqlite_settings(tmp.path(), "ech0.db")).unwrap();
    let conn = open_storage(&spec).await.expect("open");
    seed_v1_dataset(&conn).await;

    migrate_schema(&conn, &spec).await.expect("migrate-1");
    let echos = count_rows(&conn, "echos").await;
    let images = count_rows(&conn, "images").await;

    migrate_schema(&conn, &spec).await.expect("migrate-2");
    assert_eq!(count_rows(&conn, "echos").await, echos);
    assert_eq!(count_rows(&conn, "images").await, images);
}

#[tokio::test]
async fn rerun_without_marker_still_does_not_duplicate() {
    let tmp = TempDir::new().expect("temp dir");
    let spec = StorageSpec::resolve(&sqlite_settings(tmp.path(), "ech0.db")).unwrap();
    let conn = open_storage(&spec).await.expect("open");
    seed_v1_dataset(&conn).await;

    migrate_schema(&conn, &spec).await.expect("migrate-1");

    // drop the marker so the upgrade body runs a second time
    Migrator::down(&conn, None).await.expect("down");
    assert_eq!(count_applied_migrations(&conn).await.unwrap(), 0);

    migrate_schema(&conn, &spec).await.expect("migrate-2");
    assert_eq!(count_applied_migrations(&conn).await.unwrap(), 1);
    assert_eq!(count_rows(&conn, "echos").await, 3);
    assert_eq!(count_rows(&conn, "images").await, 2);
}

#[tokio::test]
async fn fresh_install_records_marker_without_data() {
    let tmp = TempDir::new().expect("temp dir");
    let spec = StorageSpec::resolve(&sqlite_settings(tmp.path(), "ech0.db")).unwrap();
    let conn = open_storage(&spec).await.expect("open");

    migrate_schema(&conn, &spec).await.expect("migrate");

    assert_eq!(count_applied_migrations(&conn).await.unwrap(), 1);
    assert_eq!(count_rows(&conn, "echos").await, 0);
    assert!(KeyValues::find().all(&conn).await.unwrap().is_empty());
}

#[tokio::test]
async fn rejected_v1_rows_do_not_block_startup() {
    let tmp = TempDir::new().expect("temp dir");
    let spec = StorageSpec::resolve(&sqlite_settings(tmp.path(), "ech0.db")).unwrap();
    let conn = open_storage(&spec).await.expect("open");
    exec(&conn, V1_USERS_TABLE).await;
    // some 1.x builds left content nullable
    exec(
        &conn,
        "CREATE TABLE messages (id INTEGER PRIMARY KEY AUTOINCREMENT, content TEXT, \
         username VARCHAR(100), image_url TEXT, image_source VARCHAR(20), private NUMERIC DEFAULT false, \
         user_id INTEGER NOT NULL, extension TEXT, extension_type VARCHAR(10), created_at DATETIME)",
    )
    .await;
    exec(
        &conn,
        "INSERT INTO messages (id, content, image_url, image_source, private, user_id) VALUES \
         (1, 'kept', '/images/a.png', 'local', 0, 1), \
         (2, NULL, '', '', 0, 1)",
    )
    .await;

    migrate_schema(&conn, &spec).await.expect("migrate");

    // the copy is one statement, so nothing lands and the marker is still recorded
    assert_eq!(count_applied_migrations(&conn).await.unwrap(), 1);
    assert_eq!(count_rows(&conn, "echos").await, 0);
    assert_eq!(count_rows(&conn, "images").await, 0);
    assert_eq!(count_rows(&conn, "messages").await, 2);

    // once the bad row is fixed, rerunning the upgrade picks everything up
    exec(&conn, "UPDATE messages SET content = '' WHERE id = 2").await;
    Migrator::down(&conn, None).await.expect("down");
    migrate_schema(&conn, &spec).await.expect("migrate-2");
    assert_eq!(count_rows(&conn, "echos").await, 2);
    assert_eq!(count_rows(&conn, "images").await, 1);
}
