#![allow(dead_code)]

use std::path::Path;

use db_infra::DatabaseSettings;
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};

// Logging is auto-installed for every test binary
#[ctor::ctor]
fn init_logging() {
    backend_test_support::logging::init();
}

/// SQLite settings for a database file under `dir`.
pub fn sqlite_settings(dir: &Path, relative: &str) -> DatabaseSettings {
    DatabaseSettings {
        kind: "sqlite".to_string(),
        path: dir.join(relative).to_string_lossy().into_owned(),
    }
}

pub async fn exec(db: &DatabaseConnection, sql: &str) {
    db.execute(Statement::from_string(db.get_database_backend(), sql))
        .await
        .unwrap_or_else(|e| panic!("statement failed: {sql}: {e}"));
}

pub async fn count_rows(db: &DatabaseConnection, table: &str) -> i64 {
    let row = db
        .query_one(Statement::from_string(
            db.get_database_backend(),
            format!("SELECT COUNT(*) AS cnt FROM {table}"),
        ))
        .await
        .expect("count query")
        .expect("count row");
    row.try_get::<i64>("", "cnt").expect("count value")
}

/// Table and index definitions as SQLite stores them, for schema comparisons.
pub async fn sqlite_schema(db: &DatabaseConnection) -> Vec<String> {
    let rows = db
        .query_all(Statement::from_string(
            db.get_database_backend(),
            "SELECT type || ':' || name || ':' || COALESCE(sql, '') AS entry \
             FROM sqlite_master WHERE name NOT LIKE 'sqlite_%' ORDER BY type, name",
        ))
        .await
        .expect("schema query");
    rows.iter()
        .map(|row| row.try_get::<String>("", "entry").expect("schema entry"))
        .collect()
}

/// Shape of the `messages` table written by 1.x releases.
pub const V1_MESSAGES_TABLE: &str = "CREATE TABLE messages (\
    id INTEGER PRIMARY KEY AUTOINCREMENT, \
    content TEXT NOT NULL, \
    username VARCHAR(100), \
    image_url TEXT, \
    image_source VARCHAR(20), \
    private NUMERIC DEFAULT false, \
    user_id INTEGER NOT NULL, \
    extension TEXT, \
    extension_type VARCHAR(10), \
    created_at DATETIME)";

/// Shape of the `users` table written by 1.x releases (no avatar column).
pub const V1_USERS_TABLE: &str = "CREATE TABLE users (\
    id INTEGER PRIMARY KEY AUTOINCREMENT, \
    username VARCHAR(100) NOT NULL UNIQUE, \
    password VARCHAR(100) NOT NULL, \
    is_admin NUMERIC DEFAULT false)";

pub async fn seed_v1_dataset(db: &DatabaseConnection) {
    exec(db, V1_USERS_TABLE).await;
    exec(db, V1_MESSAGES_TABLE).await;
    exec(
        db,
        "INSERT INTO users (id, username, password, is_admin) VALUES (1, 'admin', 'hash', 1)",
    )
    .await;
    exec(
        db,
        "INSERT INTO messages (id, content, username, image_url, image_source, private, user_id, created_at) VALUES \
         (1, 'first post', 'admin', '/images/a.png', 'local', 0, 1, '2024-03-01 10:00:00'), \
         (2, 'no picture', 'admin', '', '', 1, 1, '2024-03-02 10:00:00'), \
         (3, 'remote picture', 'admin', 'https://cdn.example.com/b.jpg', 'url', 0, 1, NULL)",
    )
    .await;
}
