pub mod core;
pub mod diagnostics;
pub mod locking;
pub mod schema_sync;

pub use core::{bootstrap_storage, build_admin_pool, migrate_schema, open_storage, orchestrate_migration};
pub use diagnostics::Counter;
pub use locking::{BootstrapLock, Guard, MySqlNamedLock, SqliteFileLock};
