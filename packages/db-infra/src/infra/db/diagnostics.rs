//! Process-wide bootstrap counters, logged as one line per migrate run.

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    SchemaCheck,
    FastPathHit,
    FastPathMiss,
    MigratorRan,
    TablesCreated,
    ColumnsAdded,
    LockAcquired,
    LockTimeout,
    MigrationFailed,
}

impl Counter {
    pub const ALL: [Counter; 9] = [
        Counter::SchemaCheck,
        Counter::FastPathHit,
        Counter::FastPathMiss,
        Counter::MigratorRan,
        Counter::TablesCreated,
        Counter::ColumnsAdded,
        Counter::LockAcquired,
        Counter::LockTimeout,
        Counter::MigrationFailed,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Counter::SchemaCheck => "schema_checks",
            Counter::FastPathHit => "fast_path_hits",
            Counter::FastPathMiss => "fast_path_misses",
            Counter::MigratorRan => "migrator_runs",
            Counter::TablesCreated => "tables_created",
            Counter::ColumnsAdded => "columns_added",
            Counter::LockAcquired => "locks_acquired",
            Counter::LockTimeout => "lock_timeouts",
            Counter::MigrationFailed => "migrations_failed",
        }
    }
}

#[allow(clippy::declare_interior_mutable_const)]
const ZERO: AtomicUsize = AtomicUsize::new(0);
static COUNTS: [AtomicUsize; Counter::ALL.len()] = [ZERO; Counter::ALL.len()];

pub fn add(counter: Counter, n: usize) {
    COUNTS[counter as usize].fetch_add(n, Ordering::Relaxed);
}

pub fn incr(counter: Counter) {
    add(counter, 1);
}

pub fn get(counter: Counter) -> usize {
    COUNTS[counter as usize].load(Ordering::Relaxed)
}

pub fn log_snapshot(context: &str) {
    let counters = Counter::ALL
        .iter()
        .map(|c| format!("{}={}", c.name(), get(*c)))
        .collect::<Vec<_>>()
        .join(" ");
    info!(context, counters = %counters, "db bootstrap counters");
}
