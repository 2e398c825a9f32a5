//! Declarative schema sync.
//!
//! Every entity in [`crate::entities`] gets a table whose columns are a
//! superset of the entity's fields. Missing tables are created from the
//! entity definition, missing columns are added. Nothing is ever dropped,
//! renamed or rewritten, so running this on every startup is safe.

use migration::SchemaManager;
use sea_orm::sea_query::{Alias, ColumnDef, ColumnSpec, ColumnType, Expr, Index, SimpleExpr, Table};
use sea_orm::{
    ConnectionTrait, DatabaseBackend, DatabaseConnection, DbErr, EntityName, EntityTrait,
    IdenStatic, Iterable, Schema,
};
use tracing::{debug, info, warn};

use crate::entities::{connecteds, echos, images, key_values, todos, users};
use crate::error::DbInfraError;
use crate::infra::db::diagnostics::{self, Counter};

/// What a sync run changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub tables_created: Vec<String>,
    /// `table.column` for every column added to an existing table
    pub columns_added: Vec<String>,
}

impl SyncReport {
    pub fn is_noop(&self) -> bool {
        self.tables_created.is_empty() && self.columns_added.is_empty()
    }
}

fn sync_err(table: &str, e: DbErr) -> DbInfraError {
    DbInfraError::migration(format!("schema sync of '{table}' failed: {e}"))
}

/// Bring every entity table up to date. Order matters: referenced tables
/// are created before the tables holding foreign keys to them.
pub async fn sync_schema(db: &DatabaseConnection) -> Result<SyncReport, DbInfraError> {
    let mut report = SyncReport::default();

    sync_entity(db, users::Entity, &mut report).await?;
    sync_entity(db, echos::Entity, &mut report).await?;
    sync_entity(db, images::Entity, &mut report).await?;
    sync_entity(db, key_values::Entity, &mut report).await?;
    sync_entity(db, todos::Entity, &mut report).await?;
    sync_entity(db, connecteds::Entity, &mut report).await?;

    diagnostics::add(Counter::TablesCreated, report.tables_created.len());
    diagnostics::add(Counter::ColumnsAdded, report.columns_added.len());
    let outcome = if report.is_noop() { "noop" } else { "applied" };
    info!(
        schema_sync = outcome,
        tables_created = ?report.tables_created,
        columns_added = ?report.columns_added,
        "schema sync finished"
    );

    Ok(report)
}

async fn sync_entity<E>(
    db: &DatabaseConnection,
    entity: E,
    report: &mut SyncReport,
) -> Result<(), DbInfraError>
where
    E: EntityTrait,
{
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    let manager = SchemaManager::new(db);
    let table = entity.table_name();

    let exists = manager
        .has_table(table)
        .await
        .map_err(|e| sync_err(table, e))?;

    if !exists {
        let mut create = schema.create_table_from_entity(entity);
        create.if_not_exists();
        db.execute(backend.build(&create))
            .await
            .map_err(|e| sync_err(table, e))?;

        for index in schema.create_index_from_entity(entity) {
            db.execute(backend.build(&index))
                .await
                .map_err(|e| sync_err(table, e))?;
        }

        debug!(table, "table created");
        report.tables_created.push(table.to_string());
        return Ok(());
    }

    let mut altered = false;
    for column in E::Column::iter() {
        let name = column.as_str();
        let present = manager
            .has_column(table, name)
            .await
            .map_err(|e| sync_err(table, e))?;
        if present {
            continue;
        }

        let full = schema.get_column_def::<E>(column);
        let (mut def, unique) = match backend {
            DatabaseBackend::Sqlite => sqlite_addable_column(&full),
            _ => (full, false),
        };
        let alter = Table::alter().table(entity).add_column(&mut def).to_owned();
        db.execute(backend.build(&alter))
            .await
            .map_err(|e| sync_err(table, e))?;

        if unique {
            let index = Index::create()
                .if_not_exists()
                .name(format!("idx-{table}-{name}-unique"))
                .table(entity)
                .col(column)
                .unique()
                .to_owned();
            db.execute(backend.build(&index))
                .await
                .map_err(|e| sync_err(table, e))?;
        }

        debug!(table, column = name, unique, "column added");
        report.columns_added.push(format!("{table}.{name}"));
        altered = true;
    }

    // indexes on columns that were just added
    if altered && backend == DatabaseBackend::Sqlite {
        for mut index in schema.create_index_from_entity(entity) {
            index.if_not_exists();
            db.execute(backend.build(&index))
                .await
                .map_err(|e| sync_err(table, e))?;
        }
    }

    Ok(())
}

/// SQLite refuses `ADD COLUMN` for UNIQUE columns and for NOT NULL columns
/// without a constant default. Unique columns are added nullable and get a
/// separate unique index (the returned flag); other NOT NULL columns get the
/// zero value of their type as default. Existing rows are never rejected.
fn sqlite_addable_column(full: &ColumnDef) -> (ColumnDef, bool) {
    let col_type = full.get_column_type().cloned().unwrap_or(ColumnType::Text);
    let mut def = ColumnDef::new_with_type(Alias::new(full.get_column_name()), col_type.clone());

    let mut not_null = false;
    let mut default = None;
    let mut unique = false;
    for spec in full.get_column_spec() {
        match spec {
            ColumnSpec::NotNull => not_null = true,
            ColumnSpec::Default(value) => default = Some(value.clone()),
            ColumnSpec::UniqueKey => unique = true,
            _ => {}
        }
    }

    if unique {
        return (def, true);
    }

    if not_null {
        match default.or_else(|| zero_value(&col_type)) {
            Some(value) => {
                def.not_null().default(value);
            }
            None => warn!(
                column = %full.get_column_name(),
                "no zero value for column type, adding it as nullable"
            ),
        }
    } else if let Some(value) = default {
        def.default(value);
    }

    (def, false)
}

/// Constant default standing in for existing rows. SQLite does not accept
/// CURRENT_TIMESTAMP in `ADD COLUMN`, so time columns start at the epoch.
fn zero_value(col_type: &ColumnType) -> Option<SimpleExpr> {
    let value = match col_type {
        ColumnType::Char(_) | ColumnType::String(_) | ColumnType::Text => Expr::val(""),
        ColumnType::TinyInteger
        | ColumnType::SmallInteger
        | ColumnType::Integer
        | ColumnType::BigInteger
        | ColumnType::TinyUnsigned
        | ColumnType::SmallUnsigned
        | ColumnType::Unsigned
        | ColumnType::BigUnsigned
        | ColumnType::Float
        | ColumnType::Double
        | ColumnType::Decimal(_) => Expr::val(0),
        ColumnType::Boolean => Expr::val(false),
        ColumnType::DateTime | ColumnType::Timestamp | ColumnType::TimestampWithTimeZone => {
            Expr::val("1970-01-01 00:00:00+00:00")
        }
        ColumnType::Date => Expr::val("1970-01-01"),
        ColumnType::Time => Expr::val("00:00:00"),
        _ => return None,
    };
    Some(value.into())
}
