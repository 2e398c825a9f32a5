use sea_orm_migration::prelude::*;

/// Table that held posts before the 2.x data model split images out.
pub const LEGACY_TABLE: &str = "messages";

/// Layout assigned to echos converted from v1 messages.
pub const DEFAULT_LAYOUT: &str = "waterfall";

#[derive(DeriveMigrationName)]
pub struct Migration;

// ----- Iden enums for tables & columns -----
#[derive(DeriveIden)]
enum Messages {
    Table,
    Id,
    Content,
    Username,
    ImageUrl,
    ImageSource,
    Private,
    UserId,
    Extension,
    ExtensionType,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Echos {
    Table,
    Id,
    Content,
    Username,
    Layout,
    Private,
    UserId,
    Extension,
    ExtensionType,
    FavCount,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Images {
    Table,
    MessageId,
    ImageUrl,
    ImageSource,
}

/// v1 rows with an image that has not been copied into `images` yet.
fn copy_images() -> Result<InsertStatement, DbErr> {
    let pending = Query::select()
        .columns([Messages::Id, Messages::ImageUrl, Messages::ImageSource])
        .from(Messages::Table)
        .and_where(Expr::col(Messages::ImageUrl).is_not_null())
        .and_where(Expr::col(Messages::ImageUrl).ne(""))
        .and_where(
            Expr::col(Messages::Id).not_in_subquery(
                Query::select()
                    .column(Images::MessageId)
                    .from(Images::Table)
                    .to_owned(),
            ),
        )
        .to_owned();

    Query::insert()
        .into_table(Images::Table)
        .columns([Images::MessageId, Images::ImageUrl, Images::ImageSource])
        .select_from(pending)
        .map(|stmt| stmt.to_owned())
        .map_err(|e| DbErr::Migration(format!("failed to build image copy: {e}")))
}

/// v1 rows whose id is not present in `echos` yet. Ids are preserved so
/// image rows keep pointing at the right echo.
fn copy_echos() -> Result<InsertStatement, DbErr> {
    let pending = Query::select()
        .columns([Messages::Id, Messages::Content, Messages::Username])
        .expr(Expr::val(DEFAULT_LAYOUT))
        .columns([
            Messages::Private,
            Messages::UserId,
            Messages::Extension,
            Messages::ExtensionType,
        ])
        .expr(Expr::val(0))
        .expr(Func::coalesce([
            Expr::col(Messages::CreatedAt).into(),
            Expr::current_timestamp().into(),
        ]))
        .from(Messages::Table)
        .and_where(
            Expr::col(Messages::Id).not_in_subquery(
                Query::select()
                    .column(Echos::Id)
                    .from(Echos::Table)
                    .to_owned(),
            ),
        )
        .to_owned();

    Query::insert()
        .into_table(Echos::Table)
        .columns([
            Echos::Id,
            Echos::Content,
            Echos::Username,
            Echos::Layout,
            Echos::Private,
            Echos::UserId,
            Echos::Extension,
            Echos::ExtensionType,
            Echos::FavCount,
            Echos::CreatedAt,
        ])
        .select_from(pending)
        .map(|stmt| stmt.to_owned())
        .map_err(|e| DbErr::Migration(format!("failed to build echo copy: {e}")))
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        if !manager.has_table(LEGACY_TABLE).await? {
            tracing::info!(legacy = "absent", table = LEGACY_TABLE, "no v1 data to upgrade");
            return Ok(());
        }

        // The target tables come from the schema sync, which always runs first.
        for table in ["echos", "images"] {
            if !manager.has_table(table).await? {
                return Err(DbErr::Migration(format!(
                    "legacy upgrade needs table '{table}' but it does not exist"
                )));
            }
        }

        let db = manager.get_connection();
        let backend = manager.get_database_backend();

        // Best effort: a v1 row the new schema rejects must not block startup.
        // Each copy is a single statement, so a failure copies nothing.
        // echos first: images.message_id references echos.id
        let echos = match db.execute(backend.build(&copy_echos()?)).await {
            Ok(res) => res.rows_affected(),
            Err(e) => {
                tracing::warn!(
                    legacy = "skipped",
                    stage = "echos",
                    error = %e,
                    "v1 messages not upgraded"
                );
                return Ok(());
            }
        };
        let images = match db.execute(backend.build(&copy_images()?)).await {
            Ok(res) => res.rows_affected(),
            Err(e) => {
                tracing::warn!(
                    legacy = "skipped",
                    stage = "images",
                    echos_copied = echos,
                    error = %e,
                    "v1 images not upgraded"
                );
                return Ok(());
            }
        };

        tracing::info!(
            legacy = "upgraded",
            echos_copied = echos,
            images_copied = images,
            "v1 messages upgraded"
        );

        Ok(())
    }

    async fn down(&self, _manager: &SchemaManager) -> Result<(), DbErr> {
        // Upgraded rows may have been edited since; the v1 table is left in place.
        tracing::warn!(legacy = "down", "legacy upgrade is not reversible, nothing to undo");
        Ok(())
    }
}
