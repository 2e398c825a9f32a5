use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Image attached to an echo. The foreign key keeps its historical name
/// `message_id` from the 1.x data model.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "images")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(column_name = "message_id", indexed)]
    pub message_id: i32,
    #[sea_orm(column_name = "image_url", column_type = "Text")]
    pub image_url: Option<String>,
    #[sea_orm(column_name = "image_source")]
    pub image_source: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::echos::Entity",
        from = "Column::MessageId",
        to = "super::echos::Column::Id",
        on_delete = "Cascade"
    )]
    Echo,
}

impl Related<super::echos::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Echo.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
