use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "echos")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub username: Option<String>,
    #[sea_orm(default_value = "waterfall")]
    pub layout: String,
    #[sea_orm(default_value = false)]
    pub private: bool,
    #[sea_orm(column_name = "user_id", indexed)]
    pub user_id: i32,
    #[sea_orm(column_type = "Text")]
    pub extension: Option<String>,
    #[sea_orm(column_name = "extension_type")]
    pub extension_type: Option<String>,
    #[sea_orm(column_name = "fav_count", default_value = 0)]
    pub fav_count: i32,
    #[sea_orm(column_name = "created_at")]
    pub created_at: OffsetDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::images::Entity")]
    Images,
}

impl Related<super::images::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Images.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
