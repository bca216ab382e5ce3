use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

/// Sous-équipe. `api_user_id` est le compte utilisé par la sous-équipe
/// pour appeler l'API (création de process via api_post).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subteam")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    pub api_user_id: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::ApiUserId",
        to = "super::users::Column::Id",
        on_delete = "SetNull"
    )]
    ApiUser,
}

impl ActiveModelBehavior for ActiveModel {}
