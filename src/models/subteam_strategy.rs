use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subteam_strategy")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub subteam_id: i32,
    pub strategy_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::subteam::Entity",
        from = "Column::SubteamId",
        to = "super::subteam::Column::Id",
        on_delete = "Cascade"
    )]
    Subteam,

    #[sea_orm(
        belongs_to = "super::strategy::Entity",
        from = "Column::StrategyId",
        to = "super::strategy::Column::Id",
        on_delete = "Cascade"
    )]
    Strategy,
}

impl ActiveModelBehavior for ActiveModel {}
