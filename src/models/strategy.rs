use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

/// État d'un process. Un process créé depuis un pending reste DORMANT
/// jusqu'à sa publication (complete_pending_process avec mark_active).
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "UPPERCASE")]
pub enum ProcessState {
    #[sea_orm(string_value = "ACTIVE")]
    Active,
    #[sea_orm(string_value = "DORMANT")]
    Dormant,
    #[sea_orm(string_value = "INACTIVE")]
    Inactive,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "strategy")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    pub state: ProcessState,
    pub owner_id: i32,
    pub box_id: i32,
    pub e_region_id: i32,
    pub team_id: Option<i32>,
    pub currency_id: Option<i32>,
    pub cpu: Option<i32>, // coeur CPU réservé sur la box
    pub config_path: Option<String>,
    pub description: Option<String>,
    pub created_date: DateTimeUtc,
    pub modified_date: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::OwnerId",
        to = "super::users::Column::Id"
    )]
    Owner,

    #[sea_orm(
        belongs_to = "super::boxes::Entity",
        from = "Column::BoxId",
        to = "super::boxes::Column::Id"
    )]
    Box,

    #[sea_orm(
        belongs_to = "super::region::Entity",
        from = "Column::ERegionId",
        to = "super::region::Column::Id"
    )]
    ERegion,

    #[sea_orm(
        belongs_to = "super::teams::Entity",
        from = "Column::TeamId",
        to = "super::teams::Column::Id"
    )]
    Team,

    #[sea_orm(
        belongs_to = "super::currency::Entity",
        from = "Column::CurrencyId",
        to = "super::currency::Column::Id"
    )]
    Currency,

    #[sea_orm(has_one = "super::kill_switch::Entity")]
    KillSwitch,

    #[sea_orm(has_one = "super::pnl_info::Entity")]
    PnlInfo,

    #[sea_orm(has_many = "super::error_mail::Entity")]
    ErrorMail,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::boxes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Box.def()
    }
}

impl Related<super::region::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ERegion.def()
    }
}

impl Related<super::teams::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Team.def()
    }
}

impl Related<super::currency::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Currency.def()
    }
}

impl Related<super::kill_switch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::KillSwitch.def()
    }
}

impl Related<super::pnl_info::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PnlInfo.def()
    }
}

impl Related<super::error_mail::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ErrorMail.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
