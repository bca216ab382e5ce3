use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_profile")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub user_id: i32,
    pub primary_team_id: Option<i32>,
    #[sea_orm(unique)]
    pub box_username: Option<String>,
    pub is_internal: bool,
    pub sound_choice: bool,
    pub slack_id: Option<String>,
    pub asana_id: Option<String>,
    pub phone: Option<String>,
    pub extension_no: Option<String>,
    pub image_location: Option<String>,
    pub institution: Option<String>,
    pub dob: Option<Date>,
    pub doj: Option<Date>,
    pub emp_id: Option<String>,
    pub anniversary_date: Option<Date>,
    pub designation: Option<String>,
    pub created_date: Option<DateTimeUtc>,
    pub modified_date: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    User,

    #[sea_orm(
        belongs_to = "super::teams::Entity",
        from = "Column::PrimaryTeamId",
        to = "super::teams::Column::Id"
    )]
    PrimaryTeam,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
