// ============================================================================
// MODÈLE : PENDING PROCESS
// ============================================================================
//
// Description:
//   Copie de travail d'un process en attente d'approbation. Porte les mêmes
//   champs de configuration que `strategy`, tous optionnels.
//
// Cycle de vie:
//   1. Créé par un utilisateur staff (owner = demandeur), process_id = NULL
//   2. Modifié par PATCH; avec create_strategy un process DORMANT est créé
//      et process_id pointe dessus
//   3. Supprimé une seule fois par complete_pending_process
//
// Points d'attention:
//   - Si process_id n'est pas NULL, les PATCH modifient le process lui-même
//
// ============================================================================

use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pending_process")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub owner_id: i32,
    pub process_id: Option<i32>,
    pub box_id: Option<i32>,
    pub e_region_id: Option<i32>,
    pub team_id: Option<i32>,
    pub currency_id: Option<i32>,
    pub cpu: Option<i32>,
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
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    Owner,

    #[sea_orm(
        belongs_to = "super::strategy::Entity",
        from = "Column::ProcessId",
        to = "super::strategy::Column::Id",
        on_delete = "SetNull"
    )]
    Process,
}

impl Related<super::strategy::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Process.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
