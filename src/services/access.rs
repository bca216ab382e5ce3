// ============================================================================
// POLITIQUE D'ACCÈS
// ============================================================================
//
// Description:
//   Les droits sont évalués par requête contre un Principal (utilisateur +
//   sous-équipes), au lieu de filtres codés en dur dans chaque route.
//
// Règles:
//   - StagePendingProcess : utilisateurs staff uniquement
//   - SubteamStrategyApi  : comptes API d'une sous-équipe uniquement
//   - ManageUsers         : staff uniquement (écriture users / groups)
//   - Visibilité des process: si une sous-équipe "recon" existe et que
//     l'utilisateur en fait partie, il ne voit que les process rattachés à
//     ses sous-équipes recon. Sinon tous les process sont visibles.
//
// Points d'attention:
//   - La règle recon est conservée telle quelle, son intention métier reste
//     à confirmer (voir DESIGN.md)
//
// ============================================================================

use sea_orm::sea_query::{Expr, Func};
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, Select};

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::{strategy, subteam, subteam_member, subteam_strategy, users};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    StagePendingProcess,
    SubteamStrategyApi,
    ManageUsers,
}

/// Utilisateur courant et ses sous-équipes
#[derive(Debug, Clone)]
pub struct Principal {
    pub user: users::Model,
    /// Sous-équipe pour laquelle ce compte appelle l'API
    pub api_subteam: Option<subteam::Model>,
    pub member_subteams: Vec<subteam::Model>,
}

impl Principal {
    /// Charge le principal depuis la base; un compte supprimé ou désactivé
    /// est refusé même avec un token encore valide.
    pub async fn load<C: ConnectionTrait>(db: &C, auth: &AuthUser) -> Result<Self, ApiError> {
        let user = users::Entity::find_by_id(auth.user_id)
            .one(db)
            .await?
            .filter(|user| user.is_active)
            .ok_or_else(|| ApiError::Unauthorized("User not found or inactive".to_string()))?;

        let api_subteam = subteam::Entity::find()
            .filter(subteam::Column::ApiUserId.eq(user.id))
            .one(db)
            .await?;

        let subteam_ids: Vec<i32> = subteam_member::Entity::find()
            .filter(subteam_member::Column::UserId.eq(user.id))
            .all(db)
            .await?
            .into_iter()
            .map(|member| member.subteam_id)
            .collect();

        let member_subteams = if subteam_ids.is_empty() {
            Vec::new()
        } else {
            subteam::Entity::find()
                .filter(subteam::Column::Id.is_in(subteam_ids))
                .all(db)
                .await?
        };

        Ok(Self {
            user,
            api_subteam,
            member_subteams,
        })
    }

    pub fn user_id(&self) -> i32 {
        self.user.id
    }

    pub fn can(&self, capability: Capability) -> bool {
        match capability {
            Capability::StagePendingProcess | Capability::ManageUsers => self.user.is_staff,
            Capability::SubteamStrategyApi => self.api_subteam.is_some(),
        }
    }

    pub fn require(&self, capability: Capability) -> Result<(), ApiError> {
        if self.can(capability) {
            Ok(())
        } else {
            Err(ApiError::PermissionDenied(
                "You do not have permission to perform this action.".to_string(),
            ))
        }
    }
}

/// Ensemble des process visibles par un principal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyScope {
    All,
    Only(Vec<i32>),
}

impl StrategyScope {
    pub fn apply(&self, select: Select<strategy::Entity>) -> Select<strategy::Entity> {
        match self {
            StrategyScope::All => select,
            StrategyScope::Only(ids) => select.filter(strategy::Column::Id.is_in(ids.clone())),
        }
    }
}

fn is_recon(subteam: &subteam::Model) -> bool {
    subteam.name.to_lowercase().contains("recon")
}

pub async fn strategy_scope<C: ConnectionTrait>(db: &C, principal: &Principal) -> Result<StrategyScope, DbErr> {
    let recon_count = subteam::Entity::find()
        .filter(Expr::expr(Func::lower(Expr::col(subteam::Column::Name))).like("%recon%"))
        .count(db)
        .await?;
    if recon_count == 0 {
        return Ok(StrategyScope::All);
    }

    let recon_ids: Vec<i32> = principal
        .member_subteams
        .iter()
        .filter(|subteam| is_recon(subteam))
        .map(|subteam| subteam.id)
        .collect();
    if recon_ids.is_empty() {
        return Ok(StrategyScope::All);
    }

    let strategy_ids = subteam_strategy::Entity::find()
        .filter(subteam_strategy::Column::SubteamId.is_in(recon_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|link| link.strategy_id)
        .collect();

    Ok(StrategyScope::Only(strategy_ids))
}
