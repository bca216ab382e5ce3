// ============================================================================
// SERVICE : PENDING PROCESS
// ============================================================================
//
// Description:
//   Workflow d'approbation d'un process:
//   STAGED (process_id NULL) -> LINKED (process DORMANT créé) -> supprimé
//   à la complétion, avec passage ACTIVE si demandé.
//
// Points d'attention:
//   - create_strategy + rattachement: une seule transaction
//   - complétion: activation + suppression dans une seule transaction
//   - un pending lié modifie directement le process
//
// ============================================================================

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde_json::Value;
use validator::Validate;

use crate::error::{ApiError, FieldErrors};
use crate::models::dto::{
    ErrorMailSummary, FormattedEntry, PendingActions, PendingActionsQuery, PendingProcessCreate,
    PendingProcessPatch, PendingUpdateRequest, StrategyDraft, StrategyPatch,
};
use crate::models::strategy::{self, ProcessState};
use crate::models::{
    bin_release, error_mail, kill_switch, pending_process, phl_name_mapping, pnl_info, pnl_limits,
    strategy_user_mapping, subteam, subteam_strategy, unit_test_config,
};
use crate::services::access::{Capability, Principal, StrategyScope};
use crate::services::strategy_service::{check_references, References, StrategyService};

pub struct PendingProcessService;

impl PendingProcessService {
    /// Enregistre une demande; le propriétaire est toujours le demandeur
    pub async fn stage(
        db: &DatabaseConnection,
        principal: &Principal,
        payload: PendingProcessCreate,
    ) -> Result<pending_process::Model, ApiError> {
        principal.require(Capability::StagePendingProcess)?;
        let mut errors = match payload.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => e.into(),
        };
        check_references(
            db,
            References {
                box_id: payload.box_id,
                e_region_id: payload.e_region_id,
                team_id: payload.team_id,
                currency_id: payload.currency_id,
                ..Default::default()
            },
            &mut errors,
        )
        .await?;
        errors.into_result()?;

        let now = Utc::now();
        let pending = pending_process::ActiveModel {
            name: Set(payload.name),
            owner_id: Set(principal.user_id()),
            process_id: Set(None),
            box_id: Set(payload.box_id),
            e_region_id: Set(payload.e_region_id),
            team_id: Set(payload.team_id),
            currency_id: Set(payload.currency_id),
            cpu: Set(payload.cpu),
            config_path: Set(payload.config_path),
            description: Set(payload.description),
            created_date: Set(now),
            modified_date: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;

        tracing::info!(pending_id = pending.id, owner = principal.user_id(), "Pending process staged");
        Ok(pending)
    }

    pub async fn partial_update(
        db: &DatabaseConnection,
        pending: pending_process::Model,
        request: PendingUpdateRequest,
    ) -> Result<pending_process::Model, ApiError> {
        if request.patch.is_empty() && !request.create_strategy {
            return Err(ApiError::BadRequest("No changes provided".to_string()));
        }
        let patch = Value::Object(request.patch);

        // 1. Pending déjà lié: on modifie le process
        if let Some(process_id) = pending.process_id {
            let current = strategy::Entity::find_by_id(process_id)
                .one(db)
                .await?
                .ok_or_else(|| ApiError::not_found("Strategy", process_id))?;
            let strategy_patch: StrategyPatch = parse_patch(patch)?;
            StrategyService::update(db, current, strategy_patch).await?;
            return Ok(pending);
        }

        // 2. Création du process DORMANT et rattachement, atomiques
        if request.create_strategy {
            let strategy_patch: StrategyPatch = parse_patch(patch)?;
            let mut draft = StrategyDraft::from_pending(&pending).overlay(strategy_patch);
            draft.state = Some(ProcessState::Dormant);

            let txn = db.begin().await?;
            let owner_id = pending.owner_id;
            let created = StrategyService::create(&txn, draft, owner_id).await?;

            let mut active: pending_process::ActiveModel = pending.into();
            active.process_id = Set(Some(created.id));
            active.modified_date = Set(Utc::now());
            let linked = active.update(&txn).await?;
            txn.commit().await?;

            tracing::info!(pending_id = linked.id, strategy_id = created.id, "Pending process linked");
            return Ok(linked);
        }

        // 3. Sinon on modifie le pending lui-même
        let pending_patch: PendingProcessPatch = parse_patch(patch)?;
        let mut errors = match pending_patch.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => e.into(),
        };
        check_references(
            db,
            References {
                box_id: pending_patch.box_id.flatten(),
                e_region_id: pending_patch.e_region_id.flatten(),
                team_id: pending_patch.team_id.flatten(),
                currency_id: pending_patch.currency_id.flatten(),
                ..Default::default()
            },
            &mut errors,
        )
        .await?;
        errors.into_result()?;

        let mut active: pending_process::ActiveModel = pending.into();
        if let Some(name) = pending_patch.name {
            active.name = Set(name);
        }
        if let Some(box_id) = pending_patch.box_id {
            active.box_id = Set(box_id);
        }
        if let Some(e_region_id) = pending_patch.e_region_id {
            active.e_region_id = Set(e_region_id);
        }
        if let Some(team_id) = pending_patch.team_id {
            active.team_id = Set(team_id);
        }
        if let Some(currency_id) = pending_patch.currency_id {
            active.currency_id = Set(currency_id);
        }
        if let Some(cpu) = pending_patch.cpu {
            active.cpu = Set(cpu);
        }
        if let Some(config_path) = pending_patch.config_path {
            active.config_path = Set(config_path);
        }
        if let Some(description) = pending_patch.description {
            active.description = Set(description);
        }
        active.modified_date = Set(Utc::now());

        Ok(active.update(db).await?)
    }

    /// Publie un pending: le process lié passe ACTIVE si demandé, puis le
    /// pending est supprimé. Rien n'est supprimé si la précondition échoue.
    pub async fn complete(
        db: &DatabaseConnection,
        pending: pending_process::Model,
        mark_active: bool,
    ) -> Result<(), ApiError> {
        if mark_active && pending.process_id.is_none() {
            return Err(ApiError::MissingLinkedStrategy(pending.name));
        }

        let txn = db.begin().await?;
        if mark_active {
            if let Some(process_id) = pending.process_id {
                let process = strategy::Entity::find_by_id(process_id)
                    .one(&txn)
                    .await?
                    .ok_or_else(|| ApiError::MissingLinkedStrategy(pending.name.clone()))?;
                let mut active: strategy::ActiveModel = process.into();
                active.state = Set(ProcessState::Active);
                active.modified_date = Set(Utc::now());
                active.update(&txn).await?;
            }
        }

        let pending_id = pending.id;
        pending.delete(&txn).await?;
        txn.commit().await?;

        tracing::info!(pending_id, mark_active, "Pending process completed");
        Ok(())
    }

    /// Résumé des objets rattachés à un process (écran de validation)
    pub async fn pending_actions(
        db: &DatabaseConnection,
        scope: &StrategyScope,
        query: PendingActionsQuery,
    ) -> Result<PendingActions, ApiError> {
        let raw_id = query
            .process_id
            .ok_or(ApiError::MissingParameter("process_id"))?;
        let process_type = query
            .process_type
            .ok_or(ApiError::MissingParameter("process_type"))?;
        if !process_type.eq_ignore_ascii_case("strategy") {
            return Err(ApiError::UnknownProcessType(process_type));
        }
        let process_id: i32 = raw_id
            .trim()
            .parse()
            .map_err(|_| ApiError::BadRequest(format!("Invalid process_id: {}", raw_id)))?;

        let process = scope
            .apply(strategy::Entity::find_by_id(process_id))
            .one(db)
            .await?
            .ok_or_else(|| ApiError::not_found("Strategy", process_id))?;

        let subteam_ids: Vec<i32> = subteam_strategy::Entity::find()
            .filter(subteam_strategy::Column::StrategyId.eq(process.id))
            .all(db)
            .await?
            .into_iter()
            .map(|link| link.subteam_id)
            .collect();
        let subteams = if subteam_ids.is_empty() {
            Vec::new()
        } else {
            subteam::Entity::find()
                .filter(subteam::Column::Id.is_in(subteam_ids))
                .all(db)
                .await?
        };

        let killswitch = process.find_related(kill_switch::Entity).one(db).await?;
        let error_mails = process.find_related(error_mail::Entity).all(db).await?;
        let pnl_info = process.find_related(pnl_info::Entity).one(db).await?;
        let pnl_limits = pnl_limits::Entity::find()
            .filter(pnl_limits::Column::StrategyId.eq(process.id))
            .one(db)
            .await?;
        let bin_releases = bin_release::Entity::find()
            .filter(bin_release::Column::StrategyId.eq(process.id))
            .all(db)
            .await?;
        let unit_tests = unit_test_config::Entity::find()
            .filter(unit_test_config::Column::StrategyId.eq(process.id))
            .all(db)
            .await?;
        let user_mappings = strategy_user_mapping::Entity::find()
            .filter(strategy_user_mapping::Column::StrategyId.eq(process.id))
            .all(db)
            .await?;
        let phl_mappings = phl_name_mapping::Entity::find()
            .filter(phl_name_mapping::Column::StrategyId.eq(process.id))
            .all(db)
            .await?;

        Ok(PendingActions {
            subteam: subteams
                .into_iter()
                .map(|s| entry(s.id, Some(s.name)))
                .collect(),
            killswitch: killswitch.map(|k| entry(k.id, None)),
            errormail: ErrorMailSummary {
                id: (!error_mails.is_empty()).then(|| process.name.clone()),
            },
            binrelease: bin_releases
                .into_iter()
                .map(|b| entry(b.id, Some(b.name)))
                .collect(),
            unittest: unit_tests.into_iter().map(|u| entry(u.id, None)).collect(),
            strat_userid_mapping: user_mappings.into_iter().map(|m| entry(m.id, None)).collect(),
            phl_mapping: phl_mappings.into_iter().map(|m| entry(m.id, None)).collect(),
            pnl_info: pnl_info.map(|p| entry(p.id, None)),
            pnllimits: pnl_limits.map(|p| entry(p.id, None)),
            process: process.name,
        })
    }
}

fn entry(id: i32, msg: Option<String>) -> FormattedEntry {
    FormattedEntry { id, msg }
}

fn parse_patch<T: serde::de::DeserializeOwned>(patch: Value) -> Result<T, ApiError> {
    serde_json::from_value(patch).map_err(|e| ApiError::BadRequest(format!("Invalid patch: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::*;
    use sea_orm::PaginatorTrait;

    fn update_request(patch: serde_json::Value, create_strategy: bool) -> PendingUpdateRequest {
        PendingUpdateRequest {
            patch: patch.as_object().cloned().unwrap_or_default(),
            create_strategy,
        }
    }

    #[actix_web::test]
    async fn test_stage_requires_staff() {
        let db = setup_db().await;
        let fx = Fixture::new(&db).await;
        let plain = insert_user(&db, "plain", false).await;
        let plain = load_principal(&db, &plain).await;

        let payload = || PendingProcessCreate {
            name: "candidate".into(),
            box_id: Some(fx.box_01.id),
            e_region_id: Some(fx.apac.id),
            team_id: None,
            currency_id: None,
            cpu: None,
            config_path: None,
            description: None,
        };

        assert!(matches!(
            PendingProcessService::stage(&db, &plain, payload()).await,
            Err(ApiError::PermissionDenied(_))
        ));

        let staff = load_principal(&db, &fx.owner).await;
        let staged = PendingProcessService::stage(&db, &staff, payload()).await.unwrap();
        assert_eq!(staged.owner_id, fx.owner.id);
        assert!(staged.process_id.is_none());
    }

    #[actix_web::test]
    async fn test_create_strategy_links_dormant_process() {
        let db = setup_db().await;
        let fx = Fixture::new(&db).await;
        let pending = insert_pending(&db, "candidate", fx.owner.id, Some(fx.box_01.id), Some(fx.apac.id)).await;

        let linked = PendingProcessService::partial_update(
            &db,
            pending,
            update_request(serde_json::json!({"description": "first run"}), true),
        )
        .await
        .unwrap();

        let process_id = linked.process_id.unwrap();
        let process = strategy::Entity::find_by_id(process_id).one(&db).await.unwrap().unwrap();
        assert_eq!(process.state, ProcessState::Dormant);
        assert_eq!(process.name, "candidate");
        assert_eq!(process.description.as_deref(), Some("first run"));
        assert_eq!(strategy::Entity::find().count(&db).await.unwrap(), 1);
    }

    #[actix_web::test]
    async fn test_failed_create_strategy_leaves_pending_unlinked() {
        let db = setup_db().await;
        let fx = Fixture::new(&db).await;
        // Pas de box: la création échoue
        let pending = insert_pending(&db, "incomplete", fx.owner.id, None, Some(fx.apac.id)).await;
        let pending_id = pending.id;

        let err = PendingProcessService::partial_update(&db, pending, update_request(serde_json::json!({}), true))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref e) if e.contains("box")));

        let reloaded = pending_process::Entity::find_by_id(pending_id).one(&db).await.unwrap().unwrap();
        assert!(reloaded.process_id.is_none());
        assert_eq!(strategy::Entity::find().count(&db).await.unwrap(), 0);
    }

    #[actix_web::test]
    async fn test_linked_pending_edits_the_process() {
        let db = setup_db().await;
        let fx = Fixture::new(&db).await;
        let process = insert_strategy(&db, "live", fx.owner.id, fx.box_01.id, fx.apac.id).await;
        let pending = insert_pending(&db, "live", fx.owner.id, None, None).await;
        let pending = link_pending(&db, pending, process.id).await;

        PendingProcessService::partial_update(
            &db,
            pending,
            update_request(serde_json::json!({"config_path": "/etc/live.cfg"}), false),
        )
        .await
        .unwrap();

        let process = strategy::Entity::find_by_id(process.id).one(&db).await.unwrap().unwrap();
        assert_eq!(process.config_path.as_deref(), Some("/etc/live.cfg"));
    }

    #[actix_web::test]
    async fn test_plain_patch_and_empty_patch() {
        let db = setup_db().await;
        let fx = Fixture::new(&db).await;
        let pending = insert_pending(&db, "draft", fx.owner.id, None, None).await;

        let err = PendingProcessService::partial_update(&db, pending.clone(), update_request(serde_json::json!({}), false))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let updated = PendingProcessService::partial_update(
            &db,
            pending,
            update_request(serde_json::json!({"name": "renamed", "cpu": 2}), false),
        )
        .await
        .unwrap();
        assert_eq!(updated.name, "renamed");
        assert_eq!(updated.cpu, Some(2));
        assert!(updated.process_id.is_none());
    }

    #[actix_web::test]
    async fn test_complete_without_link_keeps_pending() {
        let db = setup_db().await;
        let fx = Fixture::new(&db).await;
        let pending = insert_pending(&db, "orphan", fx.owner.id, None, None).await;
        let pending_id = pending.id;

        let err = PendingProcessService::complete(&db, pending, true).await.unwrap_err();
        assert!(matches!(err, ApiError::MissingLinkedStrategy(ref name) if name == "orphan"));
        assert!(pending_process::Entity::find_by_id(pending_id).one(&db).await.unwrap().is_some());
    }

    #[actix_web::test]
    async fn test_complete_activates_and_deletes() {
        let db = setup_db().await;
        let fx = Fixture::new(&db).await;
        let process = insert_strategy(&db, "ready", fx.owner.id, fx.box_01.id, fx.apac.id).await;
        let pending = insert_pending(&db, "ready", fx.owner.id, None, None).await;
        let pending = link_pending(&db, pending, process.id).await;
        let pending_id = pending.id;

        PendingProcessService::complete(&db, pending, true).await.unwrap();

        let process = strategy::Entity::find_by_id(process.id).one(&db).await.unwrap().unwrap();
        assert_eq!(process.state, ProcessState::Active);
        assert_eq!(
            pending_process::Entity::find()
                .filter(pending_process::Column::Id.eq(pending_id))
                .count(&db)
                .await
                .unwrap(),
            0
        );
    }

    #[actix_web::test]
    async fn test_pending_actions_errors_and_summary() {
        let db = setup_db().await;
        let fx = Fixture::new(&db).await;
        let process = insert_strategy(&db, "summary", fx.owner.id, fx.box_01.id, fx.apac.id).await;
        insert_error_mail(&db, process.id, "crash").await;
        let team = insert_subteam(&db, "alpha", None).await;
        link_subteam_strategy(&db, team.id, process.id).await;

        let missing = PendingActionsQuery {
            process_id: None,
            process_type: Some("strategy".into()),
        };
        assert!(matches!(
            PendingProcessService::pending_actions(&db, &StrategyScope::All, missing).await,
            Err(ApiError::MissingParameter("process_id"))
        ));

        let unknown = PendingActionsQuery {
            process_id: Some(process.id.to_string()),
            process_type: Some("tickerplant".into()),
        };
        assert!(matches!(
            PendingProcessService::pending_actions(&db, &StrategyScope::All, unknown).await,
            Err(ApiError::UnknownProcessType(_))
        ));

        let hidden = PendingActionsQuery {
            process_id: Some(process.id.to_string()),
            process_type: Some("Strategy".into()),
        };
        assert!(matches!(
            PendingProcessService::pending_actions(&db, &StrategyScope::Only(vec![]), hidden).await,
            Err(ApiError::NotFound { .. })
        ));

        let query = PendingActionsQuery {
            process_id: Some(process.id.to_string()),
            process_type: Some("strategy".into()),
        };
        let actions = PendingProcessService::pending_actions(&db, &StrategyScope::All, query)
            .await
            .unwrap();
        assert_eq!(actions.process, "summary");
        assert_eq!(actions.subteam, vec![FormattedEntry { id: team.id, msg: Some("alpha".into()) }]);
        assert!(actions.killswitch.is_some());
        assert_eq!(actions.errormail.id.as_deref(), Some("summary"));
        assert!(actions.pnl_info.is_none());
    }
}
