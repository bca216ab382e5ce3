// ============================================================================
// SERVICE : PROCESS (STRATEGY)
// ============================================================================
//
// Description:
//   Création et modification des process, avec validation par champ.
//   Toutes les fonctions sont génériques sur ConnectionTrait pour pouvoir
//   tourner dans une transaction (pending workflow, copie).
//
// Règles:
//   - name, box et ERegion sont obligatoires à la création
//   - chaque process reçoit un kill switch désarmé
//   - un coeur CPU déjà pris sur la même box est refusé, sauf
//     allow_force_cpu_update
//
// ============================================================================

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set};
use validator::Validate;

use crate::error::{unique_violation, ApiError, FieldErrors};
use crate::models::dto::{StrategyDraft, StrategyPatch, StrategySlugRequest};
use crate::models::strategy::{self, ProcessState};
use crate::models::{boxes, currency, kill_switch, region, teams, users};
use crate::utils::slug;

pub struct StrategyService;

impl StrategyService {
    /// Crée un process et son kill switch. `default_owner` est utilisé si le
    /// brouillon n'a pas de propriétaire.
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        draft: StrategyDraft,
        default_owner: i32,
    ) -> Result<strategy::Model, ApiError> {
        let mut errors = match draft.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => e.into(),
        };

        let name = draft.name.clone().filter(|name| !name.trim().is_empty());
        if name.is_none() && !errors.contains("name") {
            errors.required("name");
        }
        if draft.box_id.is_none() {
            errors.required("box");
        }
        if draft.e_region_id.is_none() {
            errors.required("ERegion");
        }

        let owner_id = draft.owner_id.unwrap_or(default_owner);
        check_references(
            db,
            References {
                owner_id: Some(owner_id),
                box_id: draft.box_id,
                e_region_id: draft.e_region_id,
                team_id: draft.team_id,
                currency_id: draft.currency_id,
            },
            &mut errors,
        )
        .await?;

        if let Some(name) = &name {
            if name_taken(db, name, None).await? {
                errors.add("name", "strategy with this name already exists.");
            }
        }

        errors.into_result()?;
        let (Some(name), Some(box_id), Some(e_region_id)) = (name, draft.box_id, draft.e_region_id) else {
            return Err(ApiError::Internal("validated draft is incomplete".to_string()));
        };

        let now = Utc::now();
        let new_strategy = strategy::ActiveModel {
            name: Set(name),
            state: Set(draft.state.unwrap_or(ProcessState::Dormant)),
            owner_id: Set(owner_id),
            box_id: Set(box_id),
            e_region_id: Set(e_region_id),
            team_id: Set(draft.team_id),
            currency_id: Set(draft.currency_id),
            cpu: Set(draft.cpu),
            config_path: Set(draft.config_path),
            description: Set(draft.description),
            created_date: Set(now),
            modified_date: Set(now),
            ..Default::default()
        };

        let created = new_strategy.insert(db).await.map_err(unique_name_error)?;
        create_kill_switch(db, created.id).await?;

        tracing::info!(strategy_id = created.id, name = %created.name, "Strategy created");
        Ok(created)
    }

    /// Applique un patch partiel à un process existant
    pub async fn update<C: ConnectionTrait>(
        db: &C,
        current: strategy::Model,
        patch: StrategyPatch,
    ) -> Result<strategy::Model, ApiError> {
        let mut errors = match patch.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => e.into(),
        };

        check_references(
            db,
            References {
                owner_id: patch.owner_id,
                box_id: patch.box_id,
                e_region_id: patch.e_region_id,
                team_id: patch.team_id.flatten(),
                currency_id: patch.currency_id.flatten(),
            },
            &mut errors,
        )
        .await?;

        if let Some(name) = &patch.name {
            if name_taken(db, name, Some(current.id)).await? {
                errors.add("name", "strategy with this name already exists.");
            }
        }

        // Garde CPU: seulement si le coeur ou la box change
        if patch.cpu.is_some() || patch.box_id.is_some() {
            let cpu = patch.cpu.unwrap_or(current.cpu);
            let box_id = patch.box_id.unwrap_or(current.box_id);
            if let Some(cpu) = cpu {
                if let Some(holder) = cpu_holder(db, box_id, cpu, current.id).await? {
                    if patch.allow_force_cpu_update {
                        tracing::warn!(
                            strategy_id = current.id,
                            cpu,
                            holder = %holder.name,
                            "Forcing CPU already used on the same box"
                        );
                    } else {
                        errors.add(
                            "cpu",
                            format!("CPU {} is already used by {} on this box.", cpu, holder.name),
                        );
                    }
                }
            }
        }

        errors.into_result()?;

        let mut active: strategy::ActiveModel = current.into();
        if let Some(name) = patch.name {
            active.name = Set(name);
        }
        if let Some(state) = patch.state {
            active.state = Set(state);
        }
        if let Some(owner_id) = patch.owner_id {
            active.owner_id = Set(owner_id);
        }
        if let Some(box_id) = patch.box_id {
            active.box_id = Set(box_id);
        }
        if let Some(e_region_id) = patch.e_region_id {
            active.e_region_id = Set(e_region_id);
        }
        if let Some(team_id) = patch.team_id {
            active.team_id = Set(team_id);
        }
        if let Some(currency_id) = patch.currency_id {
            active.currency_id = Set(currency_id);
        }
        if let Some(cpu) = patch.cpu {
            active.cpu = Set(cpu);
        }
        if let Some(config_path) = patch.config_path {
            active.config_path = Set(config_path);
        }
        if let Some(description) = patch.description {
            active.description = Set(description);
        }
        active.modified_date = Set(Utc::now());

        Ok(active.update(db).await.map_err(unique_name_error)?)
    }

    /// Résout les slugs de api_post en brouillon de process
    pub async fn draft_from_slugs<C: ConnectionTrait>(
        db: &C,
        request: StrategySlugRequest,
    ) -> Result<StrategyDraft, ApiError> {
        let mut errors = match request.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => e.into(),
        };

        let box_id = slug::resolve_required::<boxes::Entity, C>(
            db,
            "box",
            boxes::Column::Name,
            "name",
            request.box_name.as_deref(),
            |b| b.id,
            &mut errors,
        )
        .await?;
        let e_region_id = slug::resolve_required::<region::Entity, C>(
            db,
            "ERegion",
            region::Column::Name,
            "name",
            request.e_region.as_deref(),
            |r| r.id,
            &mut errors,
        )
        .await?;

        let mut owner_id = None;
        if let Some(owner) = request.owner.as_deref() {
            owner_id = slug::resolve::<users::Entity, C>(
                db,
                "owner",
                users::Column::Username,
                "name",
                owner,
                |u| u.id,
                &mut errors,
            )
            .await?;
        }
        let mut currency_id = None;
        if let Some(symbol) = request.currency.as_deref() {
            currency_id = slug::resolve::<currency::Entity, C>(
                db,
                "currency",
                currency::Column::Symbol,
                "name",
                symbol,
                |c| c.id,
                &mut errors,
            )
            .await?;
        }
        let mut team_id = None;
        if let Some(team) = request.team.as_deref() {
            team_id = slug::resolve::<teams::Entity, C>(
                db,
                "team",
                teams::Column::Name,
                "name",
                team,
                |t| t.id,
                &mut errors,
            )
            .await?;
        }

        errors.into_result()?;

        Ok(StrategyDraft {
            name: request.name,
            state: request.state,
            owner_id,
            box_id,
            e_region_id,
            team_id,
            currency_id,
            cpu: request.cpu,
            config_path: request.config_path,
            description: request.description,
        })
    }
}

/// Clés étrangères à vérifier (None = non fourni)
#[derive(Debug, Default)]
pub struct References {
    pub owner_id: Option<i32>,
    pub box_id: Option<i32>,
    pub e_region_id: Option<i32>,
    pub team_id: Option<i32>,
    pub currency_id: Option<i32>,
}

fn missing_pk(errors: &mut FieldErrors, field: &str, id: i32) {
    errors.add(field, format!("Invalid pk \"{}\" - object does not exist.", id));
}

/// Ajoute une erreur par champ dont l'objet référencé n'existe pas
pub async fn check_references<C: ConnectionTrait>(
    db: &C,
    refs: References,
    errors: &mut FieldErrors,
) -> Result<(), DbErr> {
    if let Some(id) = refs.owner_id {
        if users::Entity::find_by_id(id).one(db).await?.is_none() {
            missing_pk(errors, "owner", id);
        }
    }
    if let Some(id) = refs.box_id {
        if boxes::Entity::find_by_id(id).one(db).await?.is_none() {
            missing_pk(errors, "box", id);
        }
    }
    if let Some(id) = refs.e_region_id {
        if region::Entity::find_by_id(id).one(db).await?.is_none() {
            missing_pk(errors, "ERegion", id);
        }
    }
    if let Some(id) = refs.team_id {
        if teams::Entity::find_by_id(id).one(db).await?.is_none() {
            missing_pk(errors, "team", id);
        }
    }
    if let Some(id) = refs.currency_id {
        if currency::Entity::find_by_id(id).one(db).await?.is_none() {
            missing_pk(errors, "currency", id);
        }
    }
    Ok(())
}

pub async fn name_taken<C: ConnectionTrait>(db: &C, name: &str, except: Option<i32>) -> Result<bool, DbErr> {
    let mut query = strategy::Entity::find().filter(strategy::Column::Name.eq(name));
    if let Some(id) = except {
        query = query.filter(strategy::Column::Id.ne(id));
    }
    Ok(query.one(db).await?.is_some())
}

async fn cpu_holder<C: ConnectionTrait>(
    db: &C,
    box_id: i32,
    cpu: i32,
    except: i32,
) -> Result<Option<strategy::Model>, DbErr> {
    strategy::Entity::find()
        .filter(strategy::Column::BoxId.eq(box_id))
        .filter(strategy::Column::Cpu.eq(cpu))
        .filter(strategy::Column::Id.ne(except))
        .one(db)
        .await
}

pub async fn create_kill_switch<C: ConnectionTrait>(db: &C, strategy_id: i32) -> Result<kill_switch::Model, DbErr> {
    kill_switch::ActiveModel {
        strategy_id: Set(strategy_id),
        engaged: Set(false),
        reason: Set(None),
        modified_date: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Une violation d'unicité entre la vérification et l'insert reste une erreur de champ
pub fn unique_name_error(err: DbErr) -> ApiError {
    unique_violation(err, "name", "strategy with this name already exists.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::*;

    #[actix_web::test]
    async fn test_create_adds_kill_switch() {
        let db = setup_db().await;
        let fx = Fixture::new(&db).await;

        let draft = StrategyDraft {
            name: Some("alpha".into()),
            box_id: Some(fx.box_01.id),
            e_region_id: Some(fx.apac.id),
            ..Default::default()
        };
        let created = StrategyService::create(&db, draft, fx.owner.id).await.unwrap();

        assert_eq!(created.state, ProcessState::Dormant);
        assert_eq!(created.owner_id, fx.owner.id);
        let switch = kill_switch::Entity::find()
            .filter(kill_switch::Column::StrategyId.eq(created.id))
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert!(!switch.engaged);
    }

    #[actix_web::test]
    async fn test_create_reports_missing_and_unknown_fields() {
        let db = setup_db().await;
        let fx = Fixture::new(&db).await;

        let draft = StrategyDraft {
            box_id: Some(9_999),
            ..Default::default()
        };
        let err = StrategyService::create(&db, draft, fx.owner.id).await.unwrap_err();

        let ApiError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors.contains("name"));
        assert!(errors.contains("ERegion"));
        assert!(errors.contains("box"));
    }

    #[actix_web::test]
    async fn test_duplicate_name_is_field_error() {
        let db = setup_db().await;
        let fx = Fixture::new(&db).await;
        insert_strategy(&db, "alpha", fx.owner.id, fx.box_01.id, fx.apac.id).await;

        let draft = StrategyDraft {
            name: Some("alpha".into()),
            box_id: Some(fx.box_01.id),
            e_region_id: Some(fx.apac.id),
            ..Default::default()
        };
        let err = StrategyService::create(&db, draft, fx.owner.id).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref e) if e.contains("name")));
    }

    #[actix_web::test]
    async fn test_cpu_conflict_guard() {
        let db = setup_db().await;
        let fx = Fixture::new(&db).await;
        let holder = insert_strategy(&db, "holder", fx.owner.id, fx.box_01.id, fx.apac.id).await;
        StrategyService::update(
            &db,
            holder,
            StrategyPatch {
                cpu: Some(Some(4)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let other = insert_strategy(&db, "other", fx.owner.id, fx.box_01.id, fx.apac.id).await;
        let err = StrategyService::update(
            &db,
            other.clone(),
            StrategyPatch {
                cpu: Some(Some(4)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref e) if e.contains("cpu")));

        let forced = StrategyService::update(
            &db,
            other,
            StrategyPatch {
                cpu: Some(Some(4)),
                allow_force_cpu_update: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(forced.cpu, Some(4));
    }

    #[actix_web::test]
    async fn test_slug_resolution() {
        let db = setup_db().await;
        let fx = Fixture::new(&db).await;

        let request: StrategySlugRequest = serde_json::from_value(serde_json::json!({
            "name": "beta",
            "box": "box-01",
            "ERegion": "APAC",
            "owner": "owner",
            "currency": "XYZ"
        }))
        .unwrap();
        let err = StrategyService::draft_from_slugs(&db, request).await.unwrap_err();
        let ApiError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors.contains("currency"));
        assert!(!errors.contains("box"));
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["currency"][0], "Object with name=XYZ does not exist.");

        let request: StrategySlugRequest = serde_json::from_value(serde_json::json!({
            "name": "beta",
            "box": "box-01",
            "ERegion": "APAC",
            "owner": "owner"
        }))
        .unwrap();
        let draft = StrategyService::draft_from_slugs(&db, request).await.unwrap();
        assert_eq!(draft.box_id, Some(fx.box_01.id));
        assert_eq!(draft.e_region_id, Some(fx.apac.id));
        assert_eq!(draft.owner_id, Some(fx.owner.id));
    }
}
