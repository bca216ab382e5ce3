use std::collections::HashMap;

use actix_web::web;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Select, Set};
use serde_json::Value;
use validator::Validate;

use crate::error::{unique_violation, ApiError, FieldErrors};
use crate::models::dto::{KillSwitchCreate, KillSwitchPatch};
use crate::models::{kill_switch, strategy};
use crate::routes::viewset::{crud_routes, RequestContext, ViewSet};
use crate::services::access::{strategy_scope, StrategyScope};

pub struct KillSwitchViewSet;

#[async_trait(?Send)]
impl ViewSet for KillSwitchViewSet {
    type Entity = kill_switch::Entity;
    type Model = kill_switch::Model;
    type Create = KillSwitchCreate;
    type Patch = KillSwitchPatch;

    const ENTITY: &'static str = "KillSwitch";

    fn pk() -> kill_switch::Column {
        kill_switch::Column::Id
    }

    /// Même visibilité que les process
    async fn scope(ctx: &RequestContext) -> Result<Select<kill_switch::Entity>, ApiError> {
        let select = kill_switch::Entity::find();
        Ok(match strategy_scope(ctx.db(), &ctx.principal).await? {
            StrategyScope::All => select,
            StrategyScope::Only(ids) => select.filter(kill_switch::Column::StrategyId.is_in(ids)),
        })
    }

    async fn edit_scope(_ctx: &RequestContext) -> Result<Select<kill_switch::Entity>, ApiError> {
        Ok(kill_switch::Entity::find())
    }

    async fn create(ctx: &RequestContext, payload: KillSwitchCreate) -> Result<kill_switch::Model, ApiError> {
        payload.validate()?;
        if strategy::Entity::find_by_id(payload.strategy_id).one(ctx.db()).await?.is_none() {
            return Err(ApiError::Validation(FieldErrors::single(
                "strategy_id",
                format!("Invalid pk \"{}\" - object does not exist.", payload.strategy_id),
            )));
        }

        kill_switch::ActiveModel {
            strategy_id: Set(payload.strategy_id),
            engaged: Set(payload.engaged),
            reason: Set(payload.reason),
            modified_date: Set(Utc::now()),
            ..Default::default()
        }
        .insert(ctx.db())
        .await
        .map_err(|e| unique_violation(e, "strategy_id", "kill switch with this strategy already exists."))
    }

    async fn update(
        ctx: &RequestContext,
        current: kill_switch::Model,
        patch: KillSwitchPatch,
    ) -> Result<kill_switch::Model, ApiError> {
        patch.validate()?;

        let mut active: kill_switch::ActiveModel = current.into();
        if let Some(engaged) = patch.engaged {
            active.engaged = Set(engaged);
        }
        if let Some(reason) = patch.reason {
            active.reason = Set(reason);
        }
        active.modified_date = Set(Utc::now());

        let updated = active.update(ctx.db()).await?;
        tracing::warn!(
            strategy_id = updated.strategy_id,
            engaged = updated.engaged,
            user = ctx.user_id(),
            "Kill switch updated"
        );
        Ok(updated)
    }

    /// Ajoute le nom du process à chaque kill switch
    async fn represent(ctx: &RequestContext, models: Vec<kill_switch::Model>) -> Result<Vec<Value>, ApiError> {
        let ids: Vec<i32> = models.iter().map(|k| k.strategy_id).collect();
        let names: HashMap<i32, String> = strategy::Entity::find()
            .filter(strategy::Column::Id.is_in(ids))
            .all(ctx.db())
            .await?
            .into_iter()
            .map(|s| (s.id, s.name))
            .collect();

        models
            .into_iter()
            .map(|switch| -> Result<Value, ApiError> {
                let strategy_name = names.get(&switch.strategy_id).cloned();
                let mut value = serde_json::to_value(switch)?;
                if let Value::Object(map) = &mut value {
                    map.insert("strategy_name".to_string(), Value::from(strategy_name));
                }
                Ok(value)
            })
            .collect()
    }
}

pub fn killswitch_routes(cfg: &mut web::ServiceConfig) {
    crud_routes::<KillSwitchViewSet>(cfg);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::test;

    use crate::cache::memory::MemoryStore;
    use crate::db::test_support::*;
    use crate::routes::test_app;

    #[actix_web::test]
    async fn test_listing_includes_strategy_name() {
        let db = setup_db().await;
        let fx = Fixture::new(&db).await;
        insert_strategy(&db, "alpha", fx.owner.id, fx.box_01.id, fx.apac.id).await;
        let app = test_app!(db, Arc::new(MemoryStore::default()));

        let req = test::TestRequest::get()
            .uri("/api/killswitch")
            .insert_header(bearer(&fx.owner))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["data"][0]["strategy_name"], "alpha");
        assert_eq!(body["data"][0]["engaged"], false);
    }
}
