use actix_web::web;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Select, Set};
use validator::Validate;

use crate::error::{ApiError, FieldErrors};
use crate::models::dto::{RegionStrategyManageCreate, RegionStrategyManagePatch};
use crate::models::{region, region_strategy_manage};
use crate::routes::viewset::{crud_routes, RequestContext, ViewSet};

/// Préférences de process par région, propres à chaque utilisateur
pub struct RegionStrategyManageViewSet;

async fn check_region(ctx: &RequestContext, region_id: i32) -> Result<(), ApiError> {
    if region::Entity::find_by_id(region_id).one(ctx.db()).await?.is_none() {
        return Err(ApiError::Validation(FieldErrors::single(
            "region_id",
            format!("Invalid pk \"{}\" - object does not exist.", region_id),
        )));
    }
    Ok(())
}

#[async_trait(?Send)]
impl ViewSet for RegionStrategyManageViewSet {
    type Entity = region_strategy_manage::Entity;
    type Model = region_strategy_manage::Model;
    type Create = RegionStrategyManageCreate;
    type Patch = RegionStrategyManagePatch;

    const ENTITY: &'static str = "RegionStrategyManage";

    fn pk() -> region_strategy_manage::Column {
        region_strategy_manage::Column::Id
    }

    async fn scope(ctx: &RequestContext) -> Result<Select<region_strategy_manage::Entity>, ApiError> {
        Ok(region_strategy_manage::Entity::find()
            .filter(region_strategy_manage::Column::UserId.eq(ctx.user_id())))
    }

    async fn create(
        ctx: &RequestContext,
        payload: RegionStrategyManageCreate,
    ) -> Result<region_strategy_manage::Model, ApiError> {
        payload.validate()?;
        check_region(ctx, payload.region_id).await?;

        Ok(region_strategy_manage::ActiveModel {
            user_id: Set(ctx.user_id()),
            region_id: Set(payload.region_id),
            strategies: Set(serde_json::to_value(payload.strategies)?),
            is_enabled: Set(payload.is_enabled),
            created_date: Set(Utc::now()),
            ..Default::default()
        }
        .insert(ctx.db())
        .await?)
    }

    async fn update(
        ctx: &RequestContext,
        current: region_strategy_manage::Model,
        patch: RegionStrategyManagePatch,
    ) -> Result<region_strategy_manage::Model, ApiError> {
        patch.validate()?;
        if let Some(region_id) = patch.region_id {
            check_region(ctx, region_id).await?;
        }

        let mut active: region_strategy_manage::ActiveModel = current.into();
        if let Some(region_id) = patch.region_id {
            active.region_id = Set(region_id);
        }
        if let Some(strategies) = patch.strategies {
            active.strategies = Set(serde_json::to_value(strategies)?);
        }
        if let Some(is_enabled) = patch.is_enabled {
            active.is_enabled = Set(is_enabled);
        }
        Ok(active.update(ctx.db()).await?)
    }
}

pub fn region_strategy_manage_routes(cfg: &mut web::ServiceConfig) {
    crud_routes::<RegionStrategyManageViewSet>(cfg);
}
