use actix_web::web;
use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, Set};
use validator::Validate;

use crate::error::{unique_violation, ApiError};
use crate::models::dto::{RegionCreate, RegionPatch};
use crate::models::region;
use crate::routes::viewset::{crud_routes, RequestContext, ViewSet};

pub struct RegionViewSet;

#[async_trait(?Send)]
impl ViewSet for RegionViewSet {
    type Entity = region::Entity;
    type Model = region::Model;
    type Create = RegionCreate;
    type Patch = RegionPatch;

    const ENTITY: &'static str = "Region";

    fn pk() -> region::Column {
        region::Column::Id
    }

    async fn create(ctx: &RequestContext, payload: RegionCreate) -> Result<region::Model, ApiError> {
        payload.validate()?;

        region::ActiveModel {
            name: Set(payload.name),
            timezone: Set(payload.timezone),
            ..Default::default()
        }
        .insert(ctx.db())
        .await
        .map_err(|e| unique_violation(e, "name", "region with this name already exists."))
    }

    async fn update(ctx: &RequestContext, current: region::Model, patch: RegionPatch) -> Result<region::Model, ApiError> {
        patch.validate()?;

        let mut active: region::ActiveModel = current.into();
        if let Some(name) = patch.name {
            active.name = Set(name);
        }
        if let Some(timezone) = patch.timezone {
            active.timezone = Set(timezone);
        }
        active
            .update(ctx.db())
            .await
            .map_err(|e| unique_violation(e, "name", "region with this name already exists."))
    }
}

pub fn region_routes(cfg: &mut web::ServiceConfig) {
    crud_routes::<RegionViewSet>(cfg);
}
