use actix_web::web;
use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use validator::Validate;

use crate::error::{unique_violation, ApiError, FieldErrors};
use crate::models::dto::{BoxCreate, BoxPatch};
use crate::models::{boxes, region};
use crate::routes::viewset::{crud_routes, RequestContext, ViewSet};

pub struct BoxViewSet;

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
impl ViewSet for BoxViewSet {
    type Entity = boxes::Entity;
    type Model = boxes::Model;
    type Create = BoxCreate;
    type Patch = BoxPatch;

    const ENTITY: &'static str = "Box";

    fn pk() -> boxes::Column {
        boxes::Column::Id
    }

    async fn create(ctx: &RequestContext, payload: BoxCreate) -> Result<boxes::Model, ApiError> {
        payload.validate()?;
        check_region(ctx, payload.region_id).await?;

        boxes::ActiveModel {
            name: Set(payload.name),
            region_id: Set(payload.region_id),
            ip_address: Set(payload.ip_address),
            is_active: Set(payload.is_active),
            ..Default::default()
        }
        .insert(ctx.db())
        .await
        .map_err(|e| unique_violation(e, "name", "box with this name already exists."))
    }

    async fn update(ctx: &RequestContext, current: boxes::Model, patch: BoxPatch) -> Result<boxes::Model, ApiError> {
        patch.validate()?;
        if let Some(region_id) = patch.region_id {
            check_region(ctx, region_id).await?;
        }

        let mut active: boxes::ActiveModel = current.into();
        if let Some(name) = patch.name {
            active.name = Set(name);
        }
        if let Some(region_id) = patch.region_id {
            active.region_id = Set(region_id);
        }
        if let Some(ip_address) = patch.ip_address {
            active.ip_address = Set(ip_address);
        }
        if let Some(is_active) = patch.is_active {
            active.is_active = Set(is_active);
        }
        active
            .update(ctx.db())
            .await
            .map_err(|e| unique_violation(e, "name", "box with this name already exists."))
    }
}

pub fn box_routes(cfg: &mut web::ServiceConfig) {
    crud_routes::<BoxViewSet>(cfg);
}
