use actix_web::web;
use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use validator::Validate;

use crate::error::{unique_violation, ApiError};
use crate::models::dto::{GroupPatch, GroupPayload};
use crate::models::groups;
use crate::routes::viewset::{crud_routes, RequestContext, ViewSet};
use crate::services::access::Capability;

pub struct GroupViewSet;

#[async_trait(?Send)]
impl ViewSet for GroupViewSet {
    type Entity = groups::Entity;
    type Model = groups::Model;
    type Create = GroupPayload;
    type Patch = GroupPatch;

    const ENTITY: &'static str = "Group";

    fn pk() -> groups::Column {
        groups::Column::Id
    }

    async fn create(ctx: &RequestContext, payload: GroupPayload) -> Result<groups::Model, ApiError> {
        ctx.principal.require(Capability::ManageUsers)?;
        payload.validate()?;

        groups::ActiveModel {
            name: Set(payload.name),
            ..Default::default()
        }
        .insert(ctx.db())
        .await
        .map_err(|e| unique_violation(e, "name", "group with this name already exists."))
    }

    async fn update(ctx: &RequestContext, current: groups::Model, patch: GroupPatch) -> Result<groups::Model, ApiError> {
        ctx.principal.require(Capability::ManageUsers)?;
        patch.validate()?;

        let mut active: groups::ActiveModel = current.into();
        if let Some(name) = patch.name {
            active.name = Set(name);
        }
        active
            .update(ctx.db())
            .await
            .map_err(|e| unique_violation(e, "name", "group with this name already exists."))
    }

    async fn destroy(ctx: &RequestContext, id: i32) -> Result<(), ApiError> {
        ctx.principal.require(Capability::ManageUsers)?;
        groups::Entity::delete_by_id(id).exec(ctx.db()).await?;
        Ok(())
    }
}

pub fn group_routes(cfg: &mut web::ServiceConfig) {
    crud_routes::<GroupViewSet>(cfg);
}
