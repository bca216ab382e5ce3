use actix_web::web;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Select, Set};
use validator::Validate;

use crate::error::ApiError;
use crate::models::dto::{WatchlistCreate, WatchlistPatch};
use crate::models::user_watchlist_config;
use crate::routes::viewset::{crud_routes, RequestContext, ViewSet};

/// Watchlists de la page PnL, visibles uniquement par leur propriétaire
pub struct UserWatchlistConfigViewSet;

#[async_trait(?Send)]
impl ViewSet for UserWatchlistConfigViewSet {
    type Entity = user_watchlist_config::Entity;
    type Model = user_watchlist_config::Model;
    type Create = WatchlistCreate;
    type Patch = WatchlistPatch;

    const ENTITY: &'static str = "UserWatchlistConfig";

    fn pk() -> user_watchlist_config::Column {
        user_watchlist_config::Column::Id
    }

    async fn scope(ctx: &RequestContext) -> Result<Select<user_watchlist_config::Entity>, ApiError> {
        Ok(user_watchlist_config::Entity::find()
            .filter(user_watchlist_config::Column::OwnerId.eq(ctx.user_id())))
    }

    async fn create(ctx: &RequestContext, payload: WatchlistCreate) -> Result<user_watchlist_config::Model, ApiError> {
        payload.validate()?;

        let now = Utc::now();
        Ok(user_watchlist_config::ActiveModel {
            owner_id: Set(ctx.user_id()),
            name: Set(payload.name),
            config: Set(payload.config),
            created_date: Set(now),
            modified_date: Set(now),
            ..Default::default()
        }
        .insert(ctx.db())
        .await?)
    }

    async fn update(
        ctx: &RequestContext,
        current: user_watchlist_config::Model,
        patch: WatchlistPatch,
    ) -> Result<user_watchlist_config::Model, ApiError> {
        patch.validate()?;

        let mut active: user_watchlist_config::ActiveModel = current.into();
        if let Some(name) = patch.name {
            active.name = Set(name);
        }
        if let Some(config) = patch.config {
            active.config = Set(config);
        }
        active.modified_date = Set(Utc::now());
        Ok(active.update(ctx.db()).await?)
    }
}

pub fn user_watchlist_config_routes(cfg: &mut web::ServiceConfig) {
    crud_routes::<UserWatchlistConfigViewSet>(cfg);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{http::StatusCode, test};

    use crate::cache::memory::MemoryStore;
    use crate::db::test_support::*;
    use crate::routes::test_app;

    #[actix_web::test]
    async fn test_watchlists_are_owner_scoped() {
        let db = setup_db().await;
        let alice = insert_user(&db, "alice", false).await;
        let bob = insert_user(&db, "bob", false).await;
        let app = test_app!(db, Arc::new(MemoryStore::default()));

        let req = test::TestRequest::post()
            .uri("/api/user_watchlist_config")
            .insert_header(bearer(&alice))
            .set_json(serde_json::json!({"name": "asia", "config": {"columns": ["pnl"]}}))
            .to_request();
        let created: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let id = created["data"]["id"].as_i64().unwrap();
        assert_eq!(created["data"]["owner_id"], alice.id);

        let req = test::TestRequest::get()
            .uri("/api/user_watchlist_config")
            .insert_header(bearer(&bob))
            .to_request();
        let listed: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(listed["data"].as_array().unwrap().len(), 0);

        let req = test::TestRequest::patch()
            .uri(&format!("/api/user_watchlist_config/{}", id))
            .insert_header(bearer(&bob))
            .set_json(serde_json::json!({"name": "stolen"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
