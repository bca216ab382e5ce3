use actix_web::web;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use validator::Validate;

use crate::error::{unique_violation, ApiError};
use crate::models::dto::{UserCreate, UserPatch};
use crate::models::users;
use crate::routes::viewset::{crud_routes, RequestContext, ViewSet};
use crate::services::access::Capability;
use crate::utils::password;

pub struct UserViewSet;

#[async_trait(?Send)]
impl ViewSet for UserViewSet {
    type Entity = users::Entity;
    type Model = users::Model;
    type Create = UserCreate;
    type Patch = UserPatch;

    const ENTITY: &'static str = "User";

    fn pk() -> users::Column {
        users::Column::Id
    }

    async fn create(ctx: &RequestContext, payload: UserCreate) -> Result<users::Model, ApiError> {
        ctx.principal.require(Capability::ManageUsers)?;
        payload.validate()?;

        // Hash Django (pbkdf2_sha256) pour rester compatible avec auth_user
        let password_hash = password::hash_password(&payload.password).map_err(ApiError::Internal)?;

        let user = users::ActiveModel {
            username: Set(payload.username),
            email: Set(payload.email),
            first_name: Set(payload.first_name),
            last_name: Set(payload.last_name),
            password: Set(password_hash),
            is_staff: Set(payload.is_staff),
            is_active: Set(true),
            is_superuser: Set(false),
            date_joined: Set(Utc::now()),
            last_login: Set(None),
            ..Default::default()
        }
        .insert(ctx.db())
        .await
        .map_err(|e| unique_violation(e, "username", "A user with that username already exists."))?;

        tracing::info!(user_id = user.id, created_by = ctx.user_id(), "User created");
        Ok(user)
    }

    async fn update(ctx: &RequestContext, current: users::Model, patch: UserPatch) -> Result<users::Model, ApiError> {
        // Un utilisateur peut modifier son propre profil, pas ses droits
        let touches_rights = patch.is_staff.is_some() || patch.is_active.is_some();
        if current.id != ctx.user_id() || touches_rights {
            ctx.principal.require(Capability::ManageUsers)?;
        }
        patch.validate()?;

        let mut active: users::ActiveModel = current.into();
        if let Some(email) = patch.email {
            active.email = Set(email);
        }
        if let Some(first_name) = patch.first_name {
            active.first_name = Set(first_name);
        }
        if let Some(last_name) = patch.last_name {
            active.last_name = Set(last_name);
        }
        if let Some(new_password) = patch.password {
            active.password = Set(password::hash_password(&new_password).map_err(ApiError::Internal)?);
        }
        if let Some(is_staff) = patch.is_staff {
            active.is_staff = Set(is_staff);
        }
        if let Some(is_active) = patch.is_active {
            active.is_active = Set(is_active);
        }

        Ok(active.update(ctx.db()).await?)
    }

    async fn destroy(ctx: &RequestContext, id: i32) -> Result<(), ApiError> {
        ctx.principal.require(Capability::ManageUsers)?;
        if id == ctx.user_id() {
            return Err(ApiError::BadRequest("You cannot delete your own account".to_string()));
        }
        users::Entity::delete_by_id(id).exec(ctx.db()).await?;
        Ok(())
    }
}

pub fn user_routes(cfg: &mut web::ServiceConfig) {
    crud_routes::<UserViewSet>(cfg);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{http::StatusCode, test};
    use sea_orm::EntityTrait;

    use crate::cache::memory::MemoryStore;
    use crate::db::test_support::*;
    use crate::models::users;
    use crate::routes::test_app;
    use crate::utils::password::verify_password;

    #[actix_web::test]
    async fn test_staff_creates_user_with_django_hash() {
        let db = setup_db().await;
        let staff = insert_user(&db, "admin", true).await;
        let app = test_app!(db, Arc::new(MemoryStore::default()));

        let req = test::TestRequest::post()
            .uri("/api/users")
            .insert_header(bearer(&staff))
            .set_json(serde_json::json!({
                "username": "newbie",
                "email": "newbie@example.com",
                "password": "long-enough-pass"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["username"], "newbie");
        assert!(body["data"].get("password").is_none());

        let id = body["data"]["id"].as_i64().unwrap() as i32;
        let stored = users::Entity::find_by_id(id).one(&db).await.unwrap().unwrap();
        assert!(stored.password.starts_with("pbkdf2_sha256$"));
        assert!(verify_password("long-enough-pass", &stored.password).unwrap());
    }

    #[actix_web::test]
    async fn test_non_staff_cannot_create_user() {
        let db = setup_db().await;
        let plain = insert_user(&db, "plain", false).await;
        let app = test_app!(db, Arc::new(MemoryStore::default()));

        let req = test::TestRequest::post()
            .uri("/api/users")
            .insert_header(bearer(&plain))
            .set_json(serde_json::json!({
                "username": "sneaky",
                "email": "sneaky@example.com",
                "password": "long-enough-pass"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_requests_without_token_are_rejected() {
        let db = setup_db().await;
        let app = test_app!(db, Arc::new(MemoryStore::default()));

        let req = test::TestRequest::get().uri("/api/users").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["kind"], "unauthorized");
    }

    #[actix_web::test]
    async fn test_list_paginates() {
        let db = setup_db().await;
        let staff = insert_user(&db, "admin", true).await;
        for name in ["u1", "u2", "u3"] {
            insert_user(&db, name, false).await;
        }
        let app = test_app!(db, Arc::new(MemoryStore::default()));

        let req = test::TestRequest::get()
            .uri("/api/users?page=2&page_size=3")
            .insert_header(bearer(&staff))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["data"]["count"], 4);
        assert_eq!(body["data"]["num_pages"], 2);
        assert_eq!(body["data"]["results"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"]["results"][0]["username"], "u3");
    }
}
