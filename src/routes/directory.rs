// Annuaire des utilisateurs (anciennes pages HTML, servies en JSON)

use actix_web::{get, web, HttpResponse};
use sea_orm::DatabaseConnection;

use crate::cache::get_user_holidays;
use crate::error::{success, ApiError};
use crate::models::dto::DirectoryQuery;
use crate::routes::Collaborators;
use crate::services::directory_service;

fn is_api(query: &DirectoryQuery) -> bool {
    matches!(
        query.is_api.as_deref().map(str::to_ascii_lowercase).as_deref(),
        Some("true") | Some("1")
    )
}

async fn render(
    db: &DatabaseConnection,
    collaborators: &Collaborators,
    query: DirectoryQuery,
    active: bool,
) -> Result<HttpResponse, ApiError> {
    // Recherche par usernames pour les autres services
    if is_api(&query) {
        let usernames = query
            .users
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        let found = directory_service::lookup_users(db, usernames).await?;
        return Ok(HttpResponse::Ok().json(serde_json::json!({
            "status": true,
            "users": found,
        })));
    }

    let holidays = get_user_holidays(collaborators.store.as_ref()).await;
    let entries = directory_service::list_profiles(db, active, &holidays).await?;

    Ok(success(serde_json::json!({
        "users": entries,
        "users_on_holiday": holidays,
        "internal": true,
    })))
}

/// GET /directory/users
#[get("/users")]
pub async fn users(
    query: web::Query<DirectoryQuery>,
    db: web::Data<DatabaseConnection>,
    collaborators: web::Data<Collaborators>,
) -> Result<HttpResponse, ApiError> {
    render(db.get_ref(), collaborators.get_ref(), query.into_inner(), true).await
}

/// GET /directory/inactive_users
#[get("/inactive_users")]
pub async fn inactive_users(
    query: web::Query<DirectoryQuery>,
    db: web::Data<DatabaseConnection>,
    collaborators: web::Data<Collaborators>,
) -> Result<HttpResponse, ApiError> {
    render(db.get_ref(), collaborators.get_ref(), query.into_inner(), false).await
}

pub fn directory_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(users).service(inactive_users);
}
