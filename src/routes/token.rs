use actix_web::{post, web, HttpResponse};

use crate::cache::is_token_revoked;
use crate::config::AppConfig;
use crate::error::{success, ApiError, FieldErrors};
use crate::models::dto::{TokenRefreshRequest, TokenRefreshResponse};
use crate::routes::Collaborators;
use crate::utils::jwt;

/// POST /api/token/refresh - Nouvel access token à partir d'un refresh token
/// Accepte JSON ou formulaire. Pas d'authentification.
#[post("/refresh")]
pub async fn refresh(
    body: web::Either<web::Json<TokenRefreshRequest>, web::Form<TokenRefreshRequest>>,
    config: web::Data<AppConfig>,
    collaborators: web::Data<Collaborators>,
) -> Result<HttpResponse, ApiError> {
    let request = match body {
        web::Either::Left(json) => json.into_inner(),
        web::Either::Right(form) => form.into_inner(),
    };

    let refresh_token = request
        .refresh
        .filter(|token| !token.trim().is_empty())
        .ok_or_else(|| {
            let mut errors = FieldErrors::new();
            errors.required("refresh");
            ApiError::Validation(errors)
        })?;

    // 1. Token invalidé par un logout
    if is_token_revoked(collaborators.store.as_ref(), &refresh_token).await? {
        return Err(ApiError::Token("Token is expired because user logged out".to_string()));
    }

    // 2. Signature, expiration et type
    let access = jwt::refresh_access_token(&refresh_token, &config.jwt).map_err(ApiError::Token)?;

    Ok(success(TokenRefreshResponse { access }))
}

pub fn token_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(refresh);
}
