// ============================================================================
// ERREURS API
// ============================================================================
//
// Description:
//   Énumération fermée des erreurs renvoyées aux clients. Chaque variante a un
//   `kind` stable dans le JSON pour que l'appelant puisse brancher dessus sans
//   parser le message.
//
// Formes de réponse:
//   - validation : {"success": false, "kind": "validation", "errors": {champ: [msgs]}}
//   - précondition : {"success": false, "kind": "...", "error": "message"}
//   - token : 403 {"success": false, "kind": "token", "error": "message"}
//
// Points d'attention:
//   - Les erreurs base de données / cache sont loggées, jamais envoyées telles quelles
//
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use validator::ValidationErrors;

use crate::cache::CacheError;

/// Erreurs par champ, même forme que les erreurs de formulaire côté client
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn required(&mut self, field: &str) {
        self.add(field, "This field is required.");
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Ok(()) s'il n'y a aucune erreur, sinon ApiError::Validation
    pub fn into_result(self) -> Result<(), ApiError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.0.keys().map(String::as_str).collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = FieldErrors::new();
        for (field, list) in errors.field_errors() {
            for error in list.iter() {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value ({}).", error.code));
                out.add(&field.to_string(), message);
            }
        }
        out
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("Missing query parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Unknown process type: {0}")]
    UnknownProcessType(String),

    #[error("No linked strategy exists for pending process - {0}")]
    MissingLinkedStrategy(String),

    #[error("{entity} with given PK {id} doesn't exist")]
    NotFound { entity: &'static str, id: i32 },

    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    Token(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("database error: {0}")]
    Database(#[from] DbErr),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(entity: &'static str, id: i32) -> Self {
        ApiError::NotFound { entity, id }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::MissingParameter(_) => "missing_parameter",
            ApiError::UnknownProcessType(_) => "unknown_process_type",
            ApiError::MissingLinkedStrategy(_) => "missing_linked_strategy",
            ApiError::NotFound { .. } => "not_found",
            ApiError::PermissionDenied(_) => "permission_denied",
            ApiError::Token(_) => "token",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Database(_) => "database",
            ApiError::Cache(_) => "cache",
            ApiError::Internal(_) => "internal",
        }
    }
}

/// Une violation d'unicité devient une erreur sur `field`, le reste une erreur base
pub fn unique_violation(err: DbErr, field: &str, message: &str) -> ApiError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => ApiError::Validation(FieldErrors::single(field, message)),
        _ => ApiError::Database(err),
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors.into())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::BadRequest(_)
            | ApiError::MissingParameter(_)
            | ApiError::UnknownProcessType(_) => StatusCode::BAD_REQUEST,
            ApiError::MissingLinkedStrategy(_) => StatusCode::CONFLICT,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::PermissionDenied(_) | ApiError::Token(_) => StatusCode::FORBIDDEN,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Database(_) | ApiError::Cache(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            ApiError::Validation(errors) => serde_json::json!({
                "success": false,
                "kind": self.kind(),
                "errors": errors,
            }),
            ApiError::Database(_) | ApiError::Cache(_) | ApiError::Internal(_) => {
                tracing::error!(kind = self.kind(), "request failed: {}", self);
                serde_json::json!({
                    "success": false,
                    "kind": self.kind(),
                    "error": "Internal server error",
                })
            }
            _ => serde_json::json!({
                "success": false,
                "kind": self.kind(),
                "error": self.to_string(),
            }),
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}

/// Enveloppe de succès commune à toutes les routes
pub fn success<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": data,
    }))
}

pub fn created<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "data": data,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Payload {
        #[validate(length(min = 1, message = "Name cannot be empty."))]
        name: String,
    }

    #[test]
    fn test_validation_errors_keep_field_names() {
        let errors = Payload { name: String::new() }.validate().unwrap_err();
        let fields: FieldErrors = errors.into();

        assert!(fields.contains("name"));
        let json = serde_json::to_value(&fields).unwrap();
        assert_eq!(json["name"][0], "Name cannot be empty.");
    }

    #[test]
    fn test_status_codes_per_kind() {
        assert_eq!(
            ApiError::MissingLinkedStrategy("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(ApiError::Token("bad".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::Validation(FieldErrors::single("name", "taken")).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_empty_field_errors_is_ok() {
        assert!(FieldErrors::new().into_result().is_ok());
        assert!(FieldErrors::single("box", "missing").into_result().is_err());
    }
}
