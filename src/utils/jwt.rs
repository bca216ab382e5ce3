use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32,        // user_id
    pub username: String,
    pub token_type: TokenType,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,        // expiration timestamp
}

/// Génère un JWT (access ou refresh) pour un utilisateur
pub fn generate_token(
    user_id: i32,
    username: &str,
    token_type: TokenType,
    settings: &JwtSettings,
) -> Result<String, String> {
    let ttl = match token_type {
        TokenType::Access => settings.access_ttl,
        TokenType::Refresh => settings.refresh_ttl,
    };
    let now = Utc::now();
    let expiration = now
        .checked_add_signed(ttl)
        .ok_or("Failed to calculate expiration")?
        .timestamp();

    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        token_type,
        jti: Uuid::new_v4().simple().to_string(),
        iat: now.timestamp(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.secret.as_ref()),
    )
        .map_err(|e| format!("Failed to generate token: {}", e))
}

/// Vérifie et décode un JWT, en contrôlant son type
pub fn verify_token(token: &str, expected: TokenType, settings: &JwtSettings) -> Result<Claims, String> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(settings.secret.as_ref()),
        &Validation::new(Algorithm::HS256),
    )
        .map(|data| data.claims)
        .map_err(|_| "Token is invalid or expired".to_string())?;

    if claims.token_type != expected {
        return Err("Token has wrong type".to_string());
    }

    Ok(claims)
}

/// Émet un nouvel access token à partir d'un refresh token valide
pub fn refresh_access_token(refresh_token: &str, settings: &JwtSettings) -> Result<String, String> {
    let claims = verify_token(refresh_token, TokenType::Refresh, settings)?;
    generate_token(claims.sub, &claims.username, TokenType::Access, settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn settings() -> JwtSettings {
        JwtSettings {
            secret: "test-secret".to_string(),
            access_ttl: Duration::minutes(5),
            refresh_ttl: Duration::hours(1),
        }
    }

    #[test]
    fn test_generate_and_verify_token() {
        let user_id = 123;
        let username = "testuser";

        let token = generate_token(user_id, username, TokenType::Access, &settings()).unwrap();
        let claims = verify_token(&token, TokenType::Access, &settings()).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.username, username);
    }

    #[test]
    fn test_invalid_token() {
        let result = verify_token("invalid.token.here", TokenType::Access, &settings());
        assert!(result.is_err());
    }

    #[test]
    fn test_access_token_cannot_refresh() {
        let access = generate_token(1, "jdoe", TokenType::Access, &settings()).unwrap();
        assert_eq!(
            refresh_access_token(&access, &settings()).unwrap_err(),
            "Token has wrong type"
        );
    }

    #[test]
    fn test_refresh_issues_access_token() {
        let refresh = generate_token(7, "jdoe", TokenType::Refresh, &settings()).unwrap();
        let access = refresh_access_token(&refresh, &settings()).unwrap();

        let claims = verify_token(&access, TokenType::Access, &settings()).unwrap();
        assert_eq!(claims.sub, 7);
    }

    #[test]
    fn test_expired_token_rejected() {
        let expired = JwtSettings {
            refresh_ttl: Duration::hours(-2),
            ..settings()
        };
        let refresh = generate_token(7, "jdoe", TokenType::Refresh, &expired).unwrap();
        assert!(refresh_access_token(&refresh, &settings()).is_err());
    }
}
