// ============================================================================
// CACHE CLÉ-VALEUR (Redis)
// ============================================================================
//
// Description:
//   Accès au cache partagé avec les autres services:
//   - today_holiday_users_<date> : JSON des utilisateurs en congé (date IST)
//   - jwt:<refresh token>        : présent si l'utilisateur s'est déconnecté
//   - process_heartbeat_<name>   : présent tant que le process tourne
//   - automate:tasks             : liste utilisée comme file de tâches
//
// Points d'attention:
//   - Une seule connexion (ConnectionManager) ouverte au premier appel,
//     clonée ensuite; elle se reconnecte seule après une coupure
//   - exists_many envoie tous les EXISTS dans un seul pipeline
//   - Le trait KvStore permet de remplacer Redis en test
//
// ============================================================================

use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDate, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde_json::{Map, Value};
use tokio::sync::OnceCell;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error(transparent)]
    Redis(#[from] redis::RedisError),

    #[error("invalid cached payload for {key}: {reason}")]
    Payload { key: String, reason: String },
}

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn exists(&self, key: &str) -> Result<bool, CacheError>;

    /// Un booléen par clé, dans l'ordre des clés
    async fn exists_many(&self, keys: &[String]) -> Result<Vec<bool>, CacheError>;

    /// Ajoute en tête de liste (LPUSH)
    async fn push(&self, list: &str, payload: String) -> Result<(), CacheError>;
}

pub struct RedisStore {
    client: redis::Client,
    conn: OnceCell<ConnectionManager>,
}

impl RedisStore {
    pub fn open(url: &str) -> Result<Self, CacheError> {
        Ok(Self {
            client: redis::Client::open(url)?,
            conn: OnceCell::new(),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        let conn = self
            .conn
            .get_or_try_init(|| ConnectionManager::new(self.client.clone()))
            .await?;
        Ok(conn.clone())
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.connection().await?;
        let found: bool = conn.exists(key).await?;
        Ok(found)
    }

    async fn exists_many(&self, keys: &[String]) -> Result<Vec<bool>, CacheError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut pipe = redis::pipe();
        for key in keys {
            pipe.exists(key);
        }
        let mut conn = self.connection().await?;
        let found: Vec<bool> = pipe.query_async(&mut conn).await?;
        Ok(found)
    }

    async fn push(&self, list: &str, payload: String) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let _: i64 = conn.lpush(list, payload).await?;
        Ok(())
    }
}

/// Lit une valeur JSON; absente ou vide => objet vide
pub async fn get_json_object(store: &dyn KvStore, key: &str) -> Result<Map<String, Value>, CacheError> {
    let raw = match store.get(key).await? {
        Some(raw) if !raw.trim().is_empty() => raw,
        _ => return Ok(Map::new()),
    };

    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(CacheError::Payload {
            key: key.to_string(),
            reason: "expected a JSON object".to_string(),
        }),
        Err(e) => Err(CacheError::Payload {
            key: key.to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Date du jour en Asia/Kolkata (UTC+05:30, pas d'heure d'été)
pub fn today_ist() -> NaiveDate {
    match FixedOffset::east_opt(IST_OFFSET_SECS) {
        Some(ist) => Utc::now().with_timezone(&ist).date_naive(),
        None => Utc::now().date_naive(),
    }
}

const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

pub fn holiday_key(date: NaiveDate) -> String {
    format!("today_holiday_users_{}", date.format("%Y-%m-%d"))
}

/// Utilisateurs en congé aujourd'hui. Une panne du cache donne une liste vide.
pub async fn get_user_holidays(store: &dyn KvStore) -> Map<String, Value> {
    let key = holiday_key(today_ist());
    match get_json_object(store, &key).await {
        Ok(map) => map,
        Err(e) => {
            tracing::error!(key = %key, "Error in getting holidays: {}", e);
            Map::new()
        }
    }
}

pub fn logout_key(refresh_token: &str) -> String {
    format!("jwt:{}", refresh_token)
}

/// Vrai si le refresh token a été invalidé par un logout
pub async fn is_token_revoked(store: &dyn KvStore, refresh_token: &str) -> Result<bool, CacheError> {
    store.exists(&logout_key(refresh_token)).await
}

pub fn heartbeat_key(process_name: &str) -> String {
    format!("process_heartbeat_{}", process_name)
}


#[cfg(test)]
mod tests {
    use super::memory::MemoryStore;
    use super::*;

    #[actix_web::test]
    async fn test_holidays_read_for_today() {
        let store = MemoryStore::default();
        store.set(&holiday_key(today_ist()), r#"{"jdoe": "Sick leave"}"#);

        let holidays = get_user_holidays(&store).await;
        assert!(holidays.contains_key("jdoe"));
    }

    #[actix_web::test]
    async fn test_holidays_degrade_on_cache_failure() {
        let store = MemoryStore::failing();
        assert!(get_user_holidays(&store).await.is_empty());
    }

    #[actix_web::test]
    async fn test_invalid_payload_is_reported() {
        let store = MemoryStore::default();
        store.set("bad", "[1, 2]");
        assert!(matches!(
            get_json_object(&store, "bad").await,
            Err(CacheError::Payload { .. })
        ));
    }

    #[actix_web::test]
    async fn test_exists_many_keeps_key_order() {
        let store = MemoryStore::default();
        store.set(&heartbeat_key("b"), "1");

        let keys = vec![heartbeat_key("a"), heartbeat_key("b")];
        assert_eq!(store.exists_many(&keys).await.unwrap(), vec![false, true]);
    }

    #[actix_web::test]
    async fn test_revoked_token_lookup() {
        let store = MemoryStore::default();
        store.set(&logout_key("abc"), "1");

        assert!(is_token_revoked(&store, "abc").await.unwrap());
        assert!(!is_token_revoked(&store, "other").await.unwrap());
    }
}
