use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::Hmac;
use pbkdf2::pbkdf2;
use rand::{Rng, distributions::Alphanumeric};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "pbkdf2_sha256";
#[cfg(not(test))]
const ITERATIONS: u32 = 600_000;
// hash rapide pour les tests
#[cfg(test)]
const ITERATIONS: u32 = 1_000;
const KEY_LENGTH: usize = 32;
const SALT_LENGTH: usize = 22;

/// Hash un mot de passe au format Django (compatible avec la table auth_user)
/// Format: pbkdf2_sha256$iterations$salt$hash (hash en base64 standard)
pub fn hash_password(password: &str) -> Result<String, String> {
    hash_with_iterations(password, ITERATIONS)
}

fn hash_with_iterations(password: &str, iterations: u32) -> Result<String, String> {
    let salt: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SALT_LENGTH)
        .map(char::from)
        .collect();

    let mut key = [0u8; KEY_LENGTH];
    pbkdf2::<HmacSha256>(password.as_bytes(), salt.as_bytes(), iterations, &mut key)
        .map_err(|e| format!("PBKDF2 hash generation failed: {}", e))?;

    Ok(format!("{}${}${}${}", ALGORITHM, iterations, salt, STANDARD.encode(key)))
}

/// Vérifie un mot de passe contre un hash Django
#[cfg(test)]
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, String> {
    let parts: Vec<&str> = stored_hash.splitn(4, '$').collect();
    if parts.len() != 4 {
        return Err("Invalid hash format".to_string());
    }
    if parts[0] != ALGORITHM {
        return Err(format!("Unsupported algorithm: {}", parts[0]));
    }

    let iterations = parts[1]
        .parse::<u32>()
        .map_err(|_| "Invalid iterations".to_string())?;
    let salt = parts[2];
    let expected_hash = STANDARD
        .decode(parts[3])
        .map_err(|e| format!("Base64 decode failed: {}", e))?;

    let mut computed = vec![0u8; expected_hash.len()];
    pbkdf2::<HmacSha256>(password.as_bytes(), salt.as_bytes(), iterations, &mut computed)
        .map_err(|e| format!("PBKDF2 hash verification failed: {}", e))?;

    Ok(constant_time_eq(&computed, &expected_hash))
}

#[cfg(test)]
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_with_iterations("s3cret-pass", 1_000).unwrap();

        assert!(hash.starts_with("pbkdf2_sha256$1000$"));
        assert!(verify_password("s3cret-pass", &hash).unwrap());
        assert!(!verify_password("wrong-pass", &hash).unwrap());
    }

    #[test]
    fn test_salts_differ() {
        let a = hash_with_iterations("same", 1_000).unwrap();
        let b = hash_with_iterations("same", 1_000).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_rejects_other_formats() {
        assert!(verify_password("x", "bcrypt$2b$12$abc").is_err());
        assert!(verify_password("x", "garbage").is_err());
    }
}
