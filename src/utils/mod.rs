use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    hash(password.as_bytes(), DEFAULT_COST)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password.as_bytes(), hash)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,     // ID de usuario
    pub email: String, // correo normalizado a minúsculas
    pub exp: i64,      // expiración
    pub iat: i64,      // emisión
}

pub fn generate_token(
    user_id: Uuid,
    email: &str,
    config: &Config,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let expiration = now
        .checked_add_signed(Duration::seconds(config.jwt_expiration().as_secs() as i64))
        .expect("valid timestamp")
        .timestamp();

    let claims = Claims {
        sub: user_id,
        email: email.to_lowercase(),
        exp: expiration,
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
}

pub fn verify_token(token: &str, config: &Config) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

/// Structural email check, enough to reject obvious garbage before it reaches
/// the database as an invitee address.
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.contains(char::is_whitespace)
}

/// Date-range query params arrive as ISO-8601 strings, either full timestamps
/// or bare dates (treated as midnight UTC).
pub fn parse_iso_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn test_config() -> Config {
        Config {
            database_url: "postgres://localhost/test".into(),
            redis_url: "redis://127.0.0.1/".into(),
            jwt_secret: "super-secret-test-key".into(),
            jwt_expiration_secs: 3600,
            rate_limit_window_secs: 60,
            rate_limit_requests: 100,
            server_host: "::".into(),
            server_port: 3001,
        }
    }

    #[test]
    fn token_round_trip_preserves_identity() {
        let config = test_config();
        let user_id = Uuid::new_v4();
        let token = generate_token(user_id, "Ana@Piso.COM", &config).unwrap();
        let claims = verify_token(&token, &config).unwrap();

        assert_eq!(claims.sub, user_id);
        // el correo se guarda siempre en minúsculas
        assert_eq!(claims.email, "ana@piso.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn token_with_wrong_secret_is_rejected() {
        let config = test_config();
        let token = generate_token(Uuid::new_v4(), "a@b.com", &config).unwrap();

        let mut other = test_config();
        other.jwt_secret = "another-secret".into();
        assert!(verify_token(&token, &other).is_err());
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("contraseña123").unwrap();
        assert!(verify_password("contraseña123", &hash).unwrap());
        assert!(!verify_password("otra", &hash).unwrap());
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("ana@piso.com"));
        assert!(is_valid_email("ana.garcia+x@sub.piso.com"));
        assert!(!is_valid_email("ana"));
        assert!(!is_valid_email("@piso.com"));
        assert!(!is_valid_email("ana@"));
        assert!(!is_valid_email("ana@piso"));
        assert!(!is_valid_email("ana maria@piso.com"));
    }

    #[test]
    fn iso_dates_accept_both_forms() {
        let bare = parse_iso_date("2024-03-15").unwrap();
        assert_eq!(bare.to_rfc3339(), "2024-03-15T00:00:00+00:00");

        let full = parse_iso_date("2024-03-15T18:30:00Z").unwrap();
        assert_eq!(full.timestamp(), 1710527400);

        assert!(parse_iso_date("no-es-fecha").is_none());
    }
}
