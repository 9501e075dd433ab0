use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::Role;

/// Identity and role carried by every bearer token. The role is trusted
/// from the claim for the token's lifetime; no database lookup happens
/// on verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("token error: {0}")]
    Token(String),
}

#[derive(Clone)]
pub struct JwtManager {
    secret: String,
    ttl: Duration,
}

const TOKEN_TTL_DAYS: i64 = 7;

impl JwtManager {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ttl: Duration::days(TOKEN_TTL_DAYS),
        }
    }

    #[cfg(test)]
    fn with_ttl(secret: impl Into<String>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }

    pub fn issue(&self, user_id: Uuid, role: Role) -> Result<String, JwtError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| JwtError::Token(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| JwtError::Token(e.to_string()))?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips_id_and_role() {
        let jwt = JwtManager::new("test-secret");
        let id = Uuid::new_v4();
        let token = jwt.issue(id, Role::Organizer).unwrap();
        let claims = jwt.verify(&token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.role, Role::Organizer);
    }

    #[test]
    fn expired_token_is_rejected() {
        let jwt = JwtManager::with_ttl("test-secret", Duration::days(-1));
        let token = jwt.issue(Uuid::new_v4(), Role::Student).unwrap();
        assert!(jwt.verify(&token).is_err());
    }

    #[test]
    fn tampered_token_is_rejected() {
        let jwt = JwtManager::new("test-secret");
        let token = jwt.issue(Uuid::new_v4(), Role::Student).unwrap();
        let mut tampered = token.clone();
        tampered.pop();
        tampered.push(if token.ends_with('A') { 'B' } else { 'A' });
        assert!(jwt.verify(&tampered).is_err());
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let issuer = JwtManager::new("secret-one");
        let verifier = JwtManager::new("secret-two");
        let token = issuer.issue(Uuid::new_v4(), Role::Admin).unwrap();
        assert!(verifier.verify(&token).is_err());
    }
}
