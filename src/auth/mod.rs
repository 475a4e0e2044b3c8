use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config;

/// Identity carried by every protected request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub corporate_account: String,
    pub user_id: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(corporate_account: impl Into<String>, user_id: impl Into<String>) -> Self {
        let expiry_hours = config::config().security.jwt_expiry_hours;
        Self::with_expiry(corporate_account, user_id, Duration::hours(expiry_hours as i64))
    }

    pub fn with_expiry(corporate_account: impl Into<String>, user_id: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            corporate_account: corporate_account.into(),
            user_id: user_id.into(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT secret not configured")]
    InvalidSecret,

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),
}

pub fn generate_jwt(claims: &Claims) -> Result<String, JwtError> {
    encode_with_secret(claims, &config::config().security.jwt_secret)
}

pub fn validate_jwt(token: &str) -> Result<Claims, JwtError> {
    decode_with_secret(token, &config::config().security.jwt_secret)
}

pub fn encode_with_secret(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

pub fn decode_with_secret(token: &str, secret: &str) -> Result<Claims, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let token_data = decode::<Claims>(token, &decoding_key, &Validation::default())
        .map_err(|e| JwtError::InvalidToken(e.to_string()))?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips_identity() {
        let token = encode_with_secret(&Claims::with_expiry("ACME", "u1", Duration::hours(1)), "s3cret").unwrap();
        let claims = decode_with_secret(&token, "s3cret").unwrap();
        assert_eq!(claims.corporate_account, "ACME");
        assert_eq!(claims.user_id, "u1");
    }

    #[test]
    fn wrong_secret_and_expired_tokens_are_rejected() {
        let token = encode_with_secret(&Claims::with_expiry("ACME", "u1", Duration::hours(1)), "s3cret").unwrap();
        assert!(matches!(decode_with_secret(&token, "other"), Err(JwtError::InvalidToken(_))));

        let expired = encode_with_secret(&Claims::with_expiry("ACME", "u1", Duration::hours(-2)), "s3cret").unwrap();
        assert!(matches!(decode_with_secret(&expired, "s3cret"), Err(JwtError::InvalidToken(_))));
    }

    #[test]
    fn empty_secret_is_refused() {
        let claims = Claims::with_expiry("ACME", "u1", Duration::hours(1));
        assert!(matches!(encode_with_secret(&claims, ""), Err(JwtError::InvalidSecret)));
    }
}
