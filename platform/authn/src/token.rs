//! JWT access tokens. HS256 with a `typ` claim so refresh tokens can never
//! pass as access tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

const ACCESS_TOKEN_TYPE: &str = "access";

#[derive(Clone, Debug)]
pub struct TokenConfig {
    pub secret: String,
    pub ttl_minutes: i64,
}

impl TokenConfig {
    pub fn new(secret: impl Into<String>, ttl_minutes: i64) -> Self {
        Self {
            secret: secret.into(),
            ttl_minutes,
        }
    }

    fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(self.secret.as_bytes())
    }

    fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(self.secret.as_bytes())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid,
    pub typ: String,
    pub exp: usize,
    pub iat: usize,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token rejected")]
    Invalid(#[from] jsonwebtoken::errors::Error),
    #[error("unexpected token type {0:?}")]
    WrongType(String),
}

pub fn issue_token(user_id: Uuid, config: &TokenConfig) -> Result<String, TokenError> {
    let now = Utc::now();
    let exp = now
        .checked_add_signed(Duration::minutes(config.ttl_minutes))
        .unwrap_or(now)
        .timestamp() as usize;
    let claims = AccessClaims {
        sub: user_id,
        typ: ACCESS_TOKEN_TYPE.to_string(),
        exp,
        iat: now.timestamp() as usize,
    };
    jsonwebtoken::encode(&Header::default(), &claims, &config.encoding_key()).map_err(Into::into)
}

pub fn verify_token(token: &str, config: &TokenConfig) -> Result<AccessClaims, TokenError> {
    let claims =
        jsonwebtoken::decode::<AccessClaims>(token, &config.decoding_key(), &Validation::default())
            .map(|data| data.claims)?;
    if claims.typ != ACCESS_TOKEN_TYPE {
        return Err(TokenError::WrongType(claims.typ));
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TokenConfig {
        TokenConfig::new("test-secret-at-least-32-bytes-long", 30)
    }

    #[test]
    fn issued_tokens_verify() {
        let user_id = Uuid::new_v4();
        let token = issue_token(user_id, &config()).expect("issue");
        let claims = verify_token(&token, &config()).expect("verify");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.typ, "access");
    }

    #[test]
    fn tokens_signed_with_a_different_secret_are_rejected() {
        let token = issue_token(Uuid::new_v4(), &config()).expect("issue");
        let other = TokenConfig::new("another-secret-also-32-bytes-long!", 30);
        assert!(matches!(
            verify_token(&token, &other),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn garbage_tokens_are_rejected() {
        assert!(verify_token("not-a-jwt", &config()).is_err());
    }
}
