use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::domain::user::UserId;

const TOKEN_TTL_HOURS: i64 = 1;

/// HS256 keys shared with the identity provider that issues bearer tokens.
#[derive(Clone)]
pub struct JwtKeys {
    secret: String,
}

impl JwtKeys {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    /// Tokens are normally minted by the identity provider; this exists for
    /// local tooling and tests.
    pub fn generate_token(&self, user_id: &UserId) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp() as usize,
            iat: now.timestamp() as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(data.claims)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_tokens_are_rejected() {
        let keys = JwtKeys::new("secret".into());
        let stale = Claims {
            sub: "user123".into(),
            exp: (Utc::now() - Duration::hours(2)).timestamp() as usize,
            iat: (Utc::now() - Duration::hours(3)).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &stale,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        assert!(keys.verify_token(&token).is_err());
    }

    #[test]
    fn fresh_tokens_round_trip() {
        let keys = JwtKeys::new("secret".into());
        let token = keys.generate_token(&UserId::parse("user123").unwrap()).unwrap();
        assert_eq!(keys.verify_token(&token).unwrap().sub, "user123");
    }
}
