//! HS256 session tokens carried in the session cookie.

use chrono::{Duration, Utc};
use domains::{DomainError, DomainResult, SessionTokens, UserId};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// User id as a decimal string
    sub: String,
    iat: i64,
    exp: i64,
}

pub struct JwtSessionTokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtSessionTokens {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
            ttl,
        }
    }
}

impl SessionTokens for JwtSessionTokens {
    fn issue(&self, user_id: UserId) -> DomainResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(DomainError::internal)
    }

    fn verify(&self, token: &str) -> Option<UserId> {
        match decode::<Claims>(token, &self.decoding, &self.validation) {
            Ok(data) => data.claims.sub.parse().ok(),
            Err(err) => {
                debug!(error = %err, "rejected session token");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret-with-enough-entropy";

    #[test]
    fn issued_token_verifies() {
        let tokens = JwtSessionTokens::new(SECRET, Duration::hours(1));
        let token = tokens.issue(42).unwrap();
        assert_eq!(tokens.verify(&token), Some(42));
    }

    #[test]
    fn other_secret_is_rejected() {
        let token = JwtSessionTokens::new(SECRET, Duration::hours(1))
            .issue(42)
            .unwrap();
        let other = JwtSessionTokens::new(b"another-secret", Duration::hours(1));
        assert_eq!(other.verify(&token), None);
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = JwtSessionTokens::new(SECRET, Duration::minutes(-10));
        let token = tokens.issue(42).unwrap();
        assert_eq!(tokens.verify(&token), None);
    }

    #[test]
    fn garbage_is_rejected() {
        let tokens = JwtSessionTokens::new(SECRET, Duration::hours(1));
        assert_eq!(tokens.verify("not.a.token"), None);
    }
}
