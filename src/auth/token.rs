use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::{config::AuthConfig, error::AuthError, state::AppState};

/// Token payload: the user id plus issue/expiry timestamps.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: usize,
    pub exp: usize,
}

/// Signing and verification keys, built once from configuration.
#[derive(Clone)]
pub struct TokenKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub ttl: Duration,
}

impl FromRef<AppState> for TokenKeys {
    fn from_ref(state: &AppState) -> Self {
        let AuthConfig {
            token_secret,
            token_ttl_minutes,
            ..
        } = state.config.auth.clone();
        Self {
            encoding: EncodingKey::from_secret(token_secret.as_bytes()),
            decoding: DecodingKey::from_secret(token_secret.as_bytes()),
            ttl: Duration::from_secs((token_ttl_minutes as u64) * 60),
        }
    }
}

impl TokenKeys {
    #[cfg(test)]
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::from_secs(ttl_minutes.max(0) as u64 * 60),
        }
    }

    /// Sign a token for the given user. Returns the token together with its
    /// unix-seconds expiry so the caller can persist both.
    pub fn issue(&self, user_id: Uuid) -> Result<(String, i64), AuthError> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        // A signing failure is a server-side fault, not a bad credential.
        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AuthError::TokenSign(e.to_string()))?;
        debug!(user_id = %user_id, "token issued");
        Ok((token, exp.unix_timestamp()))
    }

    /// Verify signature and expiry, returning the claims.
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::default();
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, "token verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_and_decode_roundtrip() {
        let keys = TokenKeys::new("dev-secret", 5);
        let user_id = Uuid::new_v4();
        let (token, exp) = keys.issue(user_id).expect("issue");
        let claims = keys.decode(&token).expect("decode");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.exp as i64, exp);
    }

    #[test]
    fn decode_rejects_garbage() {
        let keys = TokenKeys::new("dev-secret", 5);
        let err = keys.decode("garbage").unwrap_err();
        assert!(matches!(err, AuthError::TokenDecode(_)));
    }

    #[test]
    fn decode_rejects_wrong_secret() {
        let good = TokenKeys::new("secret-a", 5);
        let bad = TokenKeys::new("secret-b", 5);
        let (token, _) = good.issue(Uuid::new_v4()).expect("issue");
        let err = bad.decode(&token).unwrap_err();
        assert!(matches!(err, AuthError::TokenDecode(_)));
    }

    #[test]
    fn decode_rejects_tampered_token() {
        let keys = TokenKeys::new("dev-secret", 5);
        let (token, _) = keys.issue(Uuid::new_v4()).expect("issue");
        let mut tampered = token.clone();
        // Flip the last signature character
        let last = tampered.pop().expect("non-empty token");
        tampered.push(if last == 'A' { 'B' } else { 'A' });
        assert!(keys.decode(&tampered).is_err());
    }

    #[test]
    fn decode_rejects_expired_token() {
        // TTL clamps to zero, so exp == iat; default validation leeway is
        // 60 seconds, so shrink it to catch the expiry.
        let keys = TokenKeys::new("dev-secret", 0);
        let (token, _) = keys.issue(Uuid::new_v4()).expect("issue");
        let mut validation = Validation::default();
        validation.leeway = 0;
        std::thread::sleep(std::time::Duration::from_secs(1));
        let err = decode::<Claims>(&token, &keys.decoding, &validation).unwrap_err();
        assert!(matches!(
            err.kind(),
            jsonwebtoken::errors::ErrorKind::ExpiredSignature
        ));
    }
}
