use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::config::JwtConfig;
use crate::state::AppState;

/// Name of the session cookie carrying the signed token.
pub const SESSION_COOKIE: &str = "token";

/// Cookie string that expires the session immediately (logout).
pub const EXPIRED_SESSION_COOKIE: &str = "token=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0";

/// Holds JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::from_secs((cfg.ttl_minutes as u64) * 60),
        }
    }

    /// Sign a fresh session token for the given user.
    pub fn sign(&self, user_id: Uuid) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "session token signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, "session token verified");
        Ok(data.claims)
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::from_config(&state.config.jwt)
    }
}

/// Frame a signed token as the HTTP-only session cookie.
pub fn session_cookie(token: &str, ttl: time::Duration) -> String {
    format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        ttl.whole_seconds()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;

    fn make_keys() -> JwtKeys {
        JwtKeys::from_config(&JwtConfig {
            secret: "test-secret".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 5,
        })
    }

    #[test]
    fn sign_and_verify_roundtrip() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys.sign(user_id).expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn verify_rejects_foreign_secret() {
        let keys = make_keys();
        let other = JwtKeys::from_config(&JwtConfig {
            secret: "another-secret".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 5,
        });
        let token = other.sign(Uuid::new_v4()).expect("sign");
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_expired_token() {
        let keys = make_keys();
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: Uuid::new_v4(),
            iat: (now - TimeDuration::hours(2)).unix_timestamp() as usize,
            exp: (now - TimeDuration::hours(1)).unix_timestamp() as usize,
            iss: "test-issuer".into(),
            aud: "test-aud".into(),
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).expect("encode");
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn session_cookie_is_http_only_with_max_age() {
        let cookie = session_cookie("abc.def.ghi", time::Duration::days(5));
        assert!(cookie.starts_with("token=abc.def.ghi;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=432000"));
    }

    #[test]
    fn expired_cookie_clears_the_token() {
        assert!(EXPIRED_SESSION_COOKIE.starts_with("token=;"));
        assert!(EXPIRED_SESSION_COOKIE.contains("Max-Age=0"));
    }
}
