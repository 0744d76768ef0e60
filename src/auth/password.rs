use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};

/// Length of the cleartext reset token embedded in the emailed URL.
const RESET_TOKEN_LENGTH: usize = 40;

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| anyhow::anyhow!("stored password hash is malformed: {e}"))?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// A freshly generated reset credential.
///
/// Only `hash` and `expires_at` are persisted; `cleartext` is transmitted
/// once via email and then dropped.
pub struct ResetToken {
    pub cleartext: String,
    pub hash: String,
    pub expires_at: OffsetDateTime,
}

impl ResetToken {
    pub fn generate(ttl: Duration) -> Self {
        let cleartext: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(RESET_TOKEN_LENGTH)
            .map(char::from)
            .collect();
        let hash = hash_reset_token(&cleartext);
        Self {
            cleartext,
            hash,
            expires_at: OffsetDateTime::now_utc() + ttl,
        }
    }
}

/// SHA-256 hex digest of a cleartext reset token, as stored in the database.
pub fn hash_reset_token(cleartext: &str) -> String {
    let digest = Sha256::digest(cleartext.as_bytes());
    format!("{digest:x}")
}
