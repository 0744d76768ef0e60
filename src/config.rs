use serde::Deserialize;
use time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Outbound SMTP settings. `None` at the `AppConfig` level when `SMTP_HOST`
/// is not set.
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub from_address: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub cookie_ttl_days: i64,
    pub reset_token_ttl_minutes: i64,
    pub public_origin: String,
    pub smtp: Option<SmtpConfig>,
}

impl SmtpConfig {
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            host,
            port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(587),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| "noreply@storefront.local".into()),
            username: std::env::var("SMTP_USER").ok(),
            password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "storefront".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "storefront-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24),
        };
        Ok(Self {
            database_url,
            jwt,
            cookie_ttl_days: std::env::var("COOKIE_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(5),
            reset_token_ttl_minutes: std::env::var("RESET_TOKEN_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(15),
            public_origin: std::env::var("PUBLIC_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:8080".into()),
            smtp: SmtpConfig::from_env(),
        })
    }

    pub fn cookie_ttl(&self) -> Duration {
        Duration::days(self.cookie_ttl_days)
    }

    pub fn reset_token_ttl(&self) -> Duration {
        Duration::minutes(self.reset_token_ttl_minutes)
    }
}
