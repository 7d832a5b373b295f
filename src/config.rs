use anyhow::Context;
use std::str::FromStr;

const DEFAULT_JWT_SECRET: &str = "course-catalog-dev-secret";
/// One year; keeps expiry arithmetic far away from overflow
const MAX_TOKEN_EXPIRATION_MINUTES: i64 = 60 * 24 * 365;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_minutes: i64,
}

/// Administrator created at startup when `ADMIN_EMAIL` and `ADMIN_PASSWORD` are set
#[derive(Clone)]
pub struct AdminBootstrap {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for AdminBootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminBootstrap")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Postgres is used when set, in-memory repositories otherwise
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub run_migrations: bool,
    pub jwt: JwtConfig,
    pub admin: Option<AdminBootstrap>,
}

impl AppConfig {
    /// Reads configuration from the process environment (after loading `.env`).
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let expiration_minutes: i64 = parsed(&lookup, "TOKEN_EXPIRATION_MINUTES", 60 * 24 * 7)?;
        if !(1..=MAX_TOKEN_EXPIRATION_MINUTES).contains(&expiration_minutes) {
            anyhow::bail!(
                "TOKEN_EXPIRATION_MINUTES must be between 1 and {MAX_TOKEN_EXPIRATION_MINUTES}, \
                 got {expiration_minutes}"
            );
        }

        let jwt = JwtConfig {
            secret: lookup("JWT_SECRET").unwrap_or_else(|| DEFAULT_JWT_SECRET.into()),
            expiration_minutes,
        };

        let admin = match (lookup("ADMIN_EMAIL"), lookup("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminBootstrap {
                name: lookup("ADMIN_NAME").unwrap_or_else(|| "Administrator".into()),
                email,
                password,
            }),
            (None, None) => None,
            _ => anyhow::bail!("ADMIN_EMAIL and ADMIN_PASSWORD must be set together"),
        };

        Ok(Self {
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parsed(&lookup, "APP_PORT", 8080)?,
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            max_connections: parsed(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            run_migrations: parsed(&lookup, "RUN_MIGRATIONS", true)?,
            jwt,
            admin,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn uses_default_secret(&self) -> bool {
        self.jwt.secret == DEFAULT_JWT_SECRET
    }
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        None => Ok(default),
    }
}
