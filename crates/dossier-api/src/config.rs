use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, bail};

use dossier_core::intake::MAX_UPLOAD_BYTES;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "your-secret-key",
];

/// Server configuration loaded from environment variables.
///
/// | Env Var                     | Default                 |
/// |-----------------------------|-------------------------|
/// | `DOSSIER_HOST`              | `0.0.0.0`               |
/// | `DOSSIER_PORT`              | `5000`                  |
/// | `DOSSIER_DB_PATH`           | `dossier.db`            |
/// | `DOSSIER_UPLOAD_DIR`        | `uploads`               |
/// | `DOSSIER_JWT_SECRET`        | required                |
/// | `DOSSIER_TOKEN_TTL_DAYS`    | `7`                     |
/// | `DOSSIER_MAX_UPLOAD_BYTES`  | `10485760`              |
/// | `DOSSIER_CORS_ORIGIN`       | `http://localhost:3000` |
/// | `DOSSIER_PUBLIC_URL`        | `http://localhost:5000` |
/// | `DOSSIER_FRONTEND_URL`      | `http://localhost:3000` |
/// | `DOSSIER_ENV`               | `development`           |
/// | `DOSSIER_ADMIN_EMAIL`       | unset                   |
/// | `DOSSIER_ADMIN_PASSWORD`    | unset                   |
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub upload_dir: PathBuf,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    pub max_upload_bytes: u64,
    pub cors_origin: String,
    /// Base URL of this API, used in emailed verification links.
    pub public_url: String,
    /// Where browsers land after following a verification link.
    pub frontend_url: String,
    pub environment: String,
    pub bootstrap_admin: Option<AdminSeed>,
}

/// Credentials for the admin account created at startup.
#[derive(Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSeed")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. `from_env` passes the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let jwt_secret = lookup("DOSSIER_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("DOSSIER_JWT_SECRET is unset or still a placeholder");
        }

        let bootstrap_admin = match (lookup("DOSSIER_ADMIN_EMAIL"), lookup("DOSSIER_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Some(AdminSeed { email, password })
            }
            _ => None,
        };

        Ok(Self {
            host: var("DOSSIER_HOST", "0.0.0.0"),
            port: parse(&lookup, "DOSSIER_PORT", 5000)?,
            db_path: var("DOSSIER_DB_PATH", "dossier.db").into(),
            upload_dir: var("DOSSIER_UPLOAD_DIR", "uploads").into(),
            jwt_secret,
            token_ttl_days: parse(&lookup, "DOSSIER_TOKEN_TTL_DAYS", 7)?,
            max_upload_bytes: parse(&lookup, "DOSSIER_MAX_UPLOAD_BYTES", MAX_UPLOAD_BYTES)?,
            cors_origin: var("DOSSIER_CORS_ORIGIN", "http://localhost:3000"),
            public_url: trim_slash(var("DOSSIER_PUBLIC_URL", "http://localhost:5000")),
            frontend_url: trim_slash(var("DOSSIER_FRONTEND_URL", "http://localhost:3000")),
            environment: var("DOSSIER_ENV", "development"),
            bootstrap_admin,
        })
    }
}

fn parse<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

fn trim_slash(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
