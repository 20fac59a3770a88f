use anyhow::{bail, Context, Result};

/// How admitted jobs reach an executor.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchMode {
    /// Run the executor on this process's tokio runtime.
    Local,
    /// Send events to Inngest; it calls back into `/api/inngest`.
    Inngest {
        base_url: String,
        event_key: String,
    },
}

/// Clerk session-token verification settings.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// PEM public key (RS256) or shared secret (HS256).
    pub jwt_key: String,
    pub issuer: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OneSignalConfig {
    pub app_id: String,
    pub rest_api_key: String,
}

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub gemini_api_key: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub s3_public_url: Option<String>,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    /// `None` disables token checks; the body `userId` is trusted (local development only).
    pub auth: Option<AuthConfig>,
    pub dispatch: DispatchMode,
    /// Shared secret the external executor presents on `/api/inngest`.
    pub executor_secret: Option<String>,
    pub onesignal: Option<OneSignalConfig>,
    pub app_url: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let dispatch = match optional_env("DISPATCH_MODE").as_deref() {
            None | Some("local") => DispatchMode::Local,
            Some("inngest") => DispatchMode::Inngest {
                base_url: optional_env("INNGEST_BASE_URL")
                    .unwrap_or_else(|| "https://inn.gs".to_string()),
                event_key: require_env("INNGEST_EVENT_KEY")?,
            },
            Some(other) => bail!("DISPATCH_MODE must be 'local' or 'inngest', got '{other}'"),
        };

        let executor_secret = optional_env("EXECUTOR_SECRET");
        if matches!(dispatch, DispatchMode::Inngest { .. }) && executor_secret.is_none() {
            bail!("EXECUTOR_SECRET is required when DISPATCH_MODE=inngest");
        }

        let onesignal = match (
            optional_env("ONESIGNAL_APP_ID"),
            optional_env("ONESIGNAL_REST_API_KEY"),
        ) {
            (Some(app_id), Some(rest_api_key)) => Some(OneSignalConfig {
                app_id,
                rest_api_key,
            }),
            _ => None,
        };

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            s3_public_url: optional_env("S3_PUBLIC_URL"),
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            auth: optional_env("CLERK_JWT_KEY").map(|jwt_key| AuthConfig {
                jwt_key,
                issuer: optional_env("CLERK_ISSUER"),
            }),
            dispatch,
            executor_secret,
            onesignal,
            app_url: optional_env("APP_URL").unwrap_or_else(|| "http://localhost:3000".to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Unset and blank are treated the same.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
