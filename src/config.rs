use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_ALLOWED_ORIGINS: &str = "https://rentlify.vercel.app,http://localhost:5173";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("missing required setting `{0}`")]
    Missing(&'static str),
}

/// Process configuration. Read once at start-up from an optional
/// `appsettings` file and then the environment (which wins).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database_url: String,
    pub database_pool_size: u32,
    pub database_timeout_seconds: u64,
    /// Signing secret for customer tokens.
    pub jwt_token: String,
    /// Signing secret for staff tokens.
    pub jwt_user_token: String,
    pub host: String,
    pub port: u16,
    pub allowed_origins: String,
    pub stripe_secret_key: Option<String>,
    pub stripe_api_base: String,
    pub public_url: String,
    pub email_validation: bool,
    pub smtp_host: Option<String>,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub mail_from: Option<String>,
}

impl Settings {
    pub fn load() -> Result<Self, SettingsError> {
        let raw = Config::builder()
            .set_default("database_pool_size", 10)?
            .set_default("database_timeout_seconds", 30)?
            .set_default("host", "0.0.0.0")?
            .set_default("port", 5000)?
            .set_default("allowed_origins", DEFAULT_ALLOWED_ORIGINS)?
            .set_default("stripe_api_base", "https://api.stripe.com")?
            .set_default("public_url", "http://localhost:5000")?
            .set_default("email_validation", false)?
            .add_source(File::with_name("appsettings").required(false))
            .add_source(Environment::default().try_parsing(true))
            .build()?;

        let settings: Settings = raw.try_deserialize()?;
        settings.check()?;
        Ok(settings)
    }

    fn check(&self) -> Result<(), SettingsError> {
        if self.database_url.trim().is_empty() {
            return Err(SettingsError::Missing("DATABASE_URL"));
        }
        if self.jwt_token.trim().is_empty() {
            return Err(SettingsError::Missing("JWT_TOKEN"));
        }
        if self.jwt_user_token.trim().is_empty() {
            return Err(SettingsError::Missing("JWT_USER_TOKEN"));
        }
        Ok(())
    }

    pub fn allowed_origins(&self) -> Vec<&str> {
        self.allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .collect()
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }

    pub fn validation_url(&self, customer_id: uuid::Uuid) -> String {
        format!(
            "{}/v1/customers/validate/{customer_id}",
            self.public_url.trim_end_matches('/')
        )
    }
}
