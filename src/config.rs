//! Configuration management

use config::{builder::DefaultState, Config, ConfigBuilder, Environment, File};
use serde::Deserialize;

use crate::codec::SigningKeys;
use crate::error::ConfigError;
use crate::secret::Secret;
use crate::store::{CookiePolicy, DEFAULT_COOKIE_NAME, DEFAULT_MAX_AGE_SECS};

/// Environments served over plaintext, where `Secure` cookies would be dropped.
const LOCAL_ENVS: [&str; 3] = ["development", "local", "test"];

/// Top-level application settings.
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Process settings
    pub app: AppSettings,
    /// Session cookie settings
    pub session: SessionSettings,
    /// Seed operator for the bundled credential directory
    #[serde(default)]
    pub admin: Option<AdminSettings>,
}

/// Process settings.
#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    /// Deployment environment name
    pub env: String,
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
}

/// Session cookie settings.
#[derive(Debug, Deserialize)]
pub struct SessionSettings {
    /// Cookie name
    pub cookie_name: String,
    /// Cookie lifetime in seconds
    pub max_age_secs: i64,
    /// Signing secrets, current first
    #[serde(default)]
    pub secrets: Vec<Secret<String>>,
    /// Overrides the environment-derived `Secure` attribute
    #[serde(default)]
    pub secure: Option<bool>,
}

/// Operator account registered at startup.
#[derive(Debug, Deserialize)]
pub struct AdminSettings {
    /// Login email
    pub email: String,
    /// Login password
    pub password: Secret<String>,
    /// Roles granted on login
    #[serde(default)]
    pub roles: Vec<String>,
}

impl AppConfig {
    /// Builder pre-loaded with defaults for every optional key.
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Ok(Config::builder()
            .set_default("app.env", "development")?
            .set_default("app.host", "127.0.0.1")?
            .set_default("app.port", 8080)?
            .set_default("session.cookie_name", DEFAULT_COOKIE_NAME)?
            .set_default("session.max_age_secs", DEFAULT_MAX_AGE_SECS)?)
    }

    /// Loads defaults, `config/default.*`, `config/{APP__ENV}.*` and then
    /// environment variables such as `SESSION__SECRETS=new,old`.
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP__ENV").unwrap_or_else(|_| "development".into());
        let config = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::default()
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("session.secrets")
                    .with_list_parse_key("admin.roles"),
            )
            .build()?;
        Self::from_config(config)
    }

    /// Deserializes and checks an already-built [`Config`].
    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        let loaded: Self = config.try_deserialize()?;
        loaded.check()?;
        Ok(loaded)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.session.secrets.is_empty() || self.session.secrets.iter().any(Secret::is_blank) {
            return Err(ConfigError::NoSigningSecret);
        }
        if self.session.max_age_secs <= 0 {
            return Err(ConfigError::Invalid {
                key: "session.max_age_secs",
                reason: "must be positive".to_string(),
            });
        }
        if self.session.cookie_name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "session.cookie_name",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Returns `true` for environments served over plaintext.
    pub fn is_local(&self) -> bool {
        LOCAL_ENVS
            .iter()
            .any(|env| self.app.env.eq_ignore_ascii_case(env))
    }

    /// Whether session cookies carry `Secure`.
    pub fn secure_cookies(&self) -> bool {
        self.session.secure.unwrap_or_else(|| !self.is_local())
    }

    /// `host:port` to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.app.host, self.app.port)
    }

    /// Builds the session cookie policy, moving the signing secrets into it.
    ///
    /// The secrets are left empty afterwards, so a second call fails with
    /// [`ConfigError::NoSigningSecret`].
    pub fn take_cookie_policy(&mut self) -> Result<CookiePolicy, ConfigError> {
        let keys = SigningKeys::from_secrets(std::mem::take(&mut self.session.secrets))?;

        Ok(CookiePolicy::new(keys)
            .with_name(self.session.cookie_name.clone())
            .with_max_age_secs(self.session.max_age_secs)
            .with_secure(self.secure_cookies()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(overrides: &[(&str, config::Value)]) -> Result<AppConfig, ConfigError> {
        let mut builder = AppConfig::defaults()?;
        for (key, value) in overrides {
            builder = builder.set_override(*key, value.clone())?;
        }
        AppConfig::from_config(builder.build()?)
    }

    fn secrets(values: &[&str]) -> config::Value {
        let list: Vec<config::Value> = values.iter().map(|v| (*v).into()).collect();
        list.into()
    }

    #[test]
    fn defaults_apply() {
        let config = build(&[("session.secrets", secrets(&["k1"]))]).unwrap();

        assert_eq!(config.app.env, "development");
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.session.cookie_name, DEFAULT_COOKIE_NAME);
        assert_eq!(config.session.max_age_secs, DEFAULT_MAX_AGE_SECS);
        assert!(config.admin.is_none());
    }

    #[test]
    fn missing_secrets_is_an_error() {
        assert!(matches!(build(&[]), Err(ConfigError::NoSigningSecret)));
        assert!(matches!(
            build(&[("session.secrets", secrets(&["k1", " "]))]),
            Err(ConfigError::NoSigningSecret)
        ));
    }

    #[test]
    fn non_positive_max_age_is_invalid() {
        let result = build(&[
            ("session.secrets", secrets(&["k1"])),
            ("session.max_age_secs", 0.into()),
        ]);

        assert!(matches!(
            result,
            Err(ConfigError::Invalid { key: "session.max_age_secs", .. })
        ));
    }

    #[test]
    fn secure_follows_environment() {
        let dev = build(&[("session.secrets", secrets(&["k1"]))]).unwrap();
        let prod = build(&[
            ("session.secrets", secrets(&["k1"])),
            ("app.env", "production".into()),
        ])
        .unwrap();
        let forced = build(&[
            ("session.secrets", secrets(&["k1"])),
            ("session.secure", true.into()),
        ])
        .unwrap();

        assert!(!dev.secure_cookies());
        assert!(prod.secure_cookies());
        assert!(forced.secure_cookies());
    }

    #[test]
    fn cookie_policy_carries_settings() {
        let mut config = build(&[
            ("session.secrets", secrets(&["new", "old"])),
            ("session.cookie_name", "sid".into()),
            ("session.max_age_secs", 3600.into()),
        ])
        .unwrap();

        let policy = config.take_cookie_policy().unwrap();
        assert_eq!(policy.name(), "sid");
        assert_eq!(policy.max_age_secs(), 3600);
        assert_eq!(policy.keys().len(), 2);
        assert!(!policy.secure());
    }

    #[test]
    fn secrets_move_into_cookie_policy() {
        let mut config = build(&[("session.secrets", secrets(&["k1"]))]).unwrap();

        assert!(config.take_cookie_policy().is_ok());
        assert!(config.session.secrets.is_empty());
        assert!(matches!(
            config.take_cookie_policy(),
            Err(ConfigError::NoSigningSecret)
        ));
    }

    #[test]
    fn admin_seed_is_optional_with_roles() {
        let config = build(&[
            ("session.secrets", secrets(&["k1"])),
            ("admin.email", "admin@shop.test".into()),
            ("admin.password", "Secret123".into()),
            ("admin.roles", secrets(&["admin"])),
        ])
        .unwrap();

        let admin = config.admin.unwrap();
        assert_eq!(admin.email, "admin@shop.test");
        assert_eq!(admin.password.expose_secret(), "Secret123");
        assert_eq!(admin.roles, vec!["admin".to_string()]);
    }

    #[test]
    fn debug_redacts_secrets() {
        let config = build(&[("session.secrets", secrets(&["super-secret-key"]))]).unwrap();
        assert!(!format!("{:?}", config).contains("super-secret-key"));
    }
}
