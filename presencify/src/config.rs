//! Configuration loading for the site server.
//!
//! Loads configuration from TOML files and/or environment variables using figment.
//!
//! # Configuration Sources (in order of priority, lowest to highest)
//!
//! 1. Default values (from `#[serde(default)]` attributes)
//! 2. TOML config file (if it exists)
//! 3. Environment variables (prefix: `PRESENCIFY_`, nested with `__`)
//!
//! - `PRESENCIFY_SERVER__LISTEN_ADDR` → `server.listen_addr`
//! - `PRESENCIFY_BACKEND__KIND` → `backend.kind`
//! - `PRESENCIFY_HOSTED__URL` → `hosted.url`
//! - `PRESENCIFY_HOSTED__ANON_KEY` → `hosted.anon_key`

use anyhow::{Context, Result, bail};
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "PRESENCIFY_";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub hosted: Option<HostedConfig>,

    #[serde(default)]
    pub site: SiteConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Mark cookies `Secure`. Enable when served over HTTPS.
    #[serde(default)]
    pub secure_cookies: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            secure_cookies: false,
        }
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Lifetime of a sign-in session.
    #[serde(default = "default_session_timeout")]
    pub timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_session_timeout(),
        }
    }
}

fn default_session_timeout() -> u64 {
    7 * 24 * 3600
}

/// Upper bound on `session.timeout_secs` (one year).
pub const MAX_SESSION_TIMEOUT_SECS: u64 = 365 * 24 * 3600;

/// Which backend serves auth and data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Local database through sqlx.
    #[default]
    Sql,
    /// Hosted PostgREST + GoTrue service.
    Hosted,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,
}

/// Hosted backend endpoint and public key.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HostedConfig {
    /// Project base URL, e.g. `https://abc.supabase.co`.
    pub url: String,

    /// Public (anon) API key. Row-level rules decide what it can see.
    pub anon_key: String,
}

/// Contact details shown on the contact page.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteConfig {
    #[serde(default = "default_contact_email")]
    pub contact_email: String,

    #[serde(default = "default_contact_phone")]
    pub contact_phone: String,

    #[serde(default = "default_office")]
    pub office: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            contact_email: default_contact_email(),
            contact_phone: default_contact_phone(),
            office: default_office(),
        }
    }
}

fn default_contact_email() -> String {
    "hello@presencify.com".to_string()
}

fn default_contact_phone() -> String {
    "+1 (555) 123-4567".to_string()
}

fn default_office() -> String {
    "123 Tech Street, San Francisco, CA 94105".to_string()
}

// =============================================================================
// Database Configuration (compile-time feature selection)
// =============================================================================

/// SQLite configuration (when compiled with `--features sqlite`)
#[cfg(feature = "sqlite")]
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database file path. Defaults to `<data_dir>/presencify.db`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// PostgreSQL configuration (when compiled with `--features postgres`)
#[cfg(feature = "postgres")]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_postgres_host")]
    pub host: String,

    #[serde(default = "default_postgres_port")]
    pub port: u16,

    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_postgres_database")]
    pub database: String,
}

#[cfg(feature = "postgres")]
fn default_postgres_host() -> String {
    "localhost".to_string()
}

#[cfg(feature = "postgres")]
fn default_postgres_port() -> u16 {
    5432
}

#[cfg(feature = "postgres")]
fn default_postgres_database() -> String {
    "presencify".to_string()
}

#[cfg(feature = "postgres")]
impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: default_postgres_host(),
            port: default_postgres_port(),
            user: String::new(),
            password: String::new(),
            database: default_postgres_database(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file (if present) with environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        Self::from_figment(Self::figment(path))
    }

    fn figment(path: &Path) -> Figment {
        let mut figment = Figment::new();

        if path.exists() {
            figment = figment.merge(Toml::file(path));
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment
            .extract()
            .context("Failed to load configuration from file and environment")?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field requirements serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.backend.kind == BackendKind::Hosted {
            match &self.hosted {
                None => bail!("backend.kind = \"hosted\" requires a [hosted] section"),
                Some(h) if h.url.trim().is_empty() || h.anon_key.trim().is_empty() => {
                    bail!("[hosted] needs both url and anon_key")
                }
                Some(_) => {}
            }
        }
        self.server
            .listen_addr
            .parse::<std::net::SocketAddr>()
            .with_context(|| format!("Invalid listen address: {}", self.server.listen_addr))?;
        let timeout = self.session.timeout_secs;
        if timeout == 0 || timeout > MAX_SESSION_TIMEOUT_SECS {
            bail!(
                "session.timeout_secs must be between 1 and {MAX_SESSION_TIMEOUT_SECS}, got {timeout}"
            );
        }
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("presencify")
            .join("config.toml")
    }

    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("presencify")
    }
}

pub fn default_config_template() -> String {
    let data_dir = Config::default_data_dir();
    let data_dir_str = data_dir.display();

    format!(
        r#"# Presencify site configuration
# Data directory: {data_dir_str}

[server]
listen_addr = "0.0.0.0:8080"
# Set when the site is served over HTTPS
secure_cookies = false

[session]
# Sign-in session lifetime (seconds)
timeout_secs = 604800

[site]
contact_email = "hello@presencify.com"
contact_phone = "+1 (555) 123-4567"
office = "123 Tech Street, San Francisco, CA 94105"

# =============================================================================
# Backend
# =============================================================================
#
# - "sql" (default): accounts, roles, submissions and projects live in a
#   local database. Manage users and projects with the `presencify user`
#   and `presencify project` commands.
# - "hosted": auth and data are served by a hosted PostgREST + GoTrue
#   project. Row-level security on that project decides what users can see.

[backend]
kind = "sql"

# SQLite configuration (when compiled with --features sqlite, the default)
[database]
# path = "{data_dir_str}/presencify.db"  # Optional, defaults to data_dir/presencify.db

# PostgreSQL configuration (when compiled with --features postgres --no-default-features)
# [database]
# host = "localhost"
# port = 5432
# user = "presencify"
# password = "secret"
# database = "presencify"

# Hosted backend (backend.kind = "hosted")
# [hosted]
# url = "https://your-project.supabase.co"
# anon_key = "your-anon-key"
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults_without_file() {
        let config = Config::from_figment(Figment::new()).unwrap();
        assert_eq!(config.server.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.backend.kind, BackendKind::Sql);
        assert_eq!(config.session.timeout_secs, 604800);
        assert_eq!(config.site.contact_email, "hello@presencify.com");
    }

    #[test]
    fn test_template_parses() {
        let config: Config = Figment::new()
            .merge(Toml::string(&default_config_template()))
            .extract()
            .unwrap();
        config.validate().unwrap();
        assert_eq!(config.session.timeout_secs, 604800);
    }

    #[test]
    fn test_hosted_requires_section() {
        let figment = Figment::new().merge(Toml::string("[backend]\nkind = \"hosted\"\n"));
        assert!(Config::from_figment(figment).is_err());

        let figment = Figment::new().merge(Toml::string(
            "[backend]\nkind = \"hosted\"\n[hosted]\nurl = \"https://x.example\"\nanon_key = \"k\"\n",
        ));
        let config = Config::from_figment(figment).unwrap();
        assert_eq!(config.hosted.unwrap().anon_key, "k");
    }

    #[test]
    fn test_invalid_listen_addr() {
        let figment = Figment::new().merge(Toml::string("[server]\nlisten_addr = \"nowhere\"\n"));
        assert!(Config::from_figment(figment).is_err());
    }

    #[test]
    fn test_session_timeout_bounds() {
        for bad in ["0", "31536001", "9223372036854775807"] {
            let figment =
                Figment::new().merge(Toml::string(&format!("[session]\ntimeout_secs = {bad}\n")));
            assert!(Config::from_figment(figment).is_err(), "accepted {bad}");
        }

        let figment = Figment::new().merge(Toml::string("[session]\ntimeout_secs = 31536000\n"));
        let config = Config::from_figment(figment).unwrap();
        assert_eq!(config.session.timeout_secs, MAX_SESSION_TIMEOUT_SECS);
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                "[server]\nlisten_addr = \"127.0.0.1:3000\"\n",
            )?;
            jail.set_env("PRESENCIFY_SERVER__LISTEN_ADDR", "127.0.0.1:4000");
            jail.set_env("PRESENCIFY_SITE__CONTACT_EMAIL", "sales@example.com");

            let config = Config::load(Path::new("config.toml")).unwrap();
            assert_eq!(config.server.listen_addr, "127.0.0.1:4000");
            assert_eq!(config.site.contact_email, "sales@example.com");
            Ok(())
        });
    }
}
