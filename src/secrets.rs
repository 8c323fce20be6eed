//! Database credential lookup.
//!
//! The sink asks for a named secret once per run. Two backends are
//! provided: environment variables, and a JSON file shaped like a secrets
//! manager export (`{"<region>/<name>": {"host": ..., "username": ...}}`).

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_PORT: u16 = 5432;

/// Credentials for the target database server.
#[derive(Clone, Deserialize)]
pub struct DbSecret {
    pub host: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_port", deserialize_with = "port_from_any")]
    pub port: u16,
}

impl std::fmt::Debug for DbSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbSecret")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"***")
            .field("port", &self.port)
            .finish()
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Secrets managers store the port as either a number or a string.
fn port_from_any<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Port::deserialize(deserializer)? {
        Port::Number(n) => Ok(n),
        Port::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("secret {name:?} not found for region {region:?}")]
    NotFound { name: String, region: String },

    #[error("environment variable {0} is not set")]
    MissingVar(String),

    #[error("invalid port {0:?}")]
    InvalidPort(String),

    #[error("failed to read secrets file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed secrets file {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("secrets backend {0} requires a path")]
    MissingPath(&'static str),
}

/// Named-secret lookup.
#[async_trait]
pub trait SecretLookup: Send + Sync {
    async fn get_secret(&self, name: &str, region: &str) -> Result<DbSecret, SecretError>;
}

/// Secret backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretBackend {
    #[default]
    Env,
    File,
}

/// Secrets configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretsConfig {
    #[serde(default)]
    pub backend: SecretBackend,

    /// Secrets file for the `file` backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Variable prefix for the `env` backend.
    #[serde(default = "default_env_prefix")]
    pub prefix: String,
}

fn default_env_prefix() -> String {
    "WISHTRACK_DB".to_string()
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            backend: SecretBackend::default(),
            path: None,
            prefix: default_env_prefix(),
        }
    }
}

impl SecretsConfig {
    /// Build the configured lookup.
    pub fn build(&self) -> Result<Box<dyn SecretLookup>, SecretError> {
        match self.backend {
            SecretBackend::Env => Ok(Box::new(EnvSecrets::new(&self.prefix))),
            SecretBackend::File => {
                let path = self.path.clone().ok_or(SecretError::MissingPath("file"))?;
                Ok(Box::new(FileSecrets::new(path)))
            }
        }
    }
}

/// Reads `<PREFIX>_HOST`, `<PREFIX>_USERNAME`, `<PREFIX>_PASSWORD` and
/// optionally `<PREFIX>_PORT`. Name and region are only logged.
pub struct EnvSecrets {
    prefix: String,
}

impl EnvSecrets {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.trim_end_matches('_').to_string(),
        }
    }

    fn var(&self, suffix: &str) -> Result<String, SecretError> {
        let key = format!("{}_{}", self.prefix, suffix);
        std::env::var(&key).map_err(|_| SecretError::MissingVar(key))
    }
}

#[async_trait]
impl SecretLookup for EnvSecrets {
    async fn get_secret(&self, name: &str, region: &str) -> Result<DbSecret, SecretError> {
        debug!(name, region, prefix = %self.prefix, "Resolving secret from environment");

        let port = match self.var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| SecretError::InvalidPort(raw.clone()))?,
            Err(_) => DEFAULT_PORT,
        };

        Ok(DbSecret {
            host: self.var("HOST")?,
            username: self.var("USERNAME")?,
            password: self.var("PASSWORD")?,
            port,
        })
    }
}

/// JSON secrets file keyed by `"<region>/<name>"` or plain `"<name>"`.
pub struct FileSecrets {
    path: PathBuf,
}

impl FileSecrets {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SecretLookup for FileSecrets {
    async fn get_secret(&self, name: &str, region: &str) -> Result<DbSecret, SecretError> {
        debug!(name, region, path = %self.path.display(), "Resolving secret from file");

        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| SecretError::Io {
                path: self.path.clone(),
                source,
            })?;

        let mut secrets: HashMap<String, DbSecret> =
            serde_json::from_str(&contents).map_err(|source| SecretError::Malformed {
                path: self.path.clone(),
                source,
            })?;

        secrets
            .remove(&format!("{}/{}", region, name))
            .or_else(|| secrets.remove(name))
            .ok_or_else(|| SecretError::NotFound {
                name: name.to_string(),
                region: region.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn secrets_file(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_file_secret_prefers_region_key() {
        let file = secrets_file(
            r#"{
                "us-east-1/wishlist-db": {"host": "east.db", "username": "app", "password": "pw", "port": "6543"},
                "wishlist-db": {"host": "any.db", "username": "app", "password": "pw", "port": 5433}
            }"#,
        );
        let lookup = FileSecrets::new(file.path());

        let east = lookup.get_secret("wishlist-db", "us-east-1").await.unwrap();
        assert_eq!(east.host, "east.db");
        assert_eq!(east.port, 6543);

        let other = lookup.get_secret("wishlist-db", "eu-west-1").await.unwrap();
        assert_eq!(other.host, "any.db");
        assert_eq!(other.port, 5433);
    }

    #[tokio::test]
    async fn test_file_secret_default_port_and_missing() {
        let file = secrets_file(r#"{"db": {"host": "h", "username": "u", "password": "p"}}"#);
        let lookup = FileSecrets::new(file.path());

        assert_eq!(lookup.get_secret("db", "r").await.unwrap().port, DEFAULT_PORT);
        assert!(matches!(
            lookup.get_secret("other", "r").await,
            Err(SecretError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_file_secret_malformed() {
        let file = secrets_file(r#"{"db": {"host": "h", "username": "u", "password": "p", "port": "abc"}}"#);
        let lookup = FileSecrets::new(file.path());

        assert!(matches!(
            lookup.get_secret("db", "r").await,
            Err(SecretError::Malformed { .. })
        ));
    }

    #[tokio::test]
    async fn test_env_secret() {
        std::env::set_var("WISHTRACK_TEST_ENV_SECRET_HOST", "db.internal");
        std::env::set_var("WISHTRACK_TEST_ENV_SECRET_USERNAME", "scraper");
        std::env::set_var("WISHTRACK_TEST_ENV_SECRET_PASSWORD", "hunter2");
        std::env::set_var("WISHTRACK_TEST_ENV_SECRET_PORT", "6000");

        let secret = EnvSecrets::new("WISHTRACK_TEST_ENV_SECRET_")
            .get_secret("ignored", "ignored")
            .await
            .unwrap();

        assert_eq!(secret.host, "db.internal");
        assert_eq!(secret.username, "scraper");
        assert_eq!(secret.port, 6000);
        assert!(!format!("{:?}", secret).contains("hunter2"));
    }

    #[tokio::test]
    async fn test_env_secret_missing_var() {
        let err = EnvSecrets::new("WISHTRACK_TEST_UNSET_SECRET")
            .get_secret("db", "r")
            .await
            .unwrap_err();
        assert!(matches!(err, SecretError::MissingVar(ref key) if key == "WISHTRACK_TEST_UNSET_SECRET_HOST"));
    }

    #[test]
    fn test_file_backend_requires_path() {
        let config = SecretsConfig {
            backend: SecretBackend::File,
            ..Default::default()
        };
        assert!(matches!(config.build(), Err(SecretError::MissingPath("file"))));
    }
}
