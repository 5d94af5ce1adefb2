use std::{path::Path, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use taskportal::{Workstation, DEFAULT_BASE_URL};

use crate::workflow::RetryPolicy;

pub const ENV_PREFIX: &str = "TASKPORTAL";

/// Settings read from `config.toml` and `TASKPORTAL_*` environment variables.
///
/// Has no password field: the password is only ever typed in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_workstation")]
    pub workstation: String,
    #[serde(default)]
    pub domain: String,
    /// No timeout when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub retry_policy: RetryPolicy,
    /// Offered as the default at the username prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_workstation() -> String {
    Workstation::default().workstation
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            workstation: default_workstation(),
            domain: String::new(),
            request_timeout_secs: None,
            retry_policy: RetryPolicy::default(),
            username: None,
        }
    }
}

impl AppConfig {
    pub fn config_path() -> Result<PathBuf> {
        Ok(dirs::config_dir()
            .context("Cannot determine config directory")?
            .join("taskportal")
            .join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?, ENV_PREFIX)
    }

    /// Defaults, then the file at `path` if there is one, then environment
    /// variables named `<env_prefix>_<KEY>`.
    pub fn load_from(path: &Path, env_prefix: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix(env_prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read config at {}", path.display()))?;

        if settings.get_string("password").is_ok() {
            tracing::warn!("Ignoring `password` in configuration, it is only read from the prompt");
        }

        settings
            .try_deserialize::<Self>()
            .with_context(|| format!("Failed to parse config at {}", path.display()))
    }

    /// Writes the default config to `path` unless a file is already there.
    /// Returns whether a file was written.
    pub fn write_default_if_missing(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let raw = toml::to_string_pretty(&Self::default())?;
        std::fs::write(path, raw)
            .with_context(|| format!("Failed to write config at {}", path.display()))?;
        Ok(true)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn workstation(&self) -> Workstation {
        Workstation {
            workstation: self.workstation.clone(),
            domain: self.domain.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config =
            AppConfig::load_from(&dir.path().join("config.toml"), "TASKPORTAL_TEST_MISSING").unwrap();

        assert_eq!(config, AppConfig::default());
        assert_eq!(config.base_url, "https://xby2apps.xby2.com/TaskManagement/");
        assert_eq!(config.timeout(), None);
        assert_eq!(config.workstation(), Workstation::default());
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
base_url = "http://localhost:8080/TaskManagement/"
domain = "CORP"
request_timeout_secs = 30
retry_policy = "step"
username = "jdoe"
password = "should-be-ignored"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path, "TASKPORTAL_TEST_FILE").unwrap();

        assert_eq!(config.base_url, "http://localhost:8080/TaskManagement/");
        assert_eq!(config.workstation, "choose.something");
        assert_eq!(config.domain, "CORP");
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.retry_policy, RetryPolicy::Step);
        assert_eq!(config.username.as_deref(), Some("jdoe"));
    }

    #[test]
    fn environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "domain = \"CORP\"\n").unwrap();
        std::env::set_var("TASKPORTAL_TEST_ENV_DOMAIN", "OTHER");

        let config = AppConfig::load_from(&path, "TASKPORTAL_TEST_ENV").unwrap();
        std::env::remove_var("TASKPORTAL_TEST_ENV_DOMAIN");

        assert_eq!(config.domain, "OTHER");
    }

    #[test]
    fn default_file_is_written_once_without_password() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        assert!(AppConfig::write_default_if_missing(&path).unwrap());
        assert!(!AppConfig::write_default_if_missing(&path).unwrap());

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("base_url"));
        assert!(!raw.contains("password"));

        let config = AppConfig::load_from(&path, "TASKPORTAL_TEST_WRITTEN").unwrap();
        assert_eq!(config, AppConfig::default());
    }
}
