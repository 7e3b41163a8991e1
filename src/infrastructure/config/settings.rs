//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all settings. The file
//! is optional: every field has a default, and `BOTCTL_INSTALL_ROOT`,
//! `BOTCTL_REPO_URL` and `BOTCTL_LOG_DIR` override the file. Credentials never
//! live here; they come from the install root's `.env` (see
//! [`super::credentials`]).
//!
//! # Example
//!
//! ```no_run
//! use botctl::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_or_default("config.toml")?;
//!     config.logging.init();
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use super::logging::LoggingConfig;
use super::paths;
use crate::domain::{AutoAnswer, LaunchSpec, RetryPolicy};
use crate::error::{ConfigError, Result};

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Install root and the directories derived from it.
    pub paths: PathsConfig,

    /// Remote repository synchronized into the install root.
    pub repository: RepositoryConfig,

    /// Host checks run before anything is mutated.
    pub preflight: PreflightConfig,

    /// Python interpreter and the packages installed into the environment.
    pub packages: PackagesConfig,

    /// Modal inference app settings.
    pub modal: ModalConfig,

    /// The long-running bot process.
    pub service: ServiceConfig,

    /// Backoff for retried network operations.
    pub retry: RetryConfig,

    /// Answers used when running non-interactively.
    pub confirm: ConfirmConfig,

    /// Diagnostic logging.
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub install_root: PathBuf,
    /// Relative paths are resolved against `install_root`.
    pub venv: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            install_root: paths::default_install_root(),
            venv: None,
            log_dir: None,
            env_file: None,
        }
    }
}

impl PathsConfig {
    pub fn install_root(&self) -> PathBuf {
        expand_home(&self.install_root)
    }

    pub fn venv(&self) -> PathBuf {
        self.resolve(self.venv.as_deref(), "venv")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.resolve(self.log_dir.as_deref(), "logs")
    }

    pub fn env_file(&self) -> PathBuf {
        self.resolve(self.env_file.as_deref(), ".env")
    }

    fn resolve(&self, configured: Option<&Path>, default: &str) -> PathBuf {
        match configured {
            Some(path) => {
                let path = expand_home(path);
                if path.is_absolute() {
                    path
                } else {
                    self.install_root().join(path)
                }
            }
            None => self.install_root().join(default),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Clone/pull source. No sync happens when unset.
    pub url: Option<String>,
    pub branch: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            url: None,
            branch: "main".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PreflightConfig {
    /// Executables that must be on `PATH`.
    pub tools: Vec<String>,
    pub min_free_mb: u64,
    pub connectivity_url: String,
    pub connectivity_timeout_secs: u64,
}

impl Default for PreflightConfig {
    fn default() -> Self {
        Self {
            tools: vec!["python3".into(), "git".into()],
            min_free_mb: 2048,
            connectivity_url: "https://pypi.org/simple/".into(),
            connectivity_timeout_secs: 10,
        }
    }
}

impl PreflightConfig {
    pub fn min_free_bytes(&self) -> u64 {
        self.min_free_mb.saturating_mul(1024 * 1024)
    }

    pub fn connectivity_timeout(&self) -> Duration {
        Duration::from_secs(self.connectivity_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PackagesConfig {
    /// Interpreter used to create the environment.
    pub interpreter: String,
    pub install: Vec<String>,
}

impl Default for PackagesConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".into(),
            install: vec!["discord.py".into(), "python-dotenv".into(), "modal".into()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModalConfig {
    /// App definition deployed with `modal deploy`, relative to the install root.
    pub app_file: PathBuf,
    /// Modal CLI token file. Defaults to `~/.modal.toml`.
    pub token_file: Option<PathBuf>,
}

impl Default for ModalConfig {
    fn default() -> Self {
        Self {
            app_file: PathBuf::from("modal_project/src/logo_generator.py"),
            token_file: None,
        }
    }
}

impl ModalConfig {
    pub fn token_file(&self) -> PathBuf {
        self.token_file
            .as_deref()
            .map(expand_home)
            .unwrap_or_else(paths::modal_token_file)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Substring used to find the bot among running processes.
    pub display_name: String,
    /// Bot entry script, relative to the install root.
    pub script: PathBuf,
    /// Output redirect file name inside the log directory.
    pub log_file: String,
    pub grace_secs: u64,
    pub settle_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            display_name: "discord_logo_bot.py".into(),
            script: PathBuf::from("discord_logo_bot.py"),
            log_file: "bot.log".into(),
            grace_secs: 5,
            settle_secs: 3,
        }
    }
}

impl ServiceConfig {
    pub fn grace(&self) -> Duration {
        Duration::from_secs(self.grace_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub backoff_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            backoff_secs: RetryPolicy::DEFAULT_BACKOFF_UNIT.as_secs(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::with_backoff(Duration::from_secs(self.backoff_secs))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfirmConfig {
    /// Answer for prompts not listed in `answers`.
    pub default: AutoAnswer,
    /// Per-prompt answers keyed by prompt id.
    pub answers: HashMap<String, bool>,
}

impl Config {
    /// Parse configuration from TOML content and validate it.
    ///
    /// Environment overrides are not applied; see [`Config::load`].
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, apply environment overrides and validate.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let mut config: Self = toml::from_str(&content).map_err(ConfigError::Parse)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            return Self::load(path);
        }
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply `BOTCTL_*` overrides from the given lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup("BOTCTL_INSTALL_ROOT").filter(|v| !v.is_empty()) {
            self.paths.install_root = PathBuf::from(root);
        }
        if let Some(url) = lookup("BOTCTL_REPO_URL").filter(|v| !v.is_empty()) {
            self.repository.url = Some(url);
        }
        if let Some(dir) = lookup("BOTCTL_LOG_DIR").filter(|v| !v.is_empty()) {
            self.paths.log_dir = Some(PathBuf::from(dir));
        }
    }

    /// How the bot process is launched from the environment's interpreter.
    pub fn launch_spec(&self) -> LaunchSpec {
        let root = self.paths.install_root();
        LaunchSpec {
            display_name: self.service.display_name.clone(),
            program: self.paths.venv().join("bin").join("python"),
            args: vec![self.service.script.display().to_string()],
            cwd: root,
            env: vec![("PYTHONUNBUFFERED".to_string(), "1".to_string())],
            log_path: self.paths.log_dir().join(&self.service.log_file),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.service.display_name.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "service.display_name",
            }
            .into());
        }
        if !self
            .service
            .script
            .to_string_lossy()
            .contains(&self.service.display_name)
        {
            return Err(ConfigError::InvalidValue {
                field: "service.display_name",
                reason: format!(
                    "must be part of the script path {} or the started bot cannot be found",
                    self.service.script.display()
                ),
            }
            .into());
        }
        if self.service.log_file.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "service.log_file",
            }
            .into());
        }
        if let Some(ref repo) = self.repository.url {
            if !is_repository_url(repo) {
                return Err(ConfigError::InvalidValue {
                    field: "repository.url",
                    reason: format!("{repo} is not a URL or scp-style git remote"),
                }
                .into());
            }
        }
        url::Url::parse(&self.preflight.connectivity_url).map_err(|e| {
            ConfigError::InvalidValue {
                field: "preflight.connectivity_url",
                reason: e.to_string(),
            }
        })?;
        if self.packages.install.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "packages.install",
                reason: "package names must not be empty".to_string(),
            }
            .into());
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::InvalidValue {
                field: "logging.format",
                reason: format!("expected pretty or json, got {}", self.logging.format),
            }
            .into());
        }
        Ok(())
    }
}

fn is_repository_url(value: &str) -> bool {
    value.starts_with("git@") || url::Url::parse(value).is_ok()
}

/// Expand a leading `~/` to the user's home directory.
fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = Config::parse_toml("").unwrap();
        assert_eq!(config.service.display_name, "discord_logo_bot.py");
        assert_eq!(config.retry.policy().max_attempts(), 3);
        assert_eq!(config.confirm.default, AutoAnswer::Reject);
        assert!(config.repository.url.is_none());
    }

    #[test]
    fn derived_paths_resolve_against_install_root() {
        let config = Config::parse_toml(
            r#"
            [paths]
            install_root = "/srv/bot"
            log_dir = "/var/log/bot"
            "#,
        )
        .unwrap();

        assert_eq!(config.paths.venv(), PathBuf::from("/srv/bot/venv"));
        assert_eq!(config.paths.env_file(), PathBuf::from("/srv/bot/.env"));
        assert_eq!(config.paths.log_dir(), PathBuf::from("/var/log/bot"));
    }

    #[test]
    fn launch_spec_uses_environment_python() {
        let config = Config::parse_toml("[paths]\ninstall_root = \"/srv/bot\"\n").unwrap();
        let spec = config.launch_spec();

        assert_eq!(spec.program, PathBuf::from("/srv/bot/venv/bin/python"));
        assert_eq!(spec.args, vec!["discord_logo_bot.py".to_string()]);
        assert_eq!(spec.log_path, PathBuf::from("/srv/bot/logs/bot.log"));
        assert!(spec.command_line().contains(&spec.display_name));
    }

    #[test]
    fn display_name_must_match_script() {
        let err = Config::parse_toml(
            r#"
            [service]
            display_name = "other_bot"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("service.display_name"));
    }

    #[test]
    fn rejects_malformed_repository_url() {
        let err = Config::parse_toml("[repository]\nurl = \"not a url\"\n").unwrap_err();
        assert!(err.to_string().contains("repository.url"));

        let ok = Config::parse_toml("[repository]\nurl = \"git@github.com:acme/logo-bot.git\"\n");
        assert!(ok.is_ok());
    }

    #[test]
    fn confirm_answers_parse_by_prompt_id() {
        let config = Config::parse_toml(
            r#"
            [confirm]
            default = "accept"
            answers = { restart-bot = false }
            "#,
        )
        .unwrap();
        assert_eq!(config.confirm.default, AutoAnswer::Accept);
        assert_eq!(config.confirm.answers.get("restart-bot"), Some(&false));
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut config = Config::parse_toml("[paths]\ninstall_root = \"/srv/bot\"\n").unwrap();
        config.apply_overrides(|key| match key {
            "BOTCTL_INSTALL_ROOT" => Some("/opt/bot".to_string()),
            "BOTCTL_REPO_URL" => Some("https://github.com/acme/logo-bot.git".to_string()),
            _ => None,
        });

        assert_eq!(config.paths.install_root(), PathBuf::from("/opt/bot"));
        assert_eq!(
            config.repository.url.as_deref(),
            Some("https://github.com/acme/logo-bot.git")
        );
        assert_eq!(config.paths.log_dir(), PathBuf::from("/opt/bot/logs"));
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        let err = Config::parse_toml("[logging]\nformat = \"xml\"\n").unwrap_err();
        assert!(err.to_string().contains("logging.format"));
    }
}
