//! Path utilities for botctl.
//!
//! Tool state lives under `~/.botctl/`:
//! - `~/.botctl/config.toml` - optional configuration
//!
//! The deployed bot itself lives in the install root (`~/logo-bot` unless
//! configured otherwise).

use std::path::PathBuf;

/// Returns the botctl home directory (`~/.botctl/`).
pub fn home_dir() -> PathBuf {
    user_home().join(".botctl")
}

/// Returns the default config file path (`~/.botctl/config.toml`).
pub fn default_config() -> PathBuf {
    home_dir().join("config.toml")
}

/// Returns the default install root for the bot (`~/logo-bot`).
pub fn default_install_root() -> PathBuf {
    user_home().join("logo-bot")
}

/// Returns the Modal CLI credentials file (`~/.modal.toml`).
pub fn modal_token_file() -> PathBuf {
    user_home().join(".modal.toml")
}

fn user_home() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}
