//! Service credentials read from the install root's `.env` file.
//!
//! The file is parsed with dotenvy without touching the process environment,
//! so the values only flow into the steps that need them.

use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::Result;

pub const BOT_TOKEN: &str = "DISCORD_BOT_TOKEN";
/// Misspelled key written by older setups; still honoured.
pub const LEGACY_BOT_TOKEN: &str = "DISCORD_BOT_TOKE";
pub const MODAL_TOKEN_ID: &str = "MODAL_TOKEN_ID";
pub const MODAL_TOKEN_SECRET: &str = "MODAL_TOKEN_SECRET";

#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub bot_token: Option<String>,
    pub app_id: Option<String>,
    pub modal_token_id: Option<String>,
    pub modal_token_secret: Option<String>,
    pub modal_server: Option<String>,
}

impl Credentials {
    /// Read credentials from `path`. A missing file yields empty credentials.
    pub fn load(path: &Path) -> Result<Self> {
        let mut credentials = Self::default();
        if !path.exists() {
            return Ok(credentials);
        }

        let mut legacy_token = None;
        for item in dotenvy::from_path_iter(path)? {
            let (key, value) = item?;
            let value = Some(value).filter(|v| !v.trim().is_empty());
            match key.as_str() {
                BOT_TOKEN => credentials.bot_token = value,
                LEGACY_BOT_TOKEN => legacy_token = value,
                "DISCORD_APP_ID" => credentials.app_id = value,
                MODAL_TOKEN_ID => credentials.modal_token_id = value,
                MODAL_TOKEN_SECRET => credentials.modal_token_secret = value,
                "MODAL_SERVER" => credentials.modal_server = value,
                _ => {}
            }
        }
        if credentials.bot_token.is_none() {
            credentials.bot_token = legacy_token;
        }
        Ok(credentials)
    }

    pub fn modal_tokens(&self) -> Option<(&str, &str)> {
        match (&self.modal_token_id, &self.modal_token_secret) {
            (Some(id), Some(secret)) => Some((id.as_str(), secret.as_str())),
            _ => None,
        }
    }
}

/// Append `KEY=value` to an env file, creating it if needed.
pub fn append_env_var(path: &Path, key: &str, value: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)?;

    let needs_newline = file.metadata()?.len() > 0 && !ends_with_newline(&mut file)?;
    let mut line = String::new();
    if needs_newline {
        line.push('\n');
    }
    line.push_str(&format!("{key}=\"{}\"\n", value.replace('"', "\\\"")));
    file.write_all(line.as_bytes())?;
    Ok(())
}

fn ends_with_newline(file: &mut std::fs::File) -> std::io::Result<bool> {
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}
