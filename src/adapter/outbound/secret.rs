use async_trait::async_trait;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Password;

use crate::error::Result;
use crate::port::SecretInput;

/// Hidden terminal entry via dialoguer, read on the blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalSecrets;

#[async_trait]
impl SecretInput for TerminalSecrets {
    async fn read_secret(&self, prompt: &str) -> Result<String> {
        let prompt = prompt.to_string();
        let value = tokio::task::spawn_blocking(move || {
            Password::with_theme(&ColorfulTheme::default())
                .with_prompt(prompt)
                .interact()
        })
        .await
        .map_err(std::io::Error::other)??;
        Ok(value)
    }
}
