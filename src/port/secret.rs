//! Hidden credential entry port.

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait SecretInput: Send + Sync {
    async fn read_secret(&self, prompt: &str) -> Result<String>;
}
