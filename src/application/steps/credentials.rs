//! Bot token provisioning into the install root's `.env`.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::application::context::ExecutionContext;
use crate::application::orchestrator::Step;
use crate::domain::{Criticality, StepStatus};
use crate::error::{Result, StepError};
use crate::infrastructure::config::credentials::{self, Credentials, BOT_TOKEN};
use crate::port::SecretInput;

pub struct CredentialsStep {
    env_file: PathBuf,
    secrets: Arc<dyn SecretInput>,
}

impl CredentialsStep {
    pub fn new(env_file: PathBuf, secrets: Arc<dyn SecretInput>) -> Self {
        Self { env_file, secrets }
    }
}

#[async_trait(?Send)]
impl Step for CredentialsStep {
    fn name(&self) -> &str {
        "credentials"
    }

    fn criticality(&self) -> Criticality {
        Criticality::Fatal
    }

    async fn is_satisfied(&self, _ctx: &mut ExecutionContext) -> Result<bool> {
        Ok(Credentials::load(&self.env_file)?.bot_token.is_some())
    }

    async fn run(&self, ctx: &mut ExecutionContext) -> Result<StepStatus> {
        if !ctx.is_interactive() {
            ctx.info(format!(
                "{BOT_TOKEN} is not set in {} and no terminal is available to ask for it",
                self.env_file.display()
            ));
            return Err(StepError::MissingCredential(BOT_TOKEN).into());
        }

        let token = self.secrets.read_secret("Discord bot token").await?;
        let token = token.trim();
        if token.is_empty() {
            return Err(StepError::MissingCredential(BOT_TOKEN).into());
        }

        credentials::append_env_var(&self.env_file, BOT_TOKEN, token)?;
        ctx.success(format!("saved {BOT_TOKEN} to {}", self.env_file.display()));
        Ok(StepStatus::Completed)
    }
}
