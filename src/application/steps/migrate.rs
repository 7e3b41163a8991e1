//! Confirmation-gated text migrations of deployed source files.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use super::confirm;
use crate::application::context::ExecutionContext;
use crate::application::orchestrator::Step;
use crate::domain::{Criticality, Prompt, StepStatus, TextMigration};
use crate::error::Result;
use crate::port::ConfirmationGate;

pub struct MigrationStep {
    name: String,
    migration: TextMigration,
    root: PathBuf,
    gate: Arc<dyn ConfirmationGate>,
}

impl MigrationStep {
    pub fn new(
        name: impl Into<String>,
        migration: TextMigration,
        root: PathBuf,
        gate: Arc<dyn ConfirmationGate>,
    ) -> Self {
        Self {
            name: name.into(),
            migration,
            root,
            gate,
        }
    }

    fn path(&self) -> PathBuf {
        self.root.join(&self.migration.file)
    }

    fn prompt(&self) -> Prompt {
        Prompt::new(
            format!("migrate-{}", self.migration.id),
            format!(
                "Rewrite `{}` to `{}` in {}?",
                self.migration.pattern,
                self.migration.replacement,
                self.migration.file.display()
            ),
        )
    }
}

#[async_trait(?Send)]
impl Step for MigrationStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn criticality(&self) -> Criticality {
        Criticality::NonFatal
    }

    /// Satisfied when the file is absent or no longer contains the pattern.
    async fn is_satisfied(&self, _ctx: &mut ExecutionContext) -> Result<bool> {
        let path = self.path();
        if !path.exists() {
            return Ok(true);
        }
        let content = std::fs::read_to_string(path)?;
        Ok(!self.migration.is_pending(&content))
    }

    async fn run(&self, ctx: &mut ExecutionContext) -> Result<StepStatus> {
        if !confirm(ctx, self.gate.as_ref(), &self.prompt()).await? {
            return Ok(StepStatus::Declined);
        }

        let path = self.path();
        let content = std::fs::read_to_string(&path)?;
        let (migrated, count) = self.migration.apply(&content);

        let mut tmp = path.clone().into_os_string();
        tmp.push(".botctl-tmp");
        std::fs::write(&tmp, migrated)?;
        std::fs::rename(&tmp, &path)?;

        ctx.info(format!(
            "applied {} to {} ({count} replacements)",
            self.migration.id,
            path.display()
        ));
        Ok(StepStatus::Completed)
    }
}
