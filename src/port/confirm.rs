//! Operator confirmation port.

use async_trait::async_trait;

use crate::domain::{Decision, Prompt};
use crate::error::Result;

/// Source of yes/no decisions for steps that mutate state.
///
/// Implementations either ask a human or answer from a pre-set policy; a
/// policy-backed gate must never block. A human-backed gate must not block
/// the runtime thread while it waits, so an interrupt can still be handled.
#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    async fn confirm(&self, prompt: &Prompt) -> Result<Decision>;
}
