//! Yes/no prompts and the decisions that answer them.

use serde::{Deserialize, Serialize};

/// A question put to the operator. `id` is the stable key policies match on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub id: String,
    pub text: String,
}

impl Prompt {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// Answer to a [`Prompt`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub prompt_id: String,
    pub accepted: bool,
}

impl Decision {
    pub fn accept(prompt: &Prompt) -> Self {
        Self {
            prompt_id: prompt.id.clone(),
            accepted: true,
        }
    }

    pub fn reject(prompt: &Prompt) -> Self {
        Self {
            prompt_id: prompt.id.clone(),
            accepted: false,
        }
    }
}

/// Fallback answer for prompts a non-interactive policy does not name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoAnswer {
    Accept,
    #[default]
    Reject,
}

impl AutoAnswer {
    pub const fn accepts(self) -> bool {
        matches!(self, Self::Accept)
    }
}
