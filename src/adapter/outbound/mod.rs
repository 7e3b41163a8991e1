//! Outbound adapters (driven side).

pub mod command;
pub mod confirm;
pub mod probe;
pub mod process;
pub mod secret;
pub mod sleep;
