//! Application services (use cases).
//!
//! These services drive the ports to implement provisioning and deployment:
//! the step orchestrator, retry executor, environment builder, service
//! controller and the concrete pipeline steps.

pub mod context;
pub mod environment;
pub mod orchestrator;
pub mod pipeline;
pub mod reporter;
pub mod retry;
pub mod service;
pub mod steps;

pub use context::{ExecutionContext, RunMode, RunSummary, Termination};
pub use environment::{Environment, EnvironmentBuilder, EnvironmentStatus, InstallReport};
pub use orchestrator::{Orchestrator, Step};
pub use pipeline::PipelineKind;
pub use reporter::{Echo, Reporter};
pub use retry::RetryExecutor;
pub use service::ServiceController;
pub use steps::Toolkit;
