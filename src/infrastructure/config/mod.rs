//! Configuration: settings file, credentials, logging and well-known paths.

pub mod credentials;
pub mod logging;
pub mod paths;
pub mod settings;

pub use settings::Config;
