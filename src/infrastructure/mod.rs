//! Infrastructure: configuration loading and process-wide setup.

pub mod config;
