//! Config Module
//!
//! Centralized configuration for the level layout and editor limits.

pub mod sandbox_config;

pub use sandbox_config::{BankConfig, SandboxConfig, category};
