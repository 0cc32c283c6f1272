//! Configuration management for the LTE UE MAC random access stack
//!
//! This crate provides configuration loading and the shared parameter store:
//! - Random access parameters (the RA Configuration snapshot)
//! - Stack configuration structures and mutable stack state
//! - Simulator configuration
//! - TOML configuration file parsing

pub mod ra_config;
pub mod stack_config;
pub mod stack_config_sim;
pub mod toml_config;

pub use ra_config::*;
pub use stack_config::*;
pub use toml_config::*;
