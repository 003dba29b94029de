//! Configuration module for the OmniPDF Control Plane server.
//!
//! This module provides configuration loading from environment variables
//! using the `envy` crate for type-safe environment variable parsing.

mod app;
mod database;
mod platform;

pub use app::{AppConfig, StoreBackend};
pub use database::DatabaseConfig;
pub use platform::PlatformConfig;
