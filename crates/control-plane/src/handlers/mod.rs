//! HTTP handlers for the OmniPDF Control Plane API.

pub mod executions;
pub mod health;
pub mod workflows;

pub use health::{api_health, health_check};
