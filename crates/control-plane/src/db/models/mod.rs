//! Database models for the OmniPDF Control Plane.

pub mod workflow;

pub use workflow::*;
