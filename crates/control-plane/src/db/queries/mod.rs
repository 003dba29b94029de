//! Database queries for the OmniPDF Control Plane.

pub mod workflow;
