//! Service layer for the OmniPDF Control Plane.
//!
//! Services sit between the HTTP handlers and the stores, the audit log and
//! the workflow engine.

pub mod execution;
pub mod workflow;

pub use execution::ExecutionService;
pub use workflow::WorkflowService;
