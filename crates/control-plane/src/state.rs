//! Application state for the OmniPDF Control Plane server.

use std::sync::Arc;

use crate::auth::AuthState;
use crate::config::AppConfig;
use crate::engine::{
    create_default_registry, ExecutionRecordWriter, WorkflowEngine, WorkflowExecutor,
    WorkflowLookup,
};
use crate::platform::{Authenticator, EntityStore, Integrations};
use crate::services::{ExecutionService, WorkflowService};
use crate::store::{ActivityLog, WorkflowStore};

/// Shared application state.
///
/// Collaborators are trait objects so the server can run against the HTTP
/// platform client and PostgreSQL, or entirely in memory.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub workflows: Arc<dyn WorkflowStore>,
    pub entities: Arc<dyn EntityStore>,
    pub integrations: Arc<dyn Integrations>,
    pub authenticator: Arc<dyn Authenticator>,

    /// Server start time for uptime calculation
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        workflows: Arc<dyn WorkflowStore>,
        entities: Arc<dyn EntityStore>,
        integrations: Arc<dyn Integrations>,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            workflows,
            entities,
            integrations,
            authenticator,
            start_time: std::time::Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn activity_log(&self) -> ActivityLog {
        ActivityLog::new(self.entities.clone())
    }

    /// Engine wired to this state's collaborators and the built-in steps.
    pub fn workflow_engine(&self) -> WorkflowEngine {
        let activity = self.activity_log();
        WorkflowEngine::new(
            WorkflowLookup::new(
                self.workflows.clone(),
                activity.clone(),
                self.config.legacy_workflow_lookup,
            ),
            Arc::new(WorkflowExecutor::new(
                Arc::new(create_default_registry()),
                self.entities.clone(),
                self.integrations.clone(),
            )),
            ExecutionRecordWriter::new(activity),
        )
    }

    pub fn workflow_service(&self) -> WorkflowService {
        WorkflowService::new(
            self.workflows.clone(),
            self.activity_log(),
            self.workflow_engine(),
        )
    }

    pub fn execution_service(&self) -> ExecutionService {
        ExecutionService::new(self.activity_log())
    }

    pub fn auth_state(&self) -> AuthState {
        AuthState {
            authenticator: self.authenticator.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryPlatform;
    use crate::store::MemoryWorkflowStore;

    fn state(legacy: bool) -> AppState {
        let platform = Arc::new(MemoryPlatform::new());
        let config = AppConfig {
            legacy_workflow_lookup: legacy,
            ..AppConfig::default()
        };
        AppState::new(
            config,
            Arc::new(MemoryWorkflowStore::new()),
            platform.clone(),
            platform.clone(),
            platform,
        )
    }

    #[test]
    fn test_uptime_starts_at_zero() {
        assert_eq!(state(true).uptime_seconds(), 0);
    }

    #[test]
    fn test_engine_has_builtin_steps() {
        let names = state(false).workflow_engine().step_names();
        assert!(names.iter().any(|n| n == "Compress"));
        assert!(names.iter().any(|n| n == "Auto-Tag"));
    }
}
