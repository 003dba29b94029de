//! Workflow definition management and triggering.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::info;

use crate::db::models::{NewWorkflow, WorkflowDefinition};
use crate::engine::{RunContext, RunReport, WorkflowEngine, STORE_BACKED};
use crate::error::{AppError, AppResult};
use crate::platform::Caller;
use crate::result_ext::ResultExt;
use crate::store::{actions, ActivityLog, NewActivity, WorkflowStore};

#[derive(Clone)]
pub struct WorkflowService {
    store: Arc<dyn WorkflowStore>,
    activity: ActivityLog,
    engine: WorkflowEngine,
}

impl WorkflowService {
    pub fn new(store: Arc<dyn WorkflowStore>, activity: ActivityLog, engine: WorkflowEngine) -> Self {
        Self {
            store,
            activity,
            engine,
        }
    }

    /// Validate and store a definition, then note it in the audit log.
    ///
    /// The audit entry is history only; failing to write it does not undo
    /// the create. It is marked store-backed so the legacy scan never
    /// resolves it after a delete.
    pub async fn create(
        &self,
        request: NewWorkflow,
        caller: &Caller,
    ) -> AppResult<WorkflowDefinition> {
        request.validate().map_err(AppError::Validation)?;

        let definition = self
            .store
            .insert(request.into_definition(Some(caller.email.clone())))
            .await?;

        info!(workflow_id = %definition.workflow_id, name = %definition.name, "Workflow created");

        let mut details = json!({
            "workflow_id": definition.workflow_id,
            "name": definition.name,
            "steps": definition.steps,
            "description": definition.description,
        });
        details[STORE_BACKED] = Value::Bool(true);

        let _ = self
            .activity
            .record(NewActivity {
                action: actions::WORKFLOW_CREATED,
                document_id: None,
                user_email: Some(caller.email.clone()),
                details,
            })
            .await
            .log("recording workflow_created");

        Ok(definition)
    }

    pub async fn list(&self) -> AppResult<Vec<WorkflowDefinition>> {
        self.store.list().await
    }

    pub async fn get(&self, workflow_id: &str) -> AppResult<WorkflowDefinition> {
        self.store
            .get(workflow_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Workflow not found".to_string()))
    }

    /// Delete a keyed definition. Legacy audit entries are never removed.
    pub async fn delete(&self, workflow_id: &str, caller: &Caller) -> AppResult<()> {
        if !self.store.delete(workflow_id).await? {
            return Err(AppError::NotFound("Workflow not found".to_string()));
        }

        info!(workflow_id, "Workflow deleted");

        let _ = self
            .activity
            .record(NewActivity {
                action: actions::WORKFLOW_DELETED,
                document_id: None,
                user_email: Some(caller.email.clone()),
                details: json!({ "workflow_id": workflow_id }),
            })
            .await
            .log("recording workflow_deleted");

        Ok(())
    }

    pub fn step_names(&self) -> Vec<String> {
        self.engine.step_names()
    }

    pub async fn trigger(&self, run: RunContext) -> AppResult<RunReport> {
        self.engine.trigger(run).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{
        create_default_registry, ExecutionRecordWriter, WorkflowExecutor, WorkflowLookup,
    };
    use crate::platform::MemoryPlatform;
    use crate::store::MemoryWorkflowStore;

    fn caller() -> Caller {
        Caller {
            id: "u1".to_string(),
            email: "ana@example.com".to_string(),
            full_name: None,
            role: None,
        }
    }

    fn service(platform: Arc<MemoryPlatform>) -> WorkflowService {
        let store: Arc<dyn WorkflowStore> = Arc::new(MemoryWorkflowStore::new());
        let activity = ActivityLog::new(platform.clone());
        let engine = WorkflowEngine::new(
            WorkflowLookup::new(store.clone(), activity.clone(), true),
            Arc::new(WorkflowExecutor::new(
                Arc::new(create_default_registry()),
                platform.clone(),
                platform,
            )),
            ExecutionRecordWriter::new(activity.clone()),
        );
        WorkflowService::new(store, activity, engine)
    }

    fn request(id: Option<&str>, name: &str) -> NewWorkflow {
        NewWorkflow {
            workflow_id: id.map(str::to_string),
            name: name.to_string(),
            steps: vec!["OCR".to_string(), "Compress".to_string()],
            description: None,
        }
    }

    #[tokio::test]
    async fn test_create_records_audit_entry() {
        let platform = Arc::new(MemoryPlatform::new());
        let service = service(platform.clone());

        let created = service
            .create(request(Some("wf-1"), "Scan"), &caller())
            .await
            .unwrap();
        assert_eq!(created.created_by.as_deref(), Some("ana@example.com"));

        let entries = ActivityLog::new(platform)
            .find(actions::WORKFLOW_CREATED)
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].details["workflow_id"], "wf-1");
        assert_eq!(entries[0].details["steps"], json!(["OCR", "Compress"]));
        assert_eq!(entries[0].details[STORE_BACKED], true);
    }

    #[tokio::test]
    async fn test_create_generates_id() {
        let service = service(Arc::new(MemoryPlatform::new()));
        let created = service.create(request(None, "Scan"), &caller()).await.unwrap();
        assert!(uuid::Uuid::parse_str(&created.workflow_id).is_ok());
        assert_eq!(service.get(&created.workflow_id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_duplicate_create_conflicts() {
        let platform = Arc::new(MemoryPlatform::new());
        let service = service(platform.clone());
        service.create(request(Some("wf-1"), "Scan"), &caller()).await.unwrap();

        let err = service
            .create(request(Some("wf-1"), "Other"), &caller())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let entries = ActivityLog::new(platform)
            .find(actions::WORKFLOW_CREATED)
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid() {
        let service = service(Arc::new(MemoryPlatform::new()));
        let err = service.create(request(None, "  "), &caller()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_delete() {
        let service = service(Arc::new(MemoryPlatform::new()));
        service.create(request(Some("wf-1"), "Scan"), &caller()).await.unwrap();

        service.delete("wf-1", &caller()).await.unwrap();
        assert!(matches!(
            service.get("wf-1").await.unwrap_err(),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            service.delete("wf-1", &caller()).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_deleted_workflow_cannot_be_triggered() {
        let platform = Arc::new(MemoryPlatform::new());
        platform
            .seed(
                crate::platform::collections::DOCUMENT,
                json!({"id": "d1", "name": "scan.pdf", "file_size": 10}),
            )
            .await;
        let service = service(platform);
        service
            .create(request(Some("gone"), "Gone"), &caller())
            .await
            .unwrap();
        service.delete("gone", &caller()).await.unwrap();

        let err = service
            .trigger(RunContext::new("gone", "d1", "manual", Default::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)), "got {err:?}");
    }

    #[test]
    fn test_step_names() {
        let service = service(Arc::new(MemoryPlatform::new()));
        let names = service.step_names();
        assert_eq!(names.len(), 8);
        assert!(names.contains(&"Email Notification".to_string()));
    }
}
