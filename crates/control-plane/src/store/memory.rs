//! Process-local workflow store.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{duplicate_workflow, WorkflowStore};
use crate::db::models::WorkflowDefinition;
use crate::error::AppResult;

/// Definitions kept in insertion order.
#[derive(Default)]
pub struct MemoryWorkflowStore {
    workflows: RwLock<Vec<WorkflowDefinition>>,
}

impl MemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkflowStore for MemoryWorkflowStore {
    async fn insert(&self, definition: WorkflowDefinition) -> AppResult<WorkflowDefinition> {
        let mut workflows = self.workflows.write().await;
        if workflows
            .iter()
            .any(|w| w.workflow_id == definition.workflow_id)
        {
            return Err(duplicate_workflow(&definition.workflow_id));
        }
        workflows.push(definition.clone());
        Ok(definition)
    }

    async fn get(&self, workflow_id: &str) -> AppResult<Option<WorkflowDefinition>> {
        Ok(self
            .workflows
            .read()
            .await
            .iter()
            .find(|w| w.workflow_id == workflow_id)
            .cloned())
    }

    async fn list(&self) -> AppResult<Vec<WorkflowDefinition>> {
        Ok(self.workflows.read().await.clone())
    }

    async fn delete(&self, workflow_id: &str) -> AppResult<bool> {
        let mut workflows = self.workflows.write().await;
        let before = workflows.len();
        workflows.retain(|w| w.workflow_id != workflow_id);
        Ok(workflows.len() < before)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn health_check(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn definition(id: &str, name: &str) -> WorkflowDefinition {
        WorkflowDefinition {
            workflow_id: id.to_string(),
            name: name.to_string(),
            steps: vec!["OCR".to_string()],
            description: None,
            created_by: None,
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_id() {
        let store = MemoryWorkflowStore::new();
        store.insert(definition("wf-1", "First")).await.unwrap();

        let err = store
            .insert(definition("wf-1", "Second"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let stored = store.get("wf-1").await.unwrap().unwrap();
        assert_eq!(stored.name, "First");
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let store = MemoryWorkflowStore::new();
        store.insert(definition("a", "A")).await.unwrap();
        store.insert(definition("b", "B")).await.unwrap();

        let names: Vec<_> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|w| w.name)
            .collect();
        assert_eq!(names, vec!["A", "B"]);

        assert!(store.delete("a").await.unwrap());
        assert!(!store.delete("a").await.unwrap());
        assert!(store.get("a").await.unwrap().is_none());
    }
}
