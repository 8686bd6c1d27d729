//! In-process task store speaking the same contract as the remote one.

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::json;
use tasklist_shared::{Ack, Task, TaskCreate, TaskPatch, TaskStatus};
use tracing::debug;

use super::TaskApi;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    List,
    Create(TaskCreate),
    Update(String, TaskPatch),
    Delete(String),
}

#[derive(Debug, Default)]
struct Inner {
    tasks: Vec<Task>,
    next_id: u64,
    log: Vec<Request>,
    fail_next: Option<String>,
}

#[derive(Debug, Default)]
pub struct MemoryTaskApi {
    inner: Mutex<Inner>,
}

impl MemoryTaskApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(tasks: Vec<Task>) -> Self {
        let api = Self::new();
        api.inner.lock().tasks = tasks;
        api
    }

    /// The next call fails with `message` instead of touching the store.
    pub fn fail_next(&self, message: impl Into<String>) {
        self.inner.lock().fail_next = Some(message.into());
    }

    pub fn requests(&self) -> Vec<Request> {
        self.inner.lock().log.clone()
    }

    pub fn snapshot(&self) -> Vec<Task> {
        self.inner.lock().tasks.clone()
    }

    fn begin(&self, request: Request) -> anyhow::Result<parking_lot::MutexGuard<'_, Inner>> {
        let mut inner = self.inner.lock();
        inner.log.push(request);
        if let Some(message) = inner.fail_next.take() {
            return Err(anyhow!(message));
        }
        Ok(inner)
    }
}

#[async_trait]
impl TaskApi for MemoryTaskApi {
    async fn list(&self) -> anyhow::Result<Vec<Task>> {
        let inner = self.begin(Request::List)?;
        Ok(inner.tasks.clone())
    }

    async fn create(&self, create: &TaskCreate) -> anyhow::Result<Ack> {
        let mut inner = self.begin(Request::Create(create.clone()))?;
        inner.next_id += 1;
        let now = Utc::now();
        let id = format!("mem-{}", inner.next_id);
        let task = Task {
            id: id.clone(),
            title: create.title.clone(),
            completed: TaskStatus::Pending,
            created_at: Some(now),
            updated_at: Some(now),
            revision: Some(0),
            object_id: Some(id),
        };
        debug!(id = %task.id, "memory store created task");
        inner.tasks.push(task.clone());
        Ok(Ack(serde_json::to_value(task)?))
    }

    async fn update(&self, id: &str, patch: &TaskPatch) -> anyhow::Result<Ack> {
        let mut inner = self.begin(Request::Update(id.to_string(), patch.clone()))?;
        let task = inner
            .tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| anyhow!("404 Not Found: task {id}"))?;
        task.title = patch.title.clone();
        task.completed = patch.completed;
        task.updated_at = Some(Utc::now());
        task.revision = Some(task.revision.unwrap_or(0) + 1);
        Ok(Ack(serde_json::to_value(&*task)?))
    }

    async fn delete(&self, id: &str) -> anyhow::Result<Ack> {
        let mut inner = self.begin(Request::Delete(id.to_string()))?;
        let idx = inner
            .tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or_else(|| anyhow!("404 Not Found: task {id}"))?;
        inner.tasks.remove(idx);
        Ok(Ack(json!({ "message": "Task deleted", "id": id })))
    }
}
