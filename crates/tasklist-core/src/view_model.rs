//! State container behind the task list screen.
//!
//! The local list is always the most recent applied full read of the remote
//! store. Every mutation is mirrored to the store and followed by a refetch;
//! refetches carry a [`FetchTicket`] so a slow, older response can never
//! overwrite a newer one.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tasklist_shared::{Task, TaskCreate, TaskPatch, TaskStatus};
use tracing::{debug, error, info, instrument, warn};

use crate::api::TaskApi;
use crate::filter::{Query, filter_tasks};
use crate::notify::{Notifier, Toast};

pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_millis(1500);

pub const ADDED_MESSAGE: &str = "Task added successfully";
pub const UPDATED_MESSAGE: &str = "Task updated successfully";
pub const DELETED_MESSAGE: &str = "Task deleted successfully";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddDraft {
    pub input: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDraft {
    pub id: String,
    pub title: String,
    pub status: TaskStatus,
}

impl EditDraft {
    fn snapshot(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            status: task.completed,
        }
    }
}

/// At most one dialog is open at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DialogState {
    #[default]
    Closed,
    Adding(AddDraft),
    Editing(EditDraft),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied { count: usize },
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    /// Blank title; nothing was sent.
    Rejected,
}

pub struct TaskViewModel {
    api: Arc<dyn TaskApi>,
    notifier: Box<dyn Notifier>,
    tasks: Vec<Task>,
    query: Query,
    dialog: DialogState,
    issued: u64,
    applied: u64,
    toast_duration: Duration,
}

impl TaskViewModel {
    pub fn new(api: Arc<dyn TaskApi>, notifier: Box<dyn Notifier>) -> Self {
        Self {
            api,
            notifier,
            tasks: Vec::new(),
            query: Query::default(),
            dialog: DialogState::Closed,
            issued: 0,
            applied: 0,
            toast_duration: DEFAULT_TOAST_DURATION,
        }
    }

    pub fn with_toast_duration(mut self, duration: Duration) -> Self {
        self.toast_duration = duration;
        self
    }

    /// Shared handle to the store, for callers that run a fetch themselves
    /// between [`begin_fetch`](Self::begin_fetch) and
    /// [`apply_fetch`](Self::apply_fetch).
    pub fn api(&self) -> Arc<dyn TaskApi> {
        Arc::clone(&self.api)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn dialog(&self) -> &DialogState {
        &self.dialog
    }

    pub fn find(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn filtered(&self) -> Vec<&Task> {
        filter_tasks(&self.tasks, &self.query)
    }

    /// The "No Tasks found" panel: a non-empty query that matches nothing.
    pub fn shows_empty_state(&self) -> bool {
        !self.query.is_empty() && self.filtered().is_empty()
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = Query::new(query);
        debug!(query = %self.query.as_str(), "query changed");
    }

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.issued += 1;
        FetchTicket(self.issued)
    }

    pub fn apply_fetch(&mut self, ticket: FetchTicket, tasks: Vec<Task>) -> FetchOutcome {
        if ticket.0 <= self.applied {
            warn!(
                ticket = ticket.0,
                applied = self.applied,
                "discarding stale task list response"
            );
            return FetchOutcome::Stale;
        }

        let mut seen = HashSet::with_capacity(tasks.len());
        let mut unique = Vec::with_capacity(tasks.len());
        for task in tasks {
            if seen.insert(task.id.clone()) {
                unique.push(task);
            } else {
                warn!(id = %task.id, "dropping duplicate task id from store response");
            }
        }

        self.applied = ticket.0;
        self.tasks = unique;
        debug!(ticket = ticket.0, count = self.tasks.len(), "task list replaced");
        FetchOutcome::Applied {
            count: self.tasks.len(),
        }
    }

    #[instrument(skip(self))]
    pub async fn fetch_tasks(&mut self) -> anyhow::Result<FetchOutcome> {
        let ticket = self.begin_fetch();
        let tasks = report("fetch", self.api.list().await)?;
        Ok(self.apply_fetch(ticket, tasks))
    }

    #[instrument(skip(self, title), fields(title_len = title.len()))]
    pub async fn add_task(&mut self, title: &str) -> anyhow::Result<AddOutcome> {
        if title.trim().is_empty() {
            debug!("blank title rejected");
            return Ok(AddOutcome::Rejected);
        }

        let create = TaskCreate {
            title: title.to_string(),
        };
        let ack = report("add", self.api.create(&create).await)?;
        debug!(?ack, "create acknowledged");

        if matches!(self.dialog, DialogState::Adding(_)) {
            self.dialog = DialogState::Closed;
        }
        self.toast(ADDED_MESSAGE);
        info!("task added");

        self.fetch_tasks().await?;
        Ok(AddOutcome::Added)
    }

    #[instrument(skip(self, title), fields(title_len = title.len()))]
    pub async fn update_task(
        &mut self,
        id: &str,
        title: &str,
        status: TaskStatus,
    ) -> anyhow::Result<()> {
        let patch = TaskPatch {
            title: title.to_string(),
            completed: status,
        };
        let ack = report("update", self.api.update(id, &patch).await)?;
        debug!(?ack, "update acknowledged");

        self.toast(UPDATED_MESSAGE);
        info!(id, "task updated");

        self.fetch_tasks().await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete_task(&mut self, id: &str) -> anyhow::Result<()> {
        let ack = report("delete", self.api.delete(id).await)?;
        debug!(?ack, "delete acknowledged");

        if let DialogState::Editing(draft) = &self.dialog
            && draft.id == id
        {
            self.dialog = DialogState::Closed;
        }
        self.toast(DELETED_MESSAGE);
        info!(id, "task deleted");

        self.fetch_tasks().await?;
        Ok(())
    }

    /// Opens the add dialog, keeping any text already typed into it.
    pub fn open_add_dialog(&mut self) {
        if !matches!(self.dialog, DialogState::Adding(_)) {
            self.dialog = DialogState::Adding(AddDraft::default());
        }
    }

    pub fn set_add_input(&mut self, input: impl Into<String>) -> anyhow::Result<()> {
        match &mut self.dialog {
            DialogState::Adding(draft) => {
                draft.input = input.into();
                Ok(())
            }
            _ => Err(anyhow!("add dialog is not open")),
        }
    }

    pub async fn submit_add(&mut self) -> anyhow::Result<AddOutcome> {
        let title = match &self.dialog {
            DialogState::Adding(draft) => draft.input.clone(),
            _ => return Err(anyhow!("add dialog is not open")),
        };
        self.add_task(&title).await
    }

    pub fn begin_edit(&mut self, id: &str) -> anyhow::Result<()> {
        let task = self
            .find(id)
            .ok_or_else(|| anyhow!("task {id} is not in the current list"))?;
        self.dialog = DialogState::Editing(EditDraft::snapshot(task));
        debug!(id, "edit draft opened");
        Ok(())
    }

    pub fn set_edit_title(&mut self, title: impl Into<String>) -> anyhow::Result<()> {
        self.edit_draft_mut()?.title = title.into();
        Ok(())
    }

    pub fn set_edit_status(&mut self, status: TaskStatus) -> anyhow::Result<()> {
        self.edit_draft_mut()?.status = status;
        Ok(())
    }

    /// Sends the draft. The dialog closes once the store accepts it; on
    /// failure the draft stays open for another attempt.
    pub async fn submit_edit(&mut self) -> anyhow::Result<()> {
        let draft = match &self.dialog {
            DialogState::Editing(draft) => draft.clone(),
            _ => return Err(anyhow!("edit dialog is not open")),
        };

        let result = self.update_task(&draft.id, &draft.title, draft.status).await;
        if let DialogState::Editing(open) = &self.dialog
            && open.id == draft.id
            && result.is_ok()
        {
            self.dialog = DialogState::Closed;
        }
        result
    }

    /// Dismisses whichever dialog is open, discarding its draft.
    pub fn close_dialog(&mut self) {
        self.dialog = DialogState::Closed;
    }

    fn edit_draft_mut(&mut self) -> anyhow::Result<&mut EditDraft> {
        match &mut self.dialog {
            DialogState::Editing(draft) => Ok(draft),
            _ => Err(anyhow!("edit dialog is not open")),
        }
    }

    fn toast(&self, message: &str) {
        self.notifier
            .notify(Toast::success(message, self.toast_duration));
    }
}

fn report<T>(operation: &'static str, result: anyhow::Result<T>) -> anyhow::Result<T> {
    if let Err(err) = result.as_ref() {
        error!(operation, error = %format!("{err:#}"), "task store request failed");
    }
    result
}
