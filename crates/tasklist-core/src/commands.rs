use std::io::{self, Write};

use anyhow::anyhow;
use tasklist_shared::TaskStatus;
use tracing::{debug, instrument};

use crate::cli::Command;
use crate::render::Renderer;
use crate::shell;
use crate::view_model::{AddOutcome, TaskViewModel};

/// Runs one CLI command against the view-model. The task list is loaded
/// first, the same way the screen loads it when it mounts.
#[instrument(skip(vm, renderer, out))]
pub async fn dispatch<W: Write>(
    vm: &mut TaskViewModel,
    renderer: &Renderer,
    command: Command,
    out: &mut W,
) -> anyhow::Result<()> {
    vm.fetch_tasks().await?;
    debug!(count = vm.tasks().len(), "initial task list loaded");

    match command {
        Command::List { query } => {
            vm.set_query(query.join(" "));
        }
        Command::Add { title } => {
            let title = title.join(" ");
            if vm.add_task(&title).await? == AddOutcome::Rejected {
                writeln!(out, "Task title is empty; nothing added.")?;
                return Ok(());
            }
        }
        Command::Edit { id, title, status } => {
            let id = resolve_id(vm, &id)?;
            vm.begin_edit(&id)?;
            if let Some(title) = title {
                vm.set_edit_title(title)?;
            }
            if let Some(status) = status {
                vm.set_edit_status(status)?;
            }
            vm.submit_edit().await?;
        }
        Command::Done { id } => {
            set_status(vm, &id, TaskStatus::Completed).await?;
        }
        Command::Undone { id } => {
            set_status(vm, &id, TaskStatus::Pending).await?;
        }
        Command::Delete { id } => {
            let id = resolve_id(vm, &id)?;
            vm.delete_task(&id).await?;
        }
        Command::Shell => {
            let stdin = io::stdin();
            return shell::run(vm, renderer, stdin.lock(), out).await;
        }
    }

    renderer.print_view(out, vm)
}

async fn set_status(vm: &mut TaskViewModel, raw_id: &str, status: TaskStatus) -> anyhow::Result<()> {
    let id = resolve_id(vm, raw_id)?;
    vm.begin_edit(&id)?;
    vm.set_edit_status(status)?;
    vm.submit_edit().await
}

/// Accepts a store id, or `#N` for the N-th task of the full list.
pub fn resolve_id(vm: &TaskViewModel, raw: &str) -> anyhow::Result<String> {
    let raw = raw.trim();
    let Some(row) = raw.strip_prefix('#') else {
        return Ok(raw.to_string());
    };

    let row: usize = row
        .parse()
        .map_err(|_| anyhow!("invalid row reference: {raw}"))?;
    row.checked_sub(1)
        .and_then(|idx| vm.tasks().get(idx))
        .map(|task| task.id.clone())
        .ok_or_else(|| anyhow!("no task at row {row}"))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tasklist_shared::{Task, TaskPatch, TaskStatus};

    use super::{dispatch, resolve_id};
    use crate::api::memory::{MemoryTaskApi, Request};
    use crate::cli::Command;
    use crate::notify::RecordingNotifier;
    use crate::render::Renderer;
    use crate::view_model::TaskViewModel;

    fn task(id: &str, title: &str, completed: TaskStatus) -> Task {
        Task {
            id: id.to_string(),
            title: title.to_string(),
            completed,
            created_at: None,
            updated_at: None,
            revision: Some(0),
            object_id: Some(id.to_string()),
        }
    }

    fn setup() -> (TaskViewModel, Arc<MemoryTaskApi>) {
        let api = Arc::new(MemoryTaskApi::seeded(vec![
            task("a1", "Walk dog", TaskStatus::Pending),
            task("b2", "Buy milk", TaskStatus::Completed),
        ]));
        let vm = TaskViewModel::new(api.clone(), Box::new(RecordingNotifier::new()));
        (vm, api)
    }

    async fn run(vm: &mut TaskViewModel, command: Command) -> anyhow::Result<String> {
        let mut out = Vec::new();
        dispatch(vm, &Renderer::plain(), command, &mut out).await?;
        Ok(String::from_utf8(out).expect("utf8"))
    }

    #[tokio::test]
    async fn row_references_use_the_full_list() {
        let (mut vm, _api) = setup();
        vm.fetch_tasks().await.expect("fetch");
        vm.set_query("milk");

        assert_eq!(resolve_id(&vm, "#1").expect("row 1"), "a1");
        assert_eq!(resolve_id(&vm, " #2 ").expect("row 2"), "b2");
        assert_eq!(resolve_id(&vm, "b2").expect("plain id"), "b2");

        for bad in ["#0", "#3", "#x", "#", "#-1"] {
            assert!(resolve_id(&vm, bad).is_err(), "{bad} should not resolve");
        }
    }

    #[tokio::test]
    async fn done_and_undone_keep_the_title() {
        let (mut vm, api) = setup();

        run(&mut vm, Command::Done { id: "#1".to_string() })
            .await
            .expect("done");
        run(&mut vm, Command::Undone { id: "b2".to_string() })
            .await
            .expect("undone");

        let snapshot = api.snapshot();
        assert_eq!(snapshot[0].title, "Walk dog");
        assert_eq!(snapshot[0].completed, TaskStatus::Completed);
        assert_eq!(snapshot[1].title, "Buy milk");
        assert_eq!(snapshot[1].completed, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn edit_changes_only_given_fields() {
        let (mut vm, api) = setup();

        run(
            &mut vm,
            Command::Edit {
                id: "#2".to_string(),
                title: Some("Buy oat milk".to_string()),
                status: None,
            },
        )
        .await
        .expect("edit");

        assert!(api.requests().contains(&Request::Update(
            "b2".to_string(),
            TaskPatch {
                title: "Buy oat milk".to_string(),
                completed: TaskStatus::Completed,
            },
        )));
        let edited = vm.find("b2").expect("b2 listed");
        assert_eq!(edited.title, "Buy oat milk");
        assert_eq!(edited.completed, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn blank_add_prints_a_notice_and_sends_nothing() {
        let (mut vm, api) = setup();

        let text = run(
            &mut vm,
            Command::Add {
                title: vec!["  ".to_string()],
            },
        )
        .await
        .expect("add");

        assert!(text.contains("Task title is empty; nothing added."));
        assert_eq!(api.requests(), vec![Request::List]);
    }

    #[tokio::test]
    async fn unknown_rows_fail_before_any_mutation() {
        let (mut vm, api) = setup();

        assert!(
            run(&mut vm, Command::Delete { id: "#9".to_string() })
                .await
                .is_err()
        );
        assert_eq!(api.requests(), vec![Request::List]);
        assert_eq!(api.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn list_prints_the_filtered_view() {
        let (mut vm, _api) = setup();

        let text = run(
            &mut vm,
            Command::List {
                query: vec!["walk".to_string()],
            },
        )
        .await
        .expect("list");

        assert!(text.contains("Walk dog"));
        assert!(!text.contains("Buy milk"));
    }
}
