//! Line-oriented session that drives the view-model the way the screen does:
//! search box, add dialog, edit dialog and per-row delete.

use std::io::{BufRead, Write};

use anyhow::anyhow;
use tasklist_shared::TaskStatus;
use tracing::{debug, info, warn};

use crate::render::Renderer;
use crate::view_model::{AddOutcome, DialogState, TaskViewModel};

const HELP: &str = "\
commands:
  / <text>       search titles (`/` alone clears)
  new            open the add dialog; type the title, then `save`
  edit <row>     open the edit dialog for a row of the current view
  title <text>   change the draft title
  status <s>     pending | completed
  save           submit the open dialog
  cancel         close the open dialog
  rm <row>       delete a row of the current view
  refresh        reload from the store
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Search(String),
    New,
    Input(String),
    Edit(usize),
    Title(String),
    Status(TaskStatus),
    Save,
    Cancel,
    Remove(usize),
    Refresh,
    Help,
    Quit,
}

/// While the add dialog is open every line other than `save`/`cancel` is
/// the title being typed.
pub fn parse_line(line: &str, dialog: &DialogState) -> anyhow::Result<Option<Action>> {
    let trimmed = line.trim();

    if let DialogState::Adding(_) = dialog {
        return Ok(Some(match trimmed {
            "save" => Action::Save,
            "cancel" => Action::Cancel,
            _ => Action::Input(line.to_string()),
        }));
    }

    if trimmed.is_empty() {
        return Ok(None);
    }

    if let Some(query) = line.trim_start().strip_prefix('/') {
        let query = query.strip_prefix(' ').unwrap_or(query);
        debug!(query, "search");
        return Ok(Some(Action::Search(query.to_string())));
    }

    let (word, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (trimmed, ""),
    };

    let action = match word {
        "new" | "add" => Action::New,
        "edit" => Action::Edit(parse_row(rest)?),
        "title" => Action::Title(rest.to_string()),
        "status" => Action::Status(rest.parse()?),
        "save" => Action::Save,
        "cancel" => Action::Cancel,
        "rm" | "delete" => Action::Remove(parse_row(rest)?),
        "refresh" => Action::Refresh,
        "help" | "?" => Action::Help,
        "quit" | "exit" => Action::Quit,
        other => return Err(anyhow!("unknown command `{other}` (try `help`)")),
    };
    Ok(Some(action))
}

fn parse_row(raw: &str) -> anyhow::Result<usize> {
    match raw.parse::<usize>() {
        Ok(row) if row > 0 => Ok(row),
        _ => Err(anyhow!("expected a row number, got `{raw}`")),
    }
}

fn row_id(vm: &TaskViewModel, row: usize) -> anyhow::Result<String> {
    vm.filtered()
        .get(row - 1)
        .map(|task| task.id.clone())
        .ok_or_else(|| anyhow!("no task at row {row}"))
}

async fn apply(vm: &mut TaskViewModel, action: Action) -> anyhow::Result<()> {
    match action {
        Action::Search(query) => vm.set_query(query),
        Action::New => vm.open_add_dialog(),
        Action::Input(text) => vm.set_add_input(text)?,
        Action::Edit(row) => {
            let id = row_id(vm, row)?;
            vm.begin_edit(&id)?;
        }
        Action::Title(title) => vm.set_edit_title(title)?,
        Action::Status(status) => vm.set_edit_status(status)?,
        Action::Save => {
            if matches!(vm.dialog(), DialogState::Adding(_)) {
                if vm.submit_add().await? == AddOutcome::Rejected {
                    debug!("blank title; add dialog stays open");
                }
            } else if matches!(vm.dialog(), DialogState::Editing(_)) {
                vm.submit_edit().await?;
            } else {
                return Err(anyhow!("no dialog is open"));
            }
        }
        Action::Cancel => vm.close_dialog(),
        Action::Remove(row) => {
            let id = row_id(vm, row)?;
            vm.delete_task(&id).await?;
        }
        Action::Refresh => {
            vm.fetch_tasks().await?;
        }
        Action::Help | Action::Quit => {}
    }
    Ok(())
}

pub async fn run<R: BufRead, W: Write>(
    vm: &mut TaskViewModel,
    renderer: &Renderer,
    input: R,
    out: &mut W,
) -> anyhow::Result<()> {
    info!("interactive session started");
    renderer.print_view(out, vm)?;
    write!(out, "> ")?;
    out.flush()?;

    for line in input.lines() {
        let line = line?;
        match parse_line(&line, vm.dialog()) {
            Ok(None) => {}
            Ok(Some(Action::Quit)) => break,
            Ok(Some(Action::Help)) => writeln!(out, "{HELP}")?,
            Ok(Some(action)) => {
                let redraw = !matches!(action, Action::Input(_));
                if let Err(err) = apply(vm, action).await {
                    warn!(error = %format!("{err:#}"), "shell action failed");
                    writeln!(out, "error: {err:#}")?;
                } else if redraw {
                    renderer.print_view(out, vm)?;
                    renderer.print_dialog(out, vm.dialog())?;
                }
            }
            Err(err) => writeln!(out, "error: {err:#}")?,
        }
        write!(out, "> ")?;
        out.flush()?;
    }

    writeln!(out)?;
    info!("interactive session ended");
    Ok(())
}

#[cfg(test)]
mod tests {
    use tasklist_shared::TaskStatus;

    use super::{Action, parse_line};
    use crate::view_model::{AddDraft, DialogState};

    fn parse(line: &str) -> Option<Action> {
        parse_line(line, &DialogState::Closed).expect("parse")
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse("/ walk "), Some(Action::Search("walk ".to_string())));
        assert_eq!(parse("/"), Some(Action::Search(String::new())));
        assert_eq!(parse("//tmp"), Some(Action::Search("/tmp".to_string())));
        assert_eq!(parse("  / /etc"), Some(Action::Search("/etc".to_string())));
        assert_eq!(parse("edit 2"), Some(Action::Edit(2)));
        assert_eq!(parse("status Completed"), Some(Action::Status(TaskStatus::Completed)));
        assert_eq!(parse("title  Walk the dog"), Some(Action::Title("Walk the dog".to_string())));
        assert_eq!(parse("rm 1"), Some(Action::Remove(1)));
        assert_eq!(parse("   "), None);
    }

    #[test]
    fn rejects_bad_rows_and_words() {
        assert!(parse_line("edit 0", &DialogState::Closed).is_err());
        assert!(parse_line("rm x", &DialogState::Closed).is_err());
        assert!(parse_line("frobnicate", &DialogState::Closed).is_err());
        assert!(parse_line("status done", &DialogState::Closed).is_err());
    }

    #[test]
    fn add_dialog_captures_free_text() {
        let adding = DialogState::Adding(AddDraft::default());
        assert_eq!(
            parse_line("edit 2", &adding).expect("parse"),
            Some(Action::Input("edit 2".to_string()))
        );
        assert_eq!(parse_line(" save ", &adding).expect("parse"), Some(Action::Save));
        assert_eq!(
            parse_line("", &adding).expect("parse"),
            Some(Action::Input(String::new()))
        );
    }
}
