use std::io::{self, IsTerminal, Write};

use chrono::Local;
use tasklist_shared::Task;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::view_model::{DialogState, TaskViewModel};

pub const EMPTY_STATE: &str = "No Tasks found";

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            color: cfg.color()? && io::stdout().is_terminal(),
        })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    /// Prints the filtered view, or the empty-state panel when the search
    /// matched nothing.
    #[tracing::instrument(skip(self, vm, out))]
    pub fn print_view<W: Write>(&self, out: &mut W, vm: &TaskViewModel) -> anyhow::Result<()> {
        if vm.shows_empty_state() {
            writeln!(out, "{}", self.paint(EMPTY_STATE, "35;4"))?;
            return Ok(());
        }

        self.print_task_table(out, &vm.filtered())
    }

    pub fn print_task_table<W: Write>(&self, out: &mut W, tasks: &[&Task]) -> anyhow::Result<()> {
        let headers = vec![
            "#".to_string(),
            "Status".to_string(),
            "Title".to_string(),
            "Updated".to_string(),
        ];

        let mut rows = Vec::with_capacity(tasks.len());

        for (idx, task) in tasks.iter().enumerate() {
            let row = self.paint(&(idx + 1).to_string(), "33");
            let status = task.completed.to_string();
            let title = if task.is_completed() {
                self.paint(&task.title, "9;32")
            } else {
                task.title.clone()
            };
            let updated = task
                .updated_at
                .map(|date| date.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();

            rows.push(vec![row, status, title, updated]);
        }

        write_table(out, headers, rows)
    }

    pub fn print_dialog<W: Write>(&self, out: &mut W, dialog: &DialogState) -> anyhow::Result<()> {
        match dialog {
            DialogState::Closed => {}
            DialogState::Adding(draft) => {
                writeln!(out, "{}", self.paint("New Task", "1"))?;
                writeln!(out, "  title  {}", draft.input)?;
            }
            DialogState::Editing(draft) => {
                writeln!(out, "{}", self.paint("Update Task", "1"))?;
                writeln!(out, "  id     {}", draft.id)?;
                writeln!(out, "  title  {}", draft.title)?;
                writeln!(out, "  status {}", draft.status)?;
            }
        }
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
