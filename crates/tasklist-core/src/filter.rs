use tasklist_shared::Task;
use tracing::trace;

/// The search box contents, kept exactly as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
  raw: String
}

impl Query {
  pub fn new(
    raw: impl Into<String>
  ) -> Self {
    Self {
      raw: raw.into()
    }
  }

  pub fn as_str(&self) -> &str {
    &self.raw
  }

  /// True when the query has no
  /// characters at all.
  pub fn is_empty(&self) -> bool {
    self.raw.is_empty()
  }

  /// The comparison needle: trimmed,
  /// then lowercased.
  pub fn needle(&self) -> String {
    self.raw.trim().to_lowercase()
  }

  pub fn matches(
    &self,
    task: &Task
  ) -> bool {
    let needle = self.needle();
    matches_needle(task, &needle)
  }
}

fn matches_needle(
  task: &Task,
  needle: &str
) -> bool {
  needle.is_empty()
    || task
      .title
      .to_lowercase()
      .contains(needle)
}

#[tracing::instrument(skip(tasks, query), fields(total = tasks.len()))]
pub fn filter_tasks<'a>(
  tasks: &'a [Task],
  query: &Query
) -> Vec<&'a Task> {
  let needle = query.needle();
  let out: Vec<&Task> = tasks
    .iter()
    .filter(|task| {
      matches_needle(task, &needle)
    })
    .collect();
  trace!(
    needle = %needle,
    matched = out.len(),
    "filtered tasks"
  );
  out
}
