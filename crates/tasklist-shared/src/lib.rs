//! Wire types exchanged with the remote task store.

use std::fmt;
use std::str::FromStr;

use chrono::{
  DateTime,
  Utc
};
use serde::{
  Deserialize,
  Serialize
};

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Hash,
  Default,
)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
  #[default]
  Pending,
  Completed
}

impl TaskStatus {
  pub fn as_str(
    self
  ) -> &'static str {
    match self {
      | TaskStatus::Pending => {
        "pending"
      }
      | TaskStatus::Completed => {
        "completed"
      }
    }
  }

  pub fn toggled(self) -> Self {
    match self {
      | TaskStatus::Pending => {
        TaskStatus::Completed
      }
      | TaskStatus::Completed => {
        TaskStatus::Pending
      }
    }
  }
}

impl fmt::Display for TaskStatus {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError(String);

impl fmt::Display for ParseStatusError {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    write!(
      f,
      "unknown task status `{}` \
       (expected pending or \
       completed)",
      self.0
    )
  }
}

impl std::error::Error
  for ParseStatusError
{
}

impl FromStr for TaskStatus {
  type Err = ParseStatusError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "pending" => {
        Ok(TaskStatus::Pending)
      }
      | "completed" => {
        Ok(TaskStatus::Completed)
      }
      | _ => Err(ParseStatusError(
        s.to_string()
      ))
    }
  }
}

/// A task as the remote store reports
/// it. Timestamps and the revision
/// counter belong to the store.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct Task {
  pub id:         String,
  #[serde(default)]
  pub title:      String,
  #[serde(default)]
  pub completed:  TaskStatus,
  #[serde(
    rename = "createdAt",
    default,
    with = "wire_date_serde",
    skip_serializing_if = "Option::is_none"
  )]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(
    rename = "updatedAt",
    default,
    with = "wire_date_serde",
    skip_serializing_if = "Option::is_none"
  )]
  pub updated_at: Option<DateTime<Utc>>,
  #[serde(
    rename = "_v",
    alias = "__v",
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub revision:   Option<i64>,
  #[serde(
    rename = "_id",
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub object_id:  Option<String>
}

impl Task {
  pub fn is_completed(&self) -> bool {
    self.completed
      == TaskStatus::Completed
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct TaskCreate {
  pub title: String
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct TaskPatch {
  pub title:     String,
  pub completed: TaskStatus
}

/// Whatever the store answers to a
/// mutation. Decoded as JSON, never
/// inspected.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Default,
)]
#[serde(transparent)]
pub struct Ack(pub serde_json::Value);

/// Lenient timestamp codec: RFC 3339
/// strings parse, anything else
/// (missing, null, malformed) reads as
/// `None`.
mod wire_date_serde {
  use chrono::{
    DateTime,
    SecondsFormat,
    Utc
  };
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };

  pub fn serialize<S>(
    value: &Option<DateTime<Utc>>,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    match value {
      | Some(date) => serializer
        .serialize_str(
          &date.to_rfc3339_opts(
            SecondsFormat::Millis,
            true
          )
        ),
      | None => {
        serializer.serialize_none()
      }
    }
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<
    Option<DateTime<Utc>>,
    D::Error
  >
  where
    D: Deserializer<'de>
  {
    let raw = Option::<
      serde_json::Value
    >::deserialize(
      deserializer
    )?;
    Ok(
      raw
        .as_ref()
        .and_then(|value| {
          value.as_str()
        })
        .and_then(|text| {
          DateTime::parse_from_rfc3339(
            text
          )
          .ok()
        })
        .map(|date| {
          date.with_timezone(&Utc)
        })
    )
  }
}
