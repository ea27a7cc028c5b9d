#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::error::TaskdeckError;

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Todo,
    Doing,
    Done,
}

impl TaskStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::Doing => "doing",
            Self::Done => "done",
        }
    }

    /// todo -> doing -> done -> todo
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::Todo => Self::Doing,
            Self::Doing => Self::Done,
            Self::Done => Self::Todo,
        }
    }

    #[must_use]
    pub fn is_done(self) -> bool {
        self == Self::Done
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = TaskdeckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "todo" => Ok(Self::Todo),
            "doing" => Ok(Self::Doing),
            "done" => Ok(Self::Done),
            other => Err(TaskdeckError::InvalidStatus(other.to_owned())),
        }
    }
}

/// Stored and exchanged as the bare integer 1, 2 or 3.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "u8", into = "u8")]
pub enum Priority {
    Low = 1,
    #[default]
    Medium = 2,
    High = 3,
}

impl Priority {
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    #[must_use]
    pub fn value(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Low -> Medium -> High -> Low
    #[must_use]
    pub fn cycle(self) -> Self {
        match self {
            Self::Low => Self::Medium,
            Self::Medium => Self::High,
            Self::High => Self::Low,
        }
    }
}

impl TryFrom<u8> for Priority {
    type Error = TaskdeckError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(Self::Low),
            2 => Ok(Self::Medium),
            3 => Ok(Self::High),
            other => Err(TaskdeckError::InvalidPriority(other)),
        }
    }
}

impl From<Priority> for u8 {
    fn from(p: Priority) -> Self {
        p.value()
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, with = "deadline_serde")]
    pub deadline: Option<Date>,
    pub priority: Priority,
    pub status: TaskStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Fields supplied when creating a task. Id and timestamps are assigned by
/// the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub deadline: Option<Date>,
    pub priority: Priority,
    pub status: TaskStatus,
}

impl TaskDraft {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn deadline(mut self, deadline: Date) -> Self {
        self.deadline = Some(deadline);
        self
    }

    #[must_use]
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Partial update merged over an existing task. `None` leaves a field as is;
/// `deadline: Some(None)` clears the deadline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub deadline: Option<Option<Date>>,
    pub priority: Option<Priority>,
    pub status: Option<TaskStatus>,
}

impl TaskPatch {
    #[must_use]
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn priority(priority: Priority) -> Self {
        Self {
            priority: Some(priority),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.deadline.is_none()
            && self.priority.is_none()
            && self.status.is_none()
    }

    pub(crate) fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            task.description.clone_from(description);
        }
        if let Some(deadline) = self.deadline {
            task.deadline = deadline;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
    }
}

pub fn parse_date(input: &str) -> Result<Date, TaskdeckError> {
    Date::parse(input.trim(), DATE_FORMAT).map_err(|e| TaskdeckError::InvalidDate {
        input: input.to_owned(),
        msg: format!("expected YYYY-MM-DD ({e})"),
    })
}

#[must_use]
pub fn format_date(date: Date) -> String {
    date.format(DATE_FORMAT)
        .unwrap_or_else(|_| date.to_string())
}

/// Date-only deadline. Absent is `null`; an empty string also reads as
/// absent since that is what a cleared date input produces.
mod deadline_serde {
    use serde::{Deserialize as _, Deserializer, Serializer};
    use time::Date;

    pub fn serialize<S: Serializer>(value: &Option<Date>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_str(&super::format_date(*d)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Date>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => super::parse_date(s)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    fn sample() -> Task {
        Task {
            id: 1_717_000_000_000,
            title: "Write report".to_owned(),
            description: String::new(),
            deadline: Some(date!(2024 - 06 - 01)),
            priority: Priority::High,
            status: TaskStatus::Doing,
            created_at: datetime!(2024-05-29 10:00 UTC),
            updated_at: datetime!(2024-05-29 10:00 UTC),
        }
    }

    #[test]
    fn task_serializes_with_camel_case_keys() {
        let v = serde_json::to_value(sample()).unwrap();
        assert_eq!(v["deadline"], "2024-06-01");
        assert_eq!(v["priority"], 3);
        assert_eq!(v["status"], "doing");
        assert!(v.get("createdAt").is_some());
        assert!(v.get("updatedAt").is_some());
    }

    #[test]
    fn task_reads_browser_style_record() {
        let raw = r#"{
            "id": 1717000000000,
            "title": "Pay rent",
            "description": "",
            "deadline": "",
            "priority": 1,
            "status": "todo",
            "createdAt": "2024-05-29T10:00:00.000Z",
            "updatedAt": "2024-05-29T11:30:00.123Z"
        }"#;
        let task: Task = serde_json::from_str(raw).unwrap();
        assert_eq!(task.deadline, None);
        assert_eq!(task.priority, Priority::Low);
        assert_eq!(task.status, TaskStatus::Todo);
        assert!(task.updated_at > task.created_at);
    }

    #[test]
    fn missing_description_and_null_deadline_default() {
        let raw = r#"{"id":1,"title":"t","deadline":null,"priority":2,"status":"done",
            "createdAt":"2024-01-01T00:00:00Z","updatedAt":"2024-01-01T00:00:00Z"}"#;
        let task: Task = serde_json::from_str(raw).unwrap();
        assert_eq!(task.description, "");
        assert_eq!(task.deadline, None);
    }

    #[test]
    fn priority_out_of_range_is_rejected() {
        let raw = r#"{"id":1,"title":"t","priority":7,"status":"todo",
            "createdAt":"2024-01-01T00:00:00Z","updatedAt":"2024-01-01T00:00:00Z"}"#;
        assert!(serde_json::from_str::<Task>(raw).is_err());
        assert!(matches!(
            Priority::try_from(0),
            Err(TaskdeckError::InvalidPriority(0))
        ));
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("DOING".parse::<TaskStatus>().unwrap(), TaskStatus::Doing);
        assert!("later".parse::<TaskStatus>().is_err());
        assert_eq!(TaskStatus::Done.next(), TaskStatus::Todo);
    }

    #[test]
    fn patch_merges_only_present_fields() {
        let mut task = sample();
        let patch = TaskPatch {
            deadline: Some(None),
            priority: Some(Priority::Low),
            ..TaskPatch::default()
        };
        patch.apply_to(&mut task);
        assert_eq!(task.deadline, None);
        assert_eq!(task.priority, Priority::Low);
        assert_eq!(task.title, "Write report");
        assert_eq!(task.status, TaskStatus::Doing);
        assert!(TaskPatch::default().is_empty());
    }

    #[test]
    fn parse_date_reports_input() {
        assert_eq!(parse_date("2099-01-01").unwrap(), date!(2099 - 01 - 01));
        let err = parse_date("01/02/2099").unwrap_err();
        assert!(err.to_string().contains("01/02/2099"));
    }
}
