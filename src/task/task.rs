//! Core task types.
//!
//! Invariants:
//! - `Task::id` is assigned once at creation and never changes
//! - `Task::priority` is always one of the four levels
//! - `Task::categories` never holds the same label twice

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Duration given to tasks before any estimate is available.
pub const DEFAULT_DURATION: &str = "15m";

/// Unique identifier for a task.
///
/// Backed by a time-ordered UUIDv7, so identifiers minted later in a process
/// compare greater than earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Mint a new identifier from the current timestamp.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Task urgency, `P1` being the most urgent.
///
/// Ordering follows urgency: `P1 < P2 < P3 < P4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    P1,
    P2,
    P3,
    P4,
}

impl Priority {
    /// All levels, most urgent first.
    pub const ALL: [Priority; 4] = [Priority::P1, Priority::P2, Priority::P3, Priority::P4];

    /// Priority assigned when a task is first submitted.
    pub const PROVISIONAL: Priority = Priority::P3;

    /// Priority used when extraction yields nothing usable.
    pub const LOWEST: Priority = Priority::P4;

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::P1 => "P1",
            Self::P2 => "P2",
            Self::P3 => "P3",
            Self::P4 => "P4",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "P1" => Ok(Self::P1),
            "P2" => Ok(Self::P2),
            "P3" => Ok(Self::P3),
            "P4" => Ok(Self::P4),
            other => Err(TaskError::InvalidField {
                field: "priority",
                reason: format!("unknown priority `{}`", other),
            }),
        }
    }
}

/// Errors from task mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("task {0} not found")]
    NotFound(TaskId),

    #[error("index {index} out of range for {len} tasks")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// A single to-do entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub due_date: Option<DateTime<Utc>>,
    pub duration: String,
    pub priority: Priority,
    pub categories: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Create a provisional task with placeholder values.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(),
            title: title.into(),
            due_date: None,
            duration: DEFAULT_DURATION.to_string(),
            priority: Priority::PROVISIONAL,
            categories: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn rename(&mut self, title: &str) -> Result<(), TaskError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(TaskError::InvalidField {
                field: "title",
                reason: "title cannot be empty".to_string(),
            });
        }
        self.title = title.to_string();
        Ok(())
    }

    pub fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
    }

    pub fn set_duration(&mut self, duration: &str) -> Result<(), TaskError> {
        let duration = duration.trim();
        if duration.is_empty() {
            return Err(TaskError::InvalidField {
                field: "duration",
                reason: "duration cannot be empty".to_string(),
            });
        }
        self.duration = duration.to_string();
        Ok(())
    }

    pub fn set_due_date(&mut self, due_date: Option<DateTime<Utc>>) {
        self.due_date = due_date;
    }

    /// Add a category label.
    ///
    /// Returns `Ok(false)` when the label is already present.
    pub fn add_category(&mut self, label: &str) -> Result<bool, TaskError> {
        let label = label.trim();
        if label.is_empty() {
            return Err(TaskError::InvalidField {
                field: "categories",
                reason: "category label cannot be empty".to_string(),
            });
        }
        if self.has_category(label) {
            return Ok(false);
        }
        self.categories.push(label.to_string());
        Ok(true)
    }

    /// Remove a category label, returning whether it was present.
    pub fn remove_category(&mut self, label: &str) -> bool {
        let label = label.trim();
        let before = self.categories.len();
        self.categories.retain(|c| c != label);
        self.categories.len() != before
    }

    /// Replace all categories, dropping blanks and duplicates.
    pub fn set_categories<I, S>(&mut self, labels: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.categories = dedup_labels(labels);
    }

    pub fn has_category(&self, label: &str) -> bool {
        self.categories.iter().any(|c| c == label)
    }
}

/// Trim labels, drop blanks, and keep the first occurrence of each.
pub fn dedup_labels<I, S>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for label in labels {
        let label = label.as_ref().trim();
        if !label.is_empty() && !out.iter().any(|l| l == label) {
            out.push(label.to_string());
        }
    }
    out
}

/// A set of field updates merged into a task by identifier.
///
/// `None` leaves a field unchanged. `due_date: Some(None)` clears the date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub duration: Option<String>,
    pub priority: Option<Priority>,
    pub categories: Option<Vec<String>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.due_date.is_none()
            && self.duration.is_none()
            && self.priority.is_none()
            && self.categories.is_none()
    }

    /// Check field values without touching any task.
    pub fn validate(&self) -> Result<(), TaskError> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(TaskError::InvalidField {
                    field: "title",
                    reason: "title cannot be empty".to_string(),
                });
            }
        }
        if let Some(duration) = &self.duration {
            if duration.trim().is_empty() {
                return Err(TaskError::InvalidField {
                    field: "duration",
                    reason: "duration cannot be empty".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Merge this patch into `task`. Fields are applied independently.
    pub fn apply_to(self, task: &mut Task) -> Result<(), TaskError> {
        self.validate()?;
        if let Some(title) = self.title {
            task.rename(&title)?;
        }
        if let Some(due_date) = self.due_date {
            task.set_due_date(due_date);
        }
        if let Some(duration) = self.duration {
            task.set_duration(&duration)?;
        }
        if let Some(priority) = self.priority {
            task.set_priority(priority);
        }
        if let Some(categories) = self.categories {
            task.set_categories(categories);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task_has_provisional_defaults() {
        let task = Task::new("buy milk");
        assert_eq!(task.title, "buy milk");
        assert_eq!(task.priority, Priority::P3);
        assert_eq!(task.duration, "15m");
        assert!(task.due_date.is_none());
        assert!(task.categories.is_empty());
    }

    #[test]
    fn test_priority_parse_and_order() {
        assert_eq!(" p2 ".parse::<Priority>().unwrap(), Priority::P2);
        assert!("P5".parse::<Priority>().is_err());
        assert!("".parse::<Priority>().is_err());
        assert!(Priority::P1 < Priority::P4);
        assert_eq!(Priority::P1.to_string(), "P1");
    }

    #[test]
    fn test_add_category_rejects_duplicates_and_blanks() {
        let mut task = Task::new("t");
        assert!(task.add_category(" Work ").unwrap());
        assert!(!task.add_category("Work").unwrap());
        assert!(task.add_category("   ").is_err());
        assert_eq!(task.categories, vec!["Work"]);

        assert!(task.remove_category(" Work "));
        assert!(!task.remove_category("Work"));
        assert!(task.categories.is_empty());
    }

    #[test]
    fn test_set_categories_deduplicates() {
        let mut task = Task::new("t");
        task.set_categories(["Errands", "Home", "Errands", ""]);
        assert_eq!(task.categories, vec!["Errands", "Home"]);
    }

    #[test]
    fn test_patch_merges_only_set_fields() {
        let mut task = Task::new("draft");
        let patch = TaskPatch {
            priority: Some(Priority::P1),
            duration: Some("2h".to_string()),
            ..TaskPatch::default()
        };
        patch.apply_to(&mut task).unwrap();
        assert_eq!(task.title, "draft");
        assert_eq!(task.priority, Priority::P1);
        assert_eq!(task.duration, "2h");
    }

    #[test]
    fn test_patch_with_blank_title_leaves_task_untouched() {
        let mut task = Task::new("draft");
        let patch = TaskPatch {
            title: Some("  ".to_string()),
            priority: Some(Priority::P1),
            ..TaskPatch::default()
        };
        assert!(patch.apply_to(&mut task).is_err());
        assert_eq!(task.title, "draft");
        assert_eq!(task.priority, Priority::P3);
    }

    #[test]
    fn test_task_serializes_camel_case() {
        let task = Task::new("t");
        let json = serde_json::to_value(&task).unwrap();
        assert!(json.get("dueDate").is_some());
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["priority"], "P3");
    }

    #[test]
    fn test_task_ids_are_unique_and_ordered() {
        let first = TaskId::new();
        let second = TaskId::new();
        assert_ne!(first, second);
        assert!(first < second);
        assert_eq!(first.to_string().parse::<TaskId>().unwrap(), first);
    }
}
