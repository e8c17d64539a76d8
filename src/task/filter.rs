//! Filter selectors for the task list view.

use std::str::FromStr;

use super::task::{Priority, Task};

/// A single active selector narrowing the displayed task sequence.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TaskFilter {
    /// No narrowing.
    #[default]
    All,
    /// Free-form selector as sent by the sidebar.
    ///
    /// Matches a task when the selector equals its priority label OR one of
    /// its categories, so a category literally named `P1` also matches the
    /// `P1` selector.
    Selector(String),
    /// Priority only.
    Priority(Priority),
    /// Category label only.
    Category(String),
}

impl TaskFilter {
    /// Build a filter from an optional sidebar selector.
    pub fn from_selector(selector: Option<&str>) -> Self {
        match selector.map(str::trim) {
            None | Some("") => Self::All,
            Some(s) => Self::Selector(s.to_string()),
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Selector(s) => task.priority.as_str() == s || task.has_category(s),
            Self::Priority(p) => task.priority == *p,
            Self::Category(label) => task.has_category(label),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

impl FromStr for TaskFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_selector(Some(s)))
    }
}
