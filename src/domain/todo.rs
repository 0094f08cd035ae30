use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TodoId(pub Uuid);

impl TodoId {
    pub fn new() -> Self { Self(Uuid::new_v4()) }

    /// Parses a path segment; anything that is not a UUID is simply absent.
    pub fn parse(s: &str) -> Option<Self> { Uuid::parse_str(s).ok().map(Self) }
}

impl Default for TodoId {
    fn default() -> Self { Self::new() }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    pub description: String,
    pub due_date: Option<NaiveDate>,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Todo {
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.due_date.is_some_and(|due| due < today)
    }

    pub fn is_due_today(&self, today: NaiveDate) -> bool {
        self.due_date == Some(today)
    }

    /// Applies a validated field set, keeping `id` and `created_at`.
    pub fn apply(&mut self, fields: TodoFields, now: DateTime<Utc>) {
        self.title = fields.title;
        self.description = fields.description;
        self.due_date = fields.due_date;
        self.resolved = fields.resolved;
        self.touch(now);
    }

    pub fn toggle(&mut self, now: DateTime<Utc>) {
        self.resolved = !self.resolved;
        self.touch(now);
    }

    // updated_at never falls behind created_at, even if the clock steps back
    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now.max(self.created_at);
    }
}

/// A field set that has already passed form validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoFields {
    pub title: String,
    pub description: String,
    pub due_date: Option<NaiveDate>,
    pub resolved: bool,
}

impl TodoFields {
    pub fn titled(title: impl Into<String>) -> Self {
        Self { title: title.into(), description: String::new(), due_date: None, resolved: false }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TodoFilter {
    #[default]
    All,
    Active,
    Done,
}

impl TodoFilter {
    pub const ALL: [TodoFilter; 3] = [TodoFilter::All, TodoFilter::Active, TodoFilter::Done];

    /// Unknown or missing values fall back to `All`.
    pub fn from_param(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("active") => Self::Active,
            Some("done") | Some("resolved") => Self::Done,
            _ => Self::All,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Active => "active",
            Self::Done => "done",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Active => "Active",
            Self::Done => "Done",
        }
    }

    pub fn matches(self, todo: &Todo) -> bool {
        match self {
            Self::All => true,
            Self::Active => !todo.resolved,
            Self::Done => todo.resolved,
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::All => Self::Active,
            Self::Active => Self::Done,
            Self::Done => Self::All,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct TodoCounts {
    pub total: usize,
    pub active: usize,
    pub done: usize,
}

impl TodoCounts {
    pub fn from_resolved(total: usize, done: usize) -> Self {
        Self { total, active: total.saturating_sub(done), done }
    }

    pub fn for_filter(&self, filter: TodoFilter) -> usize {
        match filter {
            TodoFilter::All => self.total,
            TodoFilter::Active => self.active,
            TodoFilter::Done => self.done,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TodoOrdering {
    /// Most recently created first.
    #[default]
    Newest,
    /// Open items first, soonest due date first, undated last.
    Agenda,
}

impl TodoOrdering {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "newest" => Some(Self::Newest),
            "agenda" => Some(Self::Agenda),
            _ => None,
        }
    }

    pub fn compare(self, a: &Todo, b: &Todo) -> Ordering {
        let newest = b.created_at.cmp(&a.created_at);
        match self {
            Self::Newest => newest,
            Self::Agenda => a
                .resolved
                .cmp(&b.resolved)
                .then_with(|| match (a.due_date, b.due_date) {
                    (Some(x), Some(y)) => x.cmp(&y),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                })
                .then(newest),
        }
    }
}
