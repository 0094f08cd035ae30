//! Submitted todo fields and their validation.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::todo::{Todo, TodoFields};

pub const TITLE_MAX_CHARS: usize = 200;

const DATE_INPUT_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y"];

/// Raw form values as posted by the browser. Missing fields are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub due_date: String,
    #[serde(default, deserialize_with = "checkbox")]
    pub resolved: bool,
}

/// Field name to message; empty means the form is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormErrors(BTreeMap<&'static str, String>);

impl FormErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> { self.0.get(field).map(String::as_str) }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in self.iter() {
            if !first { f.write_str("; ")?; }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for FormErrors {}

impl TodoForm {
    pub fn from_todo(todo: &Todo) -> Self {
        Self {
            title: todo.title.clone(),
            description: todo.description.clone(),
            due_date: todo.due_date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
            resolved: todo.resolved,
        }
    }

    pub fn validate(&self) -> Result<TodoFields, FormErrors> {
        let mut errors = FormErrors::default();

        let title = self.title.trim();
        let title_len = title.chars().count();
        if title.is_empty() {
            errors.add("title", "This field is required.");
        } else if title_len > TITLE_MAX_CHARS {
            errors.add(
                "title",
                format!("Ensure this value has at most {TITLE_MAX_CHARS} characters (it has {title_len})."),
            );
        }

        let due_date = match parse_date(&self.due_date) {
            Ok(date) => date,
            Err(()) => {
                errors.add("due_date", "Enter a valid date.");
                None
            }
        };

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(TodoFields {
            title: title.to_string(),
            description: self.description.clone(),
            due_date,
            resolved: self.resolved,
        })
    }
}

fn parse_date(raw: &str) -> Result<Option<NaiveDate>, ()> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    DATE_INPUT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .map(Some)
        .ok_or(())
}

// An HTML checkbox is only sent when checked, usually as "on".
fn checkbox<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.is_some_and(|v| !matches!(v.trim(), "" | "0" | "false" | "False" | "off")))
}
