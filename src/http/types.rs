use axum::extract::rejection::FormRejection;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use chrono::NaiveDate;
use minijinja::context;
use serde::Serialize;
use thiserror::Error;

use crate::application::todo_service::ServiceError;
use crate::domain::todo::{Todo, TodoCounts, TodoFilter};
use crate::http::templates;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found")]
    NotFound,
    /// The submitted form could not be decoded at all.
    #[error(transparent)]
    Rejected(#[from] FormRejection),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(_) => Self::NotFound,
            ServiceError::Storage(err) => Self::Internal(err),
            ServiceError::Invalid(errors) => Self::Internal(anyhow::Error::new(errors)),
        }
    }
}

impl From<minijinja::Error> for AppError {
    fn from(err: minijinja::Error) -> Self { Self::Internal(anyhow::Error::new(err)) }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, template, message) = match &self {
            Self::NotFound => (StatusCode::NOT_FOUND, "404.html", String::new()),
            Self::Rejected(rejection) => {
                tracing::warn!(%rejection, "form rejected");
                (rejection.status(), "400.html", rejection.body_text())
            }
            Self::Internal(err) => {
                tracing::error!(error = ?err, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "500.html", String::new())
            }
        };
        match templates::render(template, context! { message => message }) {
            Ok(body) => (status, Html(body)).into_response(),
            Err(_) => (status, status.canonical_reason().unwrap_or("error")).into_response(),
        }
    }
}

/// A todo as the list page shows it.
#[derive(Debug, Serialize)]
pub struct TodoView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub due_date: Option<String>,
    pub resolved: bool,
    pub overdue: bool,
    pub due_today: bool,
}

impl TodoView {
    pub fn new(todo: &Todo, today: NaiveDate) -> Self {
        Self {
            id: todo.id.to_string(),
            title: todo.title.clone(),
            description: todo.description.clone(),
            due_date: todo.due_date.map(|d| d.format("%b %-d, %Y").to_string()),
            resolved: todo.resolved,
            overdue: !todo.resolved && todo.is_overdue(today),
            due_today: !todo.resolved && todo.is_due_today(today),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FilterTab {
    pub href: &'static str,
    pub label: &'static str,
    pub count: usize,
    pub current: bool,
}

impl FilterTab {
    pub fn new(filter: TodoFilter, selected: TodoFilter, counts: &TodoCounts) -> Self {
        Self { href: list_url(filter), label: filter.label(), count: counts.for_filter(filter), current: filter == selected }
    }
}

pub fn list_url(filter: TodoFilter) -> &'static str {
    match filter {
        TodoFilter::All => "/",
        TodoFilter::Active => "/?filter=active",
        TodoFilter::Done => "/?filter=done",
    }
}
