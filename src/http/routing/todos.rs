use std::collections::HashMap;

use axum::{extract::{rejection::FormRejection, Path, Query, State}, response::{Html, IntoResponse, Redirect, Response}, routing::{get, post}, Form, Router};
use chrono::Local;
use http::{header, HeaderMap, Uri};
use minijinja::context;

use crate::application::todo_form::{FormErrors, TodoForm};
use crate::application::todo_service::{ServiceError, TodoService};
use crate::domain::todo::{Todo, TodoFilter, TodoId};
use crate::http::templates;
use crate::http::types::{list_url, AppError, FilterTab, TodoView};

#[derive(Clone)]
pub struct AppState<S: TodoService> { pub service: S }

type Params = HashMap<String, String>;

pub fn router<S: TodoService + Clone>(state: AppState<S>) -> Router {
    Router::new()
        .route("/", get(list_todos::<S>))
        .route("/new", get(new_todo_form).post(create_todo::<S>))
        .route("/:id/edit", get(edit_todo_form::<S>).post(update_todo::<S>))
        .route("/:id/delete", get(confirm_delete::<S>).post(delete_todo::<S>))
        .route("/:id/toggle", post(toggle_todo::<S>))
        .with_state(state)
}

async fn list_todos<S: TodoService + Clone>(State(state): State<AppState<S>>, Query(params): Query<Params>) -> Result<Html<String>, AppError> {
    let filter = TodoFilter::from_param(params.get("filter").map(String::as_str));
    let listing = state.service.list(filter).await?;
    let today = Local::now().date_naive();
    let todos: Vec<_> = listing.todos.iter().map(|t| TodoView::new(t, today)).collect();
    let tabs: Vec<_> = TodoFilter::ALL.into_iter().map(|f| FilterTab::new(f, listing.filter, &listing.counts)).collect();
    let page = templates::render("todo_list.html", context! {
        filter => listing.filter.as_str(),
        current => list_url(listing.filter),
        counts => listing.counts,
        tabs => tabs,
        todos => todos,
    })?;
    Ok(Html(page))
}

async fn new_todo_form() -> Result<Html<String>, AppError> {
    form_page(&TodoForm::default(), &FormErrors::default(), None)
}

async fn create_todo<S: TodoService + Clone>(State(state): State<AppState<S>>, form: Result<Form<TodoForm>, FormRejection>) -> Result<Response, AppError> {
    let Form(form) = form?;
    match state.service.create(&form).await {
        Ok(_) => Ok(Redirect::to("/").into_response()),
        Err(ServiceError::Invalid(errors)) => Ok(form_page(&form, &errors, None)?.into_response()),
        Err(err) => Err(err.into()),
    }
}

async fn edit_todo_form<S: TodoService + Clone>(State(state): State<AppState<S>>, Path(id): Path<String>) -> Result<Html<String>, AppError> {
    let todo = state.service.get(parse_id(&id)?).await?;
    form_page(&TodoForm::from_todo(&todo), &FormErrors::default(), Some(&todo))
}

async fn update_todo<S: TodoService + Clone>(State(state): State<AppState<S>>, Path(id): Path<String>, form: Result<Form<TodoForm>, FormRejection>) -> Result<Response, AppError> {
    let id = parse_id(&id)?;
    let Form(form) = form?;
    match state.service.update(id, &form).await {
        Ok(_) => Ok(Redirect::to("/").into_response()),
        Err(ServiceError::Invalid(errors)) => {
            let todo = state.service.get(id).await?;
            Ok(form_page(&form, &errors, Some(&todo))?.into_response())
        }
        Err(err) => Err(err.into()),
    }
}

async fn confirm_delete<S: TodoService + Clone>(State(state): State<AppState<S>>, Path(id): Path<String>) -> Result<Html<String>, AppError> {
    let todo = state.service.get(parse_id(&id)?).await?;
    let today = Local::now().date_naive();
    Ok(Html(templates::render("todo_confirm_delete.html", context! { todo => TodoView::new(&todo, today) })?))
}

async fn delete_todo<S: TodoService + Clone>(State(state): State<AppState<S>>, Path(id): Path<String>) -> Result<Redirect, AppError> {
    state.service.delete(parse_id(&id)?).await?;
    Ok(Redirect::to("/"))
}

async fn toggle_todo<S: TodoService + Clone>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    Query(query): Query<Params>,
    headers: HeaderMap,
    body: Option<Form<Params>>,
) -> Result<Redirect, AppError> {
    state.service.toggle(parse_id(&id)?).await?;
    let next = body.and_then(|Form(mut b)| b.remove("next")).or_else(|| query.get("next").cloned());
    let referer = headers.get(header::REFERER).and_then(|v| v.to_str().ok());
    Ok(Redirect::to(&redirect_target(next.as_deref(), referer)))
}

fn form_page(form: &TodoForm, errors: &FormErrors, todo: Option<&Todo>) -> Result<Html<String>, AppError> {
    let (heading, action, submit) = match todo {
        None => ("Create New Task", "/new".to_string(), "Create"),
        Some(t) => ("Edit Task", format!("/{}/edit", t.id), "Save"),
    };
    Ok(Html(templates::render("todo_form.html", context! { heading => heading, action => action, submit => submit, form => form, errors => errors })?))
}

// Malformed ids can never match a row.
fn parse_id(s: &str) -> Result<TodoId, AppError> { TodoId::parse(s).ok_or(AppError::NotFound) }

/// Picks where to send the browser after a toggle: a local `next`, then the referer, then the list.
pub fn redirect_target(next: Option<&str>, referer: Option<&str>) -> String {
    if let Some(next) = next.filter(|n| is_local_path(n)) {
        return next.to_string();
    }
    referer
        .and_then(|r| r.parse::<Uri>().ok())
        .and_then(|uri| uri.path_and_query().map(|pq| pq.as_str().to_string()))
        .filter(|pq| is_local_path(pq))
        .unwrap_or_else(|| "/".to_string())
}

fn is_local_path(path: &str) -> bool {
    path.starts_with('/')
        && !path.starts_with("//")
        && !path.starts_with("/\\")
        && path.bytes().all(|b| b.is_ascii_graphic())
}
