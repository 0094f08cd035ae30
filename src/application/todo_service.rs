use crate::application::todo_form::{FormErrors, TodoForm};
use crate::domain::repository::TodoRepository;
use crate::domain::todo::{Todo, TodoCounts, TodoFilter, TodoId};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid todo: {0}")]
    Invalid(FormErrors),
    #[error("todo {0} not found")]
    NotFound(TodoId),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Clone)]
pub struct TodoListing {
    pub filter: TodoFilter,
    pub todos: Vec<Todo>,
    pub counts: TodoCounts,
}

#[async_trait]
pub trait TodoService: Send + Sync + 'static {
    async fn list(&self, filter: TodoFilter) -> ServiceResult<TodoListing>;
    async fn get(&self, id: TodoId) -> ServiceResult<Todo>;
    async fn create(&self, form: &TodoForm) -> ServiceResult<Todo>;
    async fn update(&self, id: TodoId, form: &TodoForm) -> ServiceResult<Todo>;
    async fn toggle(&self, id: TodoId) -> ServiceResult<Todo>;
    async fn delete(&self, id: TodoId) -> ServiceResult<()>;
}

#[derive(Clone)]
pub struct TodoServiceImpl<R: TodoRepository> {
    repo: R,
}

impl<R: TodoRepository> TodoServiceImpl<R> {
    pub fn new(repo: R) -> Self { Self { repo } }
}

#[async_trait]
impl<R: TodoRepository> TodoService for TodoServiceImpl<R> {
    async fn list(&self, filter: TodoFilter) -> ServiceResult<TodoListing> {
        let todos = self.repo.list(filter).await?;
        let counts = self.repo.counts().await?;
        Ok(TodoListing { filter, todos, counts })
    }

    async fn get(&self, id: TodoId) -> ServiceResult<Todo> {
        self.repo.get(id).await?.ok_or(ServiceError::NotFound(id))
    }

    async fn create(&self, form: &TodoForm) -> ServiceResult<Todo> {
        let fields = form.validate().map_err(ServiceError::Invalid)?;
        let todo = self.repo.create(fields).await?;
        tracing::info!(id = %todo.id, "todo created");
        Ok(todo)
    }

    async fn update(&self, id: TodoId, form: &TodoForm) -> ServiceResult<Todo> {
        let fields = form.validate().map_err(ServiceError::Invalid)?;
        let todo = self.repo.update(id, fields).await?.ok_or(ServiceError::NotFound(id))?;
        tracing::info!(%id, "todo updated");
        Ok(todo)
    }

    async fn toggle(&self, id: TodoId) -> ServiceResult<Todo> {
        let todo = self.repo.toggle(id).await?.ok_or(ServiceError::NotFound(id))?;
        tracing::info!(%id, resolved = todo.resolved, "todo toggled");
        Ok(todo)
    }

    async fn delete(&self, id: TodoId) -> ServiceResult<()> {
        if !self.repo.delete(id).await? {
            return Err(ServiceError::NotFound(id));
        }
        tracing::info!(%id, "todo deleted");
        Ok(())
    }
}
