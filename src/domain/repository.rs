use async_trait::async_trait;
use super::todo::{Todo, TodoCounts, TodoFields, TodoFilter, TodoId};

#[async_trait]
pub trait TodoRepository: Send + Sync + 'static {
    async fn init(&self) -> anyhow::Result<()>;
    async fn create(&self, fields: TodoFields) -> anyhow::Result<Todo>;
    async fn get(&self, id: TodoId) -> anyhow::Result<Option<Todo>>;
    /// Records matching `filter`, in the repository's configured ordering.
    async fn list(&self, filter: TodoFilter) -> anyhow::Result<Vec<Todo>>;
    /// Counts over the whole table, independent of any filter.
    async fn counts(&self) -> anyhow::Result<TodoCounts>;
    async fn update(&self, id: TodoId, fields: TodoFields) -> anyhow::Result<Option<Todo>>;
    async fn toggle(&self, id: TodoId) -> anyhow::Result<Option<Todo>>;
    async fn delete(&self, id: TodoId) -> anyhow::Result<bool>;
}
