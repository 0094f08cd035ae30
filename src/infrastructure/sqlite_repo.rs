use std::{path::Path, str::FromStr, sync::Arc};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};
use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow}, Pool, Row, Sqlite};
use uuid::Uuid;

use crate::domain::{
    repository::TodoRepository,
    todo::{Todo, TodoCounts, TodoFields, TodoFilter, TodoId, TodoOrdering},
};

const COLUMNS: &str = "id, title, description, due_date, resolved, created_at, updated_at";

#[derive(Clone)]
pub struct SqliteTodoRepository {
    pool: Arc<Pool<Sqlite>>,
    ordering: TodoOrdering,
}

impl SqliteTodoRepository {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid database url {database_url}"))?
            .create_if_missing(true);

        // An in-memory database lives exactly as long as its one connection.
        let pool_options = if is_in_memory(database_url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            prepare_sqlite_dir(database_url)?;
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("connecting to {database_url}"))?;
        Ok(Self { pool: Arc::new(pool), ordering: TodoOrdering::default() })
    }

    pub fn with_ordering(mut self, ordering: TodoOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn pool(&self) -> &Pool<Sqlite> { &self.pool }

    // Writes every mutable column; id and created_at never change.
    async fn save(&self, todo: &Todo) -> Result<()> {
        sqlx::query(
            "UPDATE todos SET title = ?2, description = ?3, due_date = ?4, resolved = ?5, updated_at = ?6 WHERE id = ?1",
        )
        .bind(todo.id.0.to_string())
        .bind(&todo.title)
        .bind(&todo.description)
        .bind(todo.due_date)
        .bind(todo.resolved)
        .bind(timestamp(&todo.updated_at))
        .execute(&*self.pool)
        .await
        .with_context(|| format!("saving todo {}", todo.id))?;
        Ok(())
    }
}

#[async_trait]
impl TodoRepository for SqliteTodoRepository {
    async fn init(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&*self.pool)
            .await
            .context("running migrations")?;
        Ok(())
    }

    async fn create(&self, fields: TodoFields) -> Result<Todo> {
        let now = now();
        let todo = Todo {
            id: TodoId::new(),
            title: fields.title,
            description: fields.description,
            due_date: fields.due_date,
            resolved: fields.resolved,
            created_at: now,
            updated_at: now,
        };
        sqlx::query(
            "INSERT INTO todos (id, title, description, due_date, resolved, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(todo.id.0.to_string())
        .bind(&todo.title)
        .bind(&todo.description)
        .bind(todo.due_date)
        .bind(todo.resolved)
        .bind(timestamp(&todo.created_at))
        .bind(timestamp(&todo.updated_at))
        .execute(&*self.pool)
        .await
        .context("inserting todo")?;
        Ok(todo)
    }

    async fn get(&self, id: TodoId) -> Result<Option<Todo>> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM todos WHERE id = ?1"))
            .bind(id.0.to_string())
            .fetch_optional(&*self.pool)
            .await
            .with_context(|| format!("loading todo {id}"))?;
        row.map(row_to_todo).transpose()
    }

    async fn list(&self, filter: TodoFilter) -> Result<Vec<Todo>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM todos {} ORDER BY {}",
            where_clause(filter),
            order_clause(self.ordering),
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .context("listing todos")?;
        rows.into_iter().map(row_to_todo).collect()
    }

    async fn counts(&self) -> Result<TodoCounts> {
        let row = sqlx::query("SELECT COUNT(*) AS total, COALESCE(SUM(resolved), 0) AS done FROM todos")
            .fetch_one(&*self.pool)
            .await
            .context("counting todos")?;
        let total: i64 = row.try_get("total")?;
        let done: i64 = row.try_get("done")?;
        Ok(TodoCounts::from_resolved(usize::try_from(total)?, usize::try_from(done)?))
    }

    async fn update(&self, id: TodoId, fields: TodoFields) -> Result<Option<Todo>> {
        let Some(mut todo) = self.get(id).await? else { return Ok(None) };
        todo.apply(fields, now());
        self.save(&todo).await?;
        Ok(Some(todo))
    }

    async fn toggle(&self, id: TodoId) -> Result<Option<Todo>> {
        let Some(mut todo) = self.get(id).await? else { return Ok(None) };
        todo.toggle(now());
        self.save(&todo).await?;
        Ok(Some(todo))
    }

    async fn delete(&self, id: TodoId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM todos WHERE id = ?1")
            .bind(id.0.to_string())
            .execute(&*self.pool)
            .await
            .with_context(|| format!("deleting todo {id}"))?;
        Ok(result.rows_affected() > 0)
    }
}

fn where_clause(filter: TodoFilter) -> &'static str {
    match filter {
        TodoFilter::All => "",
        TodoFilter::Active => "WHERE resolved = 0",
        TodoFilter::Done => "WHERE resolved = 1",
    }
}

fn order_clause(ordering: TodoOrdering) -> &'static str {
    match ordering {
        TodoOrdering::Newest => "created_at DESC",
        TodoOrdering::Agenda => "resolved ASC, due_date IS NULL, due_date ASC, created_at DESC",
    }
}

// Stored values carry microseconds, so keep in-memory values at the same precision.
fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

fn timestamp(at: &DateTime<Utc>) -> String { at.to_rfc3339_opts(SecondsFormat::Micros, true) }

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("bad timestamp {raw:?}"))?
        .with_timezone(&Utc))
}

fn row_to_todo(row: SqliteRow) -> Result<Todo> {
    let id_str: String = row.try_get("id")?;
    let created_at_str: String = row.try_get("created_at")?;
    let updated_at_str: String = row.try_get("updated_at")?;
    let due_date: Option<NaiveDate> = row.try_get("due_date")?;

    Ok(Todo {
        id: TodoId(Uuid::parse_str(&id_str).with_context(|| format!("bad todo id {id_str:?}"))?),
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        due_date,
        resolved: row.try_get("resolved")?,
        created_at: parse_timestamp(&created_at_str)?,
        updated_at: parse_timestamp(&updated_at_str)?,
    })
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.starts_with("sqlite::memory:") || database_url.contains("mode=memory")
}

/// Creates the parent directory of a file-backed database.
pub fn prepare_sqlite_dir(database_url: &str) -> Result<()> {
    let Some(path) = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
    else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or(path);
    // On Windows, absolute paths may look like /C:/path; strip the leading slash
    let path = if cfg!(windows) && path.len() >= 3 && path.as_bytes()[0] == b'/' && path.as_bytes()[2] == b':' {
        &path[1..]
    } else {
        path
    };
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    Ok(())
}
