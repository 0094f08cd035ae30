use std::{net::SocketAddr, path::PathBuf};

use anyhow::{anyhow, Context, Result};

use crate::domain::todo::TodoOrdering;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://todos.db";
pub const DEFAULT_ADDR: &str = "127.0.0.1:3000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub addr: SocketAddr,
    pub ordering: TodoOrdering,
    /// Log file for the terminal client; it does not log without one.
    pub tui_log: Option<PathBuf>,
}

impl Config {
    /// Reads `.env` (if any) and then the process environment.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let addr_raw = lookup("APP_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr: SocketAddr = addr_raw
            .parse()
            .with_context(|| format!("APP_ADDR={addr_raw:?} is not a socket address"))?;

        let ordering = match lookup("TODO_ORDERING") {
            None => TodoOrdering::default(),
            Some(raw) => TodoOrdering::parse(&raw)
                .ok_or_else(|| anyhow!("TODO_ORDERING={raw:?} must be `newest` or `agenda`"))?,
        };

        let tui_log = lookup("TODO_TUI_LOG").filter(|p| !p.trim().is_empty()).map(PathBuf::from);

        Ok(Self { database_url, addr, ordering, tui_log })
    }
}
