use todo_web::application::todo_service::TodoServiceImpl;
use todo_web::config::Config;
use todo_web::domain::repository::TodoRepository;
use todo_web::http::routing::{self, todos};
use todo_web::infrastructure::sqlite_repo::SqliteTodoRepository;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let repo = SqliteTodoRepository::connect(&config.database_url)
        .await?
        .with_ordering(config.ordering);
    repo.init().await?;
    tracing::info!(database_url = %config.database_url, ordering = ?config.ordering, "database ready");

    let service = TodoServiceImpl::new(repo);
    let router = routing::app(todos::router(todos::AppState { service }));

    tracing::info!(addr = %config.addr, "listening");
    axum::serve(tokio::net::TcpListener::bind(config.addr).await?, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal::ctrl_c;
    let _ = ctrl_c().await;
    tracing::info!("shutdown");
}
