use axum::{routing::get, Router};
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use std::{env, net::SocketAddr, sync::Arc};
use anyhow::Result;

use lunara_backend::audit::AccessAuditor;
use lunara_backend::cache::{InMemoryTtlCache, KeyValueCache, ResultCache};
use lunara_backend::repository::PgHistoryRepository;
use lunara_backend::routes::{self, AppState};
use lunara_backend::service::InsightsService;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let database_url = env::var("DATABASE_URL")?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    let store: Arc<dyn KeyValueCache> = Arc::new(InMemoryTtlCache::new());
    let repository = Arc::new(PgHistoryRepository::new(pool.clone()));
    let service = Arc::new(InsightsService::new(
        repository,
        ResultCache::new(store.clone()),
    ));
    let auditor = Arc::new(AccessAuditor::new(store));
    let state = AppState {
        pool,
        service,
        auditor,
    };

    let app = Router::new()
        .merge(routes::insights::routes(state.clone()))
        .merge(routes::security::routes(state))
        .route("/health", get(|| async { "✅ Backend up" }));

    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3050);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("🧠 Server running at {}", addr);

    axum::serve(
        tokio::net::TcpListener::bind(addr).await?,
        app.into_make_service(),
    )
    .await?;

    Ok(())
}
