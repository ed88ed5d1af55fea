use axum::{routing::get, Router};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use dotenvy::dotenv;
use flockserver::channels::voice_call::VoiceCallClient;
use flockserver::config::AppConfig;
use flockserver::memory::embeddings::EmbeddingClient;
use flockserver::memory::vector::QdrantMemoryIndex;
use flockserver::outreach::{configure_outreach_routes, run_tick};
use flockserver::shared::state::AppState;
use flockserver::shared::utils::create_conn;
use log::{error, info};
use std::sync::Arc;
use tokio::time::{interval, Duration};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    let config = AppConfig::from_env()?;
    let pool = create_conn()?;
    {
        let mut conn = pool.get()?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| anyhow::anyhow!("Migrations failed: {}", e))?;
    }

    let memory_index = Arc::new(QdrantMemoryIndex::connect(&config.qdrant_url)?);
    let state = Arc::new(AppState {
        voice: Arc::new(VoiceCallClient::new(config.voice.clone())),
        embeddings: Arc::new(EmbeddingClient::new(config.embedding.clone())),
        member_memory: memory_index.clone(),
        church_memory: memory_index,
        conn: pool,
        config: config.clone(),
    });

    if config.outreach_tick_secs > 0 {
        let tick_state = state.clone();
        let secs = config.outreach_tick_secs;
        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(secs));
            loop {
                ticker.tick().await;
                match run_tick(tick_state.clone()).await {
                    Ok(summaries) => {
                        let executed: usize = summaries.iter().map(|s| s.executed).sum();
                        info!(
                            "Outreach tick finished: {} organizations, {} calls dispatched",
                            summaries.len(),
                            executed
                        );
                    }
                    Err(e) => error!("Outreach tick failed: {}", e),
                }
            }
        });
    }

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(configure_outreach_routes())
        .with_state(state);

    info!(
        "Starting HTTP server on {}:{}",
        config.server.host, config.server.port
    );
    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
