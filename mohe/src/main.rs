use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mohe::api::{create_router, AppState};
use mohe::config::Config;
use mohe::db::{Database, DatabaseBackend, LibSqlBackend};
use mohe::llm::LlmProvider;
use mohe::services::{
    FullRecalculationManager, SimilarityCleanupManager, TopKRefreshManager,
    VectorSimilarityBatchManager,
};
use mohe::weather::WeatherProvider;

#[derive(Parser)]
#[command(name = "mohe")]
#[command(about = "Place recommendation and similarity engine")]
struct Args {
    /// Run one full similarity recalculation before serving
    #[arg(long)]
    recalculate_on_start: bool,

    /// Do not start the background managers
    #[arg(long)]
    no_scheduler: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "mohe=info,tower_http=debug".into());
    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let config = Config::from_env();

    tracing::info!("Initializing database...");
    let raw_db = Database::new(&config.database).await?;
    let db: Arc<dyn DatabaseBackend> = Arc::new(LibSqlBackend::new(raw_db));

    if let Some(llm_config) = &config.llm {
        tracing::info!("Initializing LLM provider: {}...", llm_config.model);
    }
    let llm = LlmProvider::new(config.llm.as_ref());
    if !llm.is_available() {
        tracing::warn!("LLM unavailable - keyword extraction will use the rule-based fallback");
    }

    tracing::info!("Initializing weather provider: {}...", config.weather.provider);
    let weather = WeatherProvider::new(&config.weather);
    if !weather.is_available() {
        tracing::warn!("Weather unavailable - contextual ranking will skip weather signals");
    }

    let cancel_token = CancellationToken::new();
    let state = AppState::new(config.clone(), db, llm, weather, cancel_token.child_token());

    if args.recalculate_on_start {
        tracing::info!("Running initial similarity recalculation...");
        match state.scheduler.run_full_recalculation().await {
            Ok(outcome) => tracing::info!(?outcome, "Initial recalculation finished"),
            Err(e) => tracing::error!("Initial recalculation failed: {}", e),
        }
    }

    let scheduler_config = &state.config.scheduler;
    if scheduler_config.enabled && !args.no_scheduler {
        tracing::info!(
            "Starting similarity managers... (full={}s, top_k={}s, vectors={}s, cleanup={}s)",
            scheduler_config.full_recalc_interval_secs,
            scheduler_config.top_k_refresh_interval_secs,
            scheduler_config.vector_batch_interval_secs,
            scheduler_config.cleanup_interval_secs,
        );

        let full_recalc = FullRecalculationManager::new(
            state.scheduler.clone(),
            scheduler_config.full_recalc_interval_secs,
        );
        let token = cancel_token.child_token();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::info!("Full recalculation manager shutting down...");
                        break;
                    }
                    _ = tokio::time::sleep(tokio::time::Duration::from_secs(full_recalc.interval_secs())) => {
                        if let Err(e) = full_recalc.run_once().await {
                            tracing::error!("Full recalculation manager error: {}", e);
                        }
                    }
                }
            }
        });

        let top_k_refresh = TopKRefreshManager::new(
            state.scheduler.clone(),
            scheduler_config.top_k_refresh_interval_secs,
        );
        let token = cancel_token.child_token();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::info!("Top-K refresh manager shutting down...");
                        break;
                    }
                    _ = tokio::time::sleep(tokio::time::Duration::from_secs(top_k_refresh.interval_secs())) => {
                        if let Err(e) = top_k_refresh.run_once().await {
                            tracing::error!("Top-K refresh manager error: {}", e);
                        }
                    }
                }
            }
        });

        let vector_batch = VectorSimilarityBatchManager::new(
            state.vectors.clone(),
            state.config.vectors.batch_size,
            scheduler_config.vector_batch_interval_secs,
            cancel_token.child_token(),
        );
        let token = cancel_token.child_token();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::info!("Vector similarity batch manager shutting down...");
                        break;
                    }
                    _ = tokio::time::sleep(tokio::time::Duration::from_secs(vector_batch.interval_secs())) => {
                        if let Err(e) = vector_batch.run_once().await {
                            tracing::error!("Vector similarity batch manager error: {}", e);
                        }
                    }
                }
            }
        });

        let cleanup = SimilarityCleanupManager::new(
            state.vectors.clone(),
            state.config.vectors.cleanup_after_days,
            scheduler_config.cleanup_interval_secs,
        );
        let token = cancel_token.child_token();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::info!("Similarity cleanup manager shutting down...");
                        break;
                    }
                    _ = tokio::time::sleep(tokio::time::Duration::from_secs(cleanup.interval_secs())) => {
                        if let Err(e) = cleanup.run_once().await {
                            tracing::error!("Similarity cleanup manager error: {}", e);
                        }
                    }
                }
            }
        });
    } else {
        tracing::info!("Background managers disabled");
    }

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Mohe starting on http://{}", addr);
    tracing::info!("  Health check: http://{}/api/v1/health", addr);
    tracing::info!("  API docs:     http://{}/api/v1/docs", addr);
    tracing::info!("  OpenAPI spec: http://{}/api/v1/openapi.json", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token))
        .await?;

    Ok(())
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, cancelling background tasks...");
    cancel_token.cancel();
}
