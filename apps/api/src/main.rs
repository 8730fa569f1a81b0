mod assistant;
mod bloggers;
mod config;
mod db;
mod errors;
mod fashion;
mod jobs;
mod models;
mod planning;
mod providers;
mod routes;
mod state;
mod store;
mod tasks;
#[cfg(test)]
mod test_support;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use axum::http::HeaderValue;
use std::net::SocketAddr;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::db::create_pool;
use crate::jobs::queue::RedisJobQueue;
use crate::jobs::worker::spawn_workers;
use crate::providers::elevenlabs::ElevenLabsClient;
use crate::providers::fal::FalClient;
use crate::providers::openai::OpenAiClient;
use crate::providers::storage::S3Storage;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Studio API v{}", env!("CARGO_PKG_VERSION"));

    // PostgreSQL
    let db = create_pool(&config.database_url).await?;
    let store = Arc::new(PgStore::new(db));

    // Redis job queue
    let redis = redis::Client::open(config.redis_url.clone())?;
    let queue = RedisJobQueue::new(redis);
    info!("Redis job queue initialized");

    // S3 / MinIO
    let s3 = build_s3_client(&config).await;
    let http = reqwest::Client::new();
    let storage = Arc::new(S3Storage::new(
        s3,
        http.clone(),
        config.s3_bucket.clone(),
        config.s3_public_base.clone(),
    ));
    info!("Object storage initialized (bucket: {})", config.s3_bucket);

    // Providers
    let text = OpenAiClient::new(
        http.clone(),
        config.openai_api_key.clone(),
        config.openai_model.clone(),
    );
    info!("Text generation model: {}", text.model());
    let fal = Arc::new(FalClient::new(http.clone(), config.fal_api_key.clone()));
    let voices = ElevenLabsClient::new(http, config.elevenlabs_api_key.clone(), storage.clone());
    log_missing_credentials(&config);

    let state = AppState {
        store,
        jobs: Arc::new(queue.clone()),
        text: Arc::new(text),
        images: fal.clone(),
        videos: fal,
        voices: Arc::new(voices),
        storage: storage.clone(),
        mirror: storage,
    };

    queue.requeue_unacknowledged().await?;
    spawn_workers(state.clone(), queue, config.worker_concurrency);

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.allowed_origins));

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Permissive when no origins are configured.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

fn log_missing_credentials(config: &Config) {
    let keys = [
        ("OPENAI_API_KEY", config.openai_api_key.is_none()),
        ("FAL_API_KEY", config.fal_api_key.is_none()),
        ("ELEVENLABS_API_KEY", config.elevenlabs_api_key.is_none()),
    ];
    for (key, missing) in keys {
        if missing {
            tracing::warn!("{key} is not set; dependent features are degraded");
        }
    }
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "studio-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(config.aws_region.clone()))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
