use std::env;
use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use media_file_server::{
    ContentService, ServiceConfig,
    web::{self, AppState},
};

const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let port = env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(3000);
    let bind_address = format!("0.0.0.0:{}", port);
    let max_upload_bytes = env::var("MAX_UPLOAD_BYTES")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

    let secret_key = env::var("SECRET_KEY").ok().filter(|value| !value.trim().is_empty());
    let prefix = match secret_key.as_deref() {
        Some(value) => format!("/{}", value.trim()),
        None => String::new(),
    };

    let config = ServiceConfig::from_env()?;
    tracing::info!(
        content_dir = %config.content_dir.display(),
        previews_enabled = config.previews_enabled,
        preview_max_edge = config.preview_max_edge,
        "content service configured"
    );

    let shutdown = CancellationToken::new();
    let state = AppState {
        service: Arc::new(ContentService::new(&config)),
        shutdown: shutdown.clone(),
    };
    let router = web::router(state, &prefix, max_upload_bytes).layer(TraceLayer::new_for_http());
    let tcp_listener = tokio::net::TcpListener::bind(&bind_address).await?;

    tracing::info!("media file server listening at http://{}{}/file", bind_address, prefix);

    axum::serve(tcp_listener, router)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            shutdown.cancel();
        })
        .await?;
    Ok(())
}
