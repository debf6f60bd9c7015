//! Server lifecycle — bind the configured address, serve the router,
//! shut down cleanly on Ctrl-C.

use std::net::SocketAddr;

use crate::api::router::api_router;
use crate::api::types::ApiContext;
use crate::config::APP_NAME;

/// Bind and serve until a shutdown signal arrives.
pub async fn run(ctx: ApiContext, bind_addr: SocketAddr) -> std::io::Result<()> {
    let app = api_router(ctx);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("{APP_NAME} listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("shutdown signal received");
    }
}
