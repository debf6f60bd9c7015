use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("CARDION_LOG")
                .unwrap_or_else(|_| EnvFilter::new(cardion::config::default_log_filter())),
        )
        .init();

    if let Err(err) = cardion::run().await {
        tracing::error!("startup failed: {err}");
        std::process::exit(1);
    }
}
