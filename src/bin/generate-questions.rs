use dotenv::dotenv;
use interview_quiz::config::ProxyConfig;
use interview_quiz::proxy::{create_router, ProxyState, GENERATE_QUESTIONS_PATH};

type MainResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[tokio::main]
async fn main() -> MainResult {
    // A missing .env is fine; the variables may come from the environment.
    dotenv().ok();
    pretty_env_logger::init();

    let config = ProxyConfig::from_env()?;
    let app = create_router(ProxyState::from_config(&config)?);

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    log::info!(
        "Question proxy listening on http://{}{}",
        listener.local_addr()?,
        GENERATE_QUESTIONS_PATH
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Stopping question proxy...");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
