use calladmin_backend::broadcaster::AdminRequestBroadcaster;
use calladmin_backend::config::Config;
use calladmin_backend::{AppState, create_app};
use std::net::SocketAddr;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for structured logging
    #[cfg(debug_assertions)]
    let log_level = tracing::Level::DEBUG;
    #[cfg(not(debug_assertions))]
    let log_level = tracing::Level::INFO;

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();
    tracing::info!("Starting calladmin backend...");

    let config = Config::from_env();
    tracing::info!(
        "Configuration: port={}, query={}:{}, server_id={}, hostname={:?}, cooldown={}s, admin_level={}, auth={}",
        config.port,
        config.query_ip,
        config.query_port,
        config.server_id,
        config.hostname,
        config.cooldown_threshold_secs,
        config.admin_level,
        config.api_key.is_some()
    );

    let broadcaster = match AdminRequestBroadcaster::from_config(&config) {
        Ok(broadcaster) => match broadcaster.probe().await {
            Ok(()) => {
                tracing::info!("Query interface reachable, admin requests enabled");
                Some(broadcaster)
            }
            Err(e) => {
                tracing::error!("Could not establish query connection: {}", e);
                tracing::warn!("Admin requests disabled");
                None
            }
        },
        Err(e) => {
            tracing::warn!("{}", e);
            tracing::warn!("Admin requests disabled");
            None
        }
    };

    let state = AppState::new(broadcaster, config.admin_level, config.api_key.as_deref());
    let app = create_app(
        state,
        config.request_body_limit,
        config.request_timeout,
        config.rate_limit(),
    );

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
