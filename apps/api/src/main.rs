use std::net::SocketAddr;

use dotenv::dotenv;
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clinic_api::router::create_router;
use clinic_api::state::AppServices;
use shared_config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting clinic scheduling API");

    let config = AppConfig::from_env();
    let port = config.server_port;
    let services = AppServices::build(config).await?;

    if services.notifications.is_enabled() {
        let mut receiver = services.notifications.subscribe();
        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(notification) => info!(
                        appointment_id = %notification.appointment_id,
                        recipients = notification.recipients.len(),
                        "{}: {}",
                        notification.subject,
                        notification.body
                    ),
                    Err(RecvError::Lagged(skipped)) => warn!("Notification log lagged, skipped {}", skipped),
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(&services)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
