use dotenvy::dotenv;
use log::{info, warn};
use tower_http::cors::CorsLayer;

use leadserver::api_router::configure_api_routes;
use leadserver::build_state;
use leadserver::config::AppConfig;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .write_style(env_logger::WriteStyle::Always)
        .init();

    let config = AppConfig::from_env();
    if config.demo_mode {
        info!("running in demo mode with fixture data");
    }
    if config.workflows.webhook_secret.is_none() {
        warn!("no workflow webhook secret configured; inbound webhooks are accepted from any caller");
    }

    let host = config.server.host.clone();
    let port = config.server.port;
    let state = build_state(config);

    let app = configure_api_routes()
        .layer(CorsLayer::permissive())
        .with_state(state);

    info!("Starting HTTP server on {host}:{port}");
    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    axum::serve(listener, app).await
}
