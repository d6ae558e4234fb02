use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;

use linkup_realtime::config::{generate_config_template, Config};
use linkup_realtime::{auth, realtime, routes, state};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load config with layered precedence: defaults < TOML < env < CLI
    let config = Config::load()?;

    // Handle --generate-config: print template and exit
    if config.generate_config {
        print!("{}", generate_config_template());
        return Ok(());
    }

    // Initialize tracing/logging
    if config.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "linkup_realtime=info".parse().unwrap()),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "linkup_realtime=info".parse().unwrap()),
            )
            .init();
    }

    tracing::info!(
        "Linkup realtime gateway v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    // Load or generate the JWT validation key shared with the auth service
    let jwt_secret = auth::jwt::load_or_generate_jwt_secret(&config.data_dir)?;

    // Build application state
    let app_state = state::AppState::new(jwt_secret, &config.realtime);

    // Spawn the stale-connection reaper
    realtime::reaper::spawn_reaper(
        app_state.clone(),
        Duration::from_secs(config.realtime.reaper_interval_secs),
    );

    // Build router
    let app = routes::build_router(app_state);

    // Bind and serve
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
