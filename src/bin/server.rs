use log::{error, info, warn};
use std::net::SocketAddr;

use rusty_relay::config::ServerConfig;
use rusty_relay::core::Relay;
use rusty_relay::handlers::routes;

#[tokio::main]
async fn main() {
    // Initialize env
    let dotenv_result = dotenvy::dotenv();

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match dotenv_result {
        Ok(path) => info!("Environment variables loaded from {}", path.display()),
        Err(e) => warn!("No .env file loaded: {}", e),
    }

    // Load config from env
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Configuration: host={}, port={}, ws_path=/{}, max_room_size={}, rate_limit={} per {:?}",
        config.host,
        config.port,
        config.ws_path,
        config.limits.max_room_size,
        config.limits.rate_limit_max_events,
        config.limits.rate_limit_window
    );

    let relay = Relay::shared(config.limits.clone());
    relay.start_cleanup_task(config.cleanup_interval);

    let routes = routes(relay, &config.ws_path);

    // Build the server address
    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Failed to parse server address: {}", e);
            std::process::exit(1);
        }
    };

    match (config.enable_tls, config.tls_cert_path, config.tls_key_path) {
        (true, Some(cert_path), Some(key_path)) => {
            info!("Starting Rusty Relay server on wss://{}", addr);
            warp::serve(routes)
                .tls()
                .cert_path(cert_path)
                .key_path(key_path)
                .run(addr)
                .await;
        }
        _ => {
            info!("Starting Rusty Relay server on ws://{}", addr);
            warp::serve(routes).run(addr).await;
        }
    }
}
