use std::sync::Arc;

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use eventmaster_server::config::Config;
use eventmaster_server::routes::create_routes;
use eventmaster_server::services::SystemClock;
use eventmaster_server::state::AppState;
use eventmaster_server::store::{JsonPaymentStore, PgStore};

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,eventmaster_server=debug,tower_http=info")),
        )
        .init();

    let config = Config::from_env();

    let store = PgStore::connect(&config.database_url, config.database_max_connections)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Successfully connected to database");

    store.migrate().await.expect("Failed to run migrations");

    tracing::info!("Migrations run successfully");

    let payment_store = Arc::new(JsonPaymentStore::new(&config.payment_store_path));
    tracing::info!(path = %payment_store.path().display(), "Using mock payment store");

    let state = AppState::new(
        Arc::new(store),
        payment_store,
        Arc::new(SystemClock),
        &config,
    );
    let app = create_routes(state, &config);

    tracing::info!("🚀 Server running at http://{}", config.bind_addr);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server failed");
}
