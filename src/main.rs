//! OpenSASE Network - shop, referral network and profit periods

use anyhow::Result;
use opensase_network::api;
use opensase_network::config::Config;
use opensase_network::events::EventPublisher;
use opensase_network::service::NetworkService;
use opensase_network::store::PgStore;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();

    let config = Config::from_env()?;
    let db = PgPoolOptions::new().max_connections(config.db_max_connections).connect(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&db).await?;
    let events = EventPublisher::connect(config.nats_url.as_deref(), &config.event_subject_prefix).await;

    let service = Arc::new(NetworkService::new(Arc::new(PgStore::new(db)), events));
    let app = api::router(service).layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive());

    let addr = config.listen_addr();
    tracing::info!("🚀 OpenSASE Network listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app).await?;
    Ok(())
}
