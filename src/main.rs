use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use tennis_torch::answer_client::AnswerClient;
use tennis_torch::location::SharedLocation;
use tennis_torch::storage::FileStore;
use tennis_torch::{run_server, AppConfig, QuerySession};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = AppConfig::from_env();
    let store = FileStore::open(config.store_path())?;
    tracing::info!("query history stored in {}", store.path().display());

    let client = AnswerClient::new(config.api_base_url.clone(), config.request_timeout)?;
    let location = Arc::new(SharedLocation::parse(&config.public_url)?);
    let session = QuerySession::new(Arc::new(client), Arc::new(store), location.clone());

    run_server(config, session, location).await
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
