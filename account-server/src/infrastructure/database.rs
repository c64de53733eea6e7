use mongodb::options::ClientOptions;
use mongodb::{Client, Database, bson::doc};
use tracing::info;

use crate::infrastructure::config::AppConfig;

pub async fn connect(config: &AppConfig) -> Result<Database, mongodb::error::Error> {
    let mut options = ClientOptions::parse(&config.mongodb_uri).await?;
    options.app_name = Some("account-server".to_string());
    options.max_pool_size = Some(config.mongodb_max_pool_size);
    options.min_pool_size = Some(config.mongodb_min_pool_size);
    options.connect_timeout = Some(config.mongodb_timeout);
    options.server_selection_timeout = Some(config.mongodb_timeout);

    let client = Client::with_options(options)?;
    let database = client.database(&config.mongodb_database);
    database.run_command(doc! { "ping": 1 }).await?;
    info!(database = %config.mongodb_database, "connected to MongoDB");
    Ok(database)
}
