use account_server::infrastructure::config::AppConfig;
use account_server::infrastructure::logging::init_logging;
use account_server::server::start_rest_server;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;

    let config = AppConfig::from_env()?;
    start_rest_server(config).await
}
