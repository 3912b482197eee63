use fileflow_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load .env when present; real deployments set env vars directly.
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    let (_state, router) = fileflow_api::setup::initialize_app(config.clone()).await?;

    fileflow_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
