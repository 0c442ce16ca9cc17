use brandmark_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize the application (settings store, storage, routes)
    let (_state, router) = brandmark_api::setup::initialize_app(config.clone()).await?;

    // Start the server
    brandmark_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
