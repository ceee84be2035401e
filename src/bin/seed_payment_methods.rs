use agenda_admin::{
    client::{Resource, ResourceClient},
    config::Config,
    payment,
};
use tracing_subscriber::EnvFilter;

/// Creates the default payment methods when the upstream catalog is empty.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cfg = Config::from_env()?;
    let client = ResourceClient::new(&cfg.api_base_url, cfg.api_timeout)?;

    let existing = client.list(Resource::PaymentMethods).await?;
    if existing.as_array().is_some_and(|a| !a.is_empty()) {
        tracing::info!("payment methods already present, nothing to seed");
        return Ok(());
    }

    for method in payment::default_methods() {
        let name = method.name.clone();
        client
            .create(Resource::PaymentMethods, &serde_json::to_value(method)?)
            .await?;
        tracing::info!(%name, "payment method created");
    }
    Ok(())
}
