use crate::{
    adapters::http::app_state::AppState,
    infra::{
        config::AppConfig, db::run_migrations, postgres_persistence,
        stripe_client::StripeClient,
    },
    ports::billing_provider::BillingProvider,
    use_cases::{account::AccountRepo, billing_webhook::WebhookEventRepo, devices::DeviceRepo},
};
use std::fs::File;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env();

    let postgres_arc = Arc::new(postgres_persistence(&config.database_url).await?);
    run_migrations(postgres_arc.pool()).await?;

    let http_client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(15))
        .build()?;
    let stripe = Arc::new(StripeClient::new(
        http_client,
        config.stripe_secret_key.clone(),
    ));

    Ok(AppState::from_parts(
        config,
        postgres_arc.clone() as Arc<dyn AccountRepo>,
        postgres_arc.clone() as Arc<dyn DeviceRepo>,
        postgres_arc as Arc<dyn WebhookEventRepo>,
        stripe as Arc<dyn BillingProvider>,
    ))
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tabkeep_api=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer().with_target(false).with_level(true).pretty();

    // File (structured JSON logs); skipped when the working directory is read-only
    let json_layer = File::create("app.log").ok().map(|file| {
        fmt::layer()
            .json()
            .with_writer(file)
            .with_current_span(true)
            .with_span_list(true)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
