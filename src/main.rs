use dotenvy::dotenv;
use tracing::info;

use std::net::SocketAddr;
use tabkeep_api::infra::{
    app::create_app, deletion_sweeper::run_deletion_sweep_loop, error::InfraError,
    setup::init_app_state,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let app_state = init_app_state().await?;

    // Read settings from config before moving app_state
    let bind_addr = app_state.config.bind_addr;
    let sweep_every = app_state.config.deletion_sweep_interval_secs;

    let account_use_cases = app_state.account_use_cases.clone();

    // Sets up tracing, so background work is spawned after it
    let app = create_app(app_state);

    tokio::spawn(run_deletion_sweep_loop(account_use_cases, sweep_every));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(InfraError::TcpBind)?;

    info!("Backend listening at {}", &listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(InfraError::Server)?;

    Ok(())
}
