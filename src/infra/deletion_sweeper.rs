use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tracing::{error, info};

use crate::use_cases::account::AccountUseCases;

/// Periodically removes accounts whose deletion grace period has elapsed.
/// Devices go with them through the foreign key cascade.
pub async fn run_deletion_sweep_loop(account_use_cases: Arc<AccountUseCases>, every_secs: u64) {
    let mut ticker = interval(Duration::from_secs(every_secs.max(1)));

    info!("Account deletion sweeper started (every {}s)", every_secs);

    loop {
        ticker.tick().await;

        match account_use_cases.purge_due_accounts().await {
            Ok(0) => {}
            Ok(purged) => info!(purged, "Purged accounts past their deletion grace period"),
            Err(e) => error!(error = ?e, "Account deletion sweep failed"),
        }
    }
}
