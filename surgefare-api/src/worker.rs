use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info};
use surgefare_catalog::LedgerRetention;
use surgefare_order::HoldSweeper;

/// Periodically purge booking attempts past the retention horizon.
pub fn spawn_ledger_retention(retention: Arc<LedgerRetention>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Ledger retention worker started, every {:?}", every);
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = retention.purge(Utc::now()).await {
                error!("Attempt purge failed: {}", e);
            }
        }
    })
}

/// Periodically release booking holds that never reached confirmation.
pub fn spawn_hold_sweeper(sweeper: Arc<HoldSweeper>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Hold sweeper started, every {:?}", every);
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = sweeper.sweep(Utc::now()).await {
                error!("Hold sweep failed: {}", e);
            }
        }
    })
}
