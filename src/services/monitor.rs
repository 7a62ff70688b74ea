use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Duration, MissedTickBehavior};

use crate::services::aggregator::Aggregator;
use crate::types::models::DashboardSnapshot;

/// Runs the aggregator on a fixed period and republishes each finished cycle.
pub struct Monitor;

impl Monitor {
    /// Starts polling: one cycle right away, then one per `period`.
    pub fn start(aggregator: Arc<Aggregator>, period: Duration) -> MonitorHandle {
        let (snapshot_tx, snapshot_rx) = watch::channel(DashboardSnapshot::default());
        let (stop_tx, stop_rx) = watch::channel(false);

        let task = tokio::spawn(run(aggregator, period, snapshot_tx, stop_rx));

        MonitorHandle {
            snapshots: snapshot_rx,
            stop_tx,
            task,
        }
    }
}

pub struct MonitorHandle {
    snapshots: watch::Receiver<DashboardSnapshot>,
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    pub fn subscribe(&self) -> watch::Receiver<DashboardSnapshot> {
        self.snapshots.clone()
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Stops the timer and drops in-flight cycles. Nothing is published after this returns.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            tracing::error!("Monitor task ended abnormally: {:?}", e);
        }
    }
}

async fn run(
    aggregator: Arc<Aggregator>,
    period: Duration,
    snapshot_tx: watch::Sender<DashboardSnapshot>,
    mut stop_rx: watch::Receiver<bool>,
) {
    tracing::info!("Starting monitoring service, polling every {:?}", period);
    let snapshot_tx = Arc::new(snapshot_tx);
    let mut timer = tokio::time::interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut cycles = JoinSet::new();

    loop {
        tokio::select! {
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }

            _ = timer.tick() => {
                if !cycles.is_empty() {
                    tracing::warn!("{} poll cycle(s) still running, starting another", cycles.len());
                }
                let aggregator = aggregator.clone();
                let snapshot_tx = snapshot_tx.clone();
                let stop_rx = stop_rx.clone();
                cycles.spawn(async move {
                    tracing::info!("Starting poll cycle...");
                    let result = aggregator.poll().await;
                    if *stop_rx.borrow() {
                        tracing::debug!("Discarding poll result after stop");
                        return;
                    }
                    match result {
                        Ok(snapshot) => {
                            snapshot_tx.send_replace(snapshot);
                        }
                        Err(e) => {
                            tracing::error!("Poll cycle failed: {}", e);
                            let message = format!("Error fetching data: {}", e);
                            snapshot_tx.send_modify(|current| current.record_failure(message));
                        }
                    }
                });
            }

            Some(joined) = cycles.join_next(), if !cycles.is_empty() => {
                if let Err(e) = joined {
                    if !e.is_cancelled() {
                        tracing::error!("Poll cycle panicked: {:?}", e);
                    }
                }
            }
        }
    }

    cycles.shutdown().await;
    tracing::info!("Monitoring service stopped");
}
