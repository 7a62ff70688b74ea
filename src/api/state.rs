use tokio::sync::watch;

use crate::types::models::DashboardSnapshot;

#[derive(Clone)]
pub struct AppState {
    pub token_mint: String,
    pub snapshots: watch::Receiver<DashboardSnapshot>,
}

impl AppState {
    pub fn new(token_mint: String, snapshots: watch::Receiver<DashboardSnapshot>) -> Self {
        Self { token_mint, snapshots }
    }

    pub fn current(&self) -> DashboardSnapshot {
        self.snapshots.borrow().clone()
    }
}
