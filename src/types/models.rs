use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    /// Epoch milliseconds.
    pub time: i64,
    pub price: f64,
    pub formatted_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holder {
    /// Token account address.
    pub address: String,
    pub balance: f64,
    /// Wallet owning the token account.
    pub owner: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub signature: String,
    /// Epoch seconds, 0 when the node did not report a block time.
    pub timestamp: i64,
    pub amount: f64,
    pub from: String,
    pub to: String,
}

/// Everything the dashboard shows, produced once per poll cycle and replaced whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub supply: f64,
    pub price: f64,
    pub market_cap: f64,
    pub price_history: Vec<PricePoint>,
    pub history_synthetic: bool,
    pub holders: Vec<Holder>,
    pub transfers: Vec<Transfer>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub last_updated: i64,
}

impl Default for DashboardSnapshot {
    fn default() -> Self {
        Self {
            supply: 0.0,
            price: 0.0,
            market_cap: 0.0,
            price_history: Vec::new(),
            history_synthetic: false,
            holders: Vec::new(),
            transfers: Vec::new(),
            is_loading: true,
            error: None,
            last_updated: 0,
        }
    }
}

impl DashboardSnapshot {
    /// Marks a failed cycle: data fields stay as they were.
    pub fn record_failure(&mut self, message: String) {
        self.is_loading = false;
        self.error = Some(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_snapshot_is_loading() {
        let snapshot = DashboardSnapshot::default();
        assert!(snapshot.is_loading);
        assert!(snapshot.error.is_none());
        assert!(snapshot.holders.is_empty());
    }

    #[test]
    fn failure_keeps_data_fields() {
        let mut snapshot = DashboardSnapshot {
            price: 1.5,
            is_loading: false,
            holders: vec![Holder {
                address: "acct".into(),
                balance: 10.0,
                owner: "owner".into(),
            }],
            last_updated: 42,
            ..Default::default()
        };
        let before = snapshot.clone();
        snapshot.record_failure("Error fetching data: boom".into());

        assert_eq!(snapshot.price, before.price);
        assert_eq!(snapshot.holders, before.holders);
        assert_eq!(snapshot.last_updated, 42);
        assert_eq!(snapshot.error.as_deref(), Some("Error fetching data: boom"));
        assert!(!snapshot.is_loading);
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let json = serde_json::to_value(DashboardSnapshot::default()).unwrap();
        assert!(json.get("marketCap").is_some());
        assert!(json.get("priceHistory").is_some());
        assert!(json.get("isLoading").is_some());
        assert!(json.get("lastUpdated").is_some());
    }
}
