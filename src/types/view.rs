use serde::Serialize;

use crate::services::format::{
    format_datetime, format_market_cap, format_number, format_price, short_address,
};
use crate::types::models::DashboardSnapshot;

/// Display-ready rendering of a snapshot: every number already formatted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub token_mint: String,
    pub supply: String,
    pub price: String,
    /// Price in satoshi-style 1e-8 units, only when there is a price.
    pub price_sats: Option<String>,
    pub market_cap: String,
    pub low_24h: Option<String>,
    pub high_24h: Option<String>,
    pub history_synthetic: bool,
    pub holders: Vec<HolderRow>,
    pub transfers: Vec<TransferRow>,
    pub error: Option<String>,
    pub last_updated: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HolderRow {
    pub rank: usize,
    pub address: String,
    pub short_address: String,
    pub owner: String,
    pub balance: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRow {
    pub signature: String,
    pub from: String,
    pub to: String,
    pub amount: String,
    pub time: String,
}

impl DashboardView {
    pub fn from_snapshot(token_mint: &str, snapshot: &DashboardSnapshot) -> Self {
        let prices = || snapshot.price_history.iter().map(|p| p.price);
        let low = prices().reduce(f64::min);
        let high = prices().reduce(f64::max);

        Self {
            token_mint: token_mint.to_string(),
            supply: format_number(snapshot.supply),
            price: format!("${}", format_price(snapshot.price)),
            price_sats: (snapshot.price > 0.0)
                .then(|| format!("{} sats", format_price(snapshot.price * 1e8))),
            market_cap: format_market_cap(snapshot.market_cap),
            low_24h: low.map(|p| format!("${}", format_price(p))),
            high_24h: high.map(|p| format!("${}", format_price(p))),
            history_synthetic: snapshot.history_synthetic,
            holders: snapshot
                .holders
                .iter()
                .enumerate()
                .map(|(i, h)| HolderRow {
                    rank: i + 1,
                    address: h.address.clone(),
                    short_address: short_address(&h.address),
                    owner: h.owner.clone(),
                    balance: format_number(h.balance),
                })
                .collect(),
            transfers: snapshot
                .transfers
                .iter()
                .map(|t| TransferRow {
                    signature: t.signature.clone(),
                    from: short_address(&t.from),
                    to: short_address(&t.to),
                    amount: format_number(t.amount),
                    time: format_datetime(t.timestamp),
                })
                .collect(),
            error: snapshot.error.clone(),
            last_updated: format_datetime(snapshot.last_updated / 1000),
        }
    }
}
