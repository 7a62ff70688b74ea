//! DexScreener `/latest/dex/tokens` response shapes.
//!
//! Price history is read leniently: a malformed window or sample is dropped
//! instead of failing the whole response.

use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct DexTokensResponse {
    #[serde(default)]
    pub pairs: Option<Vec<DexPair>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DexPair {
    #[serde(default)]
    pub price_usd: Option<Value>,
    #[serde(default)]
    pub fdv: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub price_history: Option<PriceHistoryWindows>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PriceHistoryWindows {
    #[serde(default, deserialize_with = "lenient_samples")]
    pub h1: Option<Vec<HistorySample>>,
    #[serde(default, deserialize_with = "lenient_samples")]
    pub h6: Option<Vec<HistorySample>>,
    #[serde(default, deserialize_with = "lenient_samples")]
    pub h24: Option<Vec<HistorySample>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistorySample {
    #[serde(default)]
    pub timestamp: Value,
    #[serde(default)]
    pub value: Value,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

fn lenient_samples<'de, D>(deserializer: D) -> Result<Option<Vec<HistorySample>>, D::Error>
where
    D: Deserializer<'de>,
{
    let samples = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => return Ok(None),
    };
    Ok(Some(samples))
}

/// Reads a number that upstream may send as a JSON number or a numeric string.
pub fn lenient_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}
