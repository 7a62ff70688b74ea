use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use solana_sdk::pubkey::Pubkey;

use crate::error::ConfigError;

pub const DEFAULT_TOKEN_MINT: &str = "4w6bnjMbj8G7Ga8SGYgEMYVRRbEiFV54Nt8DiF1Hpump";
pub const DEFAULT_RPC_URL: &str = "https://solana-mainnet.gateway.tatum.io";
pub const DEFAULT_PRICE_API_URL: &str = "https://api.dexscreener.com";

/// Where the top-holder list comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HolderSource {
    /// `getTokenLargestAccounts`, then one `getAccountInfo` per account for the owner.
    Largest,
    /// `getProgramAccounts` over the token program filtered by mint.
    ProgramAccounts,
}

impl FromStr for HolderSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "largest" => Ok(HolderSource::Largest),
            "program-accounts" | "program_accounts" => Ok(HolderSource::ProgramAccounts),
            other => Err(format!("expected `largest` or `program-accounts`, got `{}`", other)),
        }
    }
}

/// What to chart when the price API returns no intraday series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryFallback {
    /// 24 hourly points around the current price, flagged as synthetic.
    Synthetic,
    /// Leave the history empty.
    None,
}

impl FromStr for HistoryFallback {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "synthetic" => Ok(HistoryFallback::Synthetic),
            "none" => Ok(HistoryFallback::None),
            other => Err(format!("expected `synthetic` or `none`, got `{}`", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub token_mint: Pubkey,
    pub rpc_url: String,
    pub rpc_api_key: Option<String>,
    pub rpc_cors_proxy: Option<String>,
    pub rpc_timeout: Duration,
    pub rpc_rate_limit: u32,
    pub price_api_url: String,
    pub poll_interval: Duration,
    pub top_holders: usize,
    pub transfer_limit: usize,
    pub fetch_concurrency: usize,
    pub holder_source: HolderSource,
    pub history_fallback: HistoryFallback,
    pub listen_addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Ok(Config {
            token_mint: parse_or(&get, "TOKEN_MINT", DEFAULT_TOKEN_MINT)?,
            rpc_url: get("RPC_URL").unwrap_or_else(|| DEFAULT_RPC_URL.to_string()),
            rpc_api_key: get("RPC_API_KEY"),
            rpc_cors_proxy: get("RPC_CORS_PROXY"),
            rpc_timeout: Duration::from_secs(positive(&get, "RPC_TIMEOUT_SECS", 30)?),
            rpc_rate_limit: positive(&get, "RPC_RATE_LIMIT", 10)? as u32,
            price_api_url: get("PRICE_API_URL").unwrap_or_else(|| DEFAULT_PRICE_API_URL.to_string()),
            poll_interval: Duration::from_secs(positive(&get, "POLL_INTERVAL_SECS", 30)?),
            top_holders: positive(&get, "TOP_HOLDERS", 10)? as usize,
            transfer_limit: positive(&get, "TRANSFER_LIMIT", 10)? as usize,
            fetch_concurrency: positive(&get, "FETCH_CONCURRENCY", 5)? as usize,
            holder_source: parse_or(&get, "HOLDER_SOURCE", "largest")?,
            history_fallback: parse_or(&get, "HISTORY_FALLBACK", "synthetic")?,
            listen_addr: parse_or(&get, "LISTEN_ADDR", "0.0.0.0:8000")?,
        })
    }

    /// RPC endpoint with the CORS proxy prefix applied, if any.
    pub fn rpc_endpoint(&self) -> String {
        match &self.rpc_cors_proxy {
            Some(proxy) => format!("{}/{}", proxy.trim_end_matches('/'), self.rpc_url),
            None => self.rpc_url.clone(),
        }
    }
}

fn parse_or<T, G>(get: &G, name: &'static str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
    G: Fn(&str) -> Option<String>,
{
    let raw = get(name).unwrap_or_else(|| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::invalid(name, &raw, e))
}

fn positive<G>(get: &G, name: &'static str, default: u64) -> Result<u64, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let value: u64 = parse_or(get, name, &default.to_string())?;
    if value == 0 {
        return Err(ConfigError::invalid(name, "0", "must be greater than zero"));
    }
    if value > u32::MAX as u64 {
        return Err(ConfigError::invalid(name, &value.to_string(), "too large"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.token_mint.to_string(), DEFAULT_TOKEN_MINT);
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.top_holders, 10);
        assert_eq!(config.transfer_limit, 10);
        assert_eq!(config.holder_source, HolderSource::Largest);
        assert_eq!(config.history_fallback, HistoryFallback::Synthetic);
        assert!(config.rpc_api_key.is_none());
        assert_eq!(config.rpc_endpoint(), DEFAULT_RPC_URL);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_lookup(lookup(&[
            ("TOP_HOLDERS", "5"),
            ("POLL_INTERVAL_SECS", "10"),
            ("HOLDER_SOURCE", "program-accounts"),
            ("HISTORY_FALLBACK", "none"),
            ("RPC_API_KEY", "secret"),
            ("LISTEN_ADDR", "127.0.0.1:9000"),
        ]))
        .unwrap();
        assert_eq!(config.top_holders, 5);
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.holder_source, HolderSource::ProgramAccounts);
        assert_eq!(config.history_fallback, HistoryFallback::None);
        assert_eq!(config.rpc_api_key.as_deref(), Some("secret"));
        assert_eq!(config.listen_addr.port(), 9000);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = Config::from_lookup(lookup(&[("RPC_API_KEY", "  "), ("TOP_HOLDERS", "")])).unwrap();
        assert!(config.rpc_api_key.is_none());
        assert_eq!(config.top_holders, 10);
    }

    #[test]
    fn cors_proxy_prefixes_the_endpoint() {
        let config = Config::from_lookup(lookup(&[
            ("RPC_CORS_PROXY", "https://cors.bridged.cc/"),
            ("RPC_URL", "https://rpc.example.com/"),
        ]))
        .unwrap();
        assert_eq!(config.rpc_endpoint(), "https://cors.bridged.cc/https://rpc.example.com/");
    }

    #[test]
    fn rejects_bad_values() {
        assert!(Config::from_lookup(lookup(&[("TOKEN_MINT", "not-a-key")])).is_err());
        assert!(Config::from_lookup(lookup(&[("TOP_HOLDERS", "0")])).is_err());
        assert!(Config::from_lookup(lookup(&[("TRANSFER_LIMIT", "-3")])).is_err());
        assert!(Config::from_lookup(lookup(&[("HOLDER_SOURCE", "everyone")])).is_err());
        assert!(Config::from_lookup(lookup(&[("HISTORY_FALLBACK", "maybe")])).is_err());
    }
}
