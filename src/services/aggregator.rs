use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};
use rand::Rng;
use solana_client::rpc_response::{RpcConfirmedTransactionStatusWithSignature, RpcTokenAccountBalance};
use solana_sdk::pubkey::Pubkey;
use solana_transaction_status::{option_serializer::OptionSerializer, UiTransactionTokenBalance};

use crate::config::{Config, HistoryFallback, HolderSource};
use crate::error::UpstreamError;
use crate::services::chain::{ui_amount, ChainClient, MintInfo, TokenHolding, TransactionBalances};
use crate::services::format::format_time;
use crate::services::price::PriceSource;
use crate::types::dex::{lenient_f64, DexPair, PriceHistoryWindows};
use crate::types::models::{DashboardSnapshot, Holder, PricePoint, Transfer};

const DEFAULT_DECIMALS: u8 = 9;
const SYNTHETIC_POINTS: i64 = 24;
const HOUR_MS: i64 = 3_600_000;
const SYNTHETIC_SPREAD: f64 = 0.05;
const UNKNOWN_PARTY: &str = "unknown";

/// Wall-clock source, swappable in tests.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

#[derive(Debug, Clone)]
pub struct AggregatorSettings {
    pub mint: Pubkey,
    pub top_holders: usize,
    pub transfer_limit: usize,
    pub fetch_concurrency: usize,
    pub holder_source: HolderSource,
    pub history_fallback: HistoryFallback,
}

impl AggregatorSettings {
    pub fn new(mint: Pubkey) -> Self {
        Self {
            mint,
            top_holders: 10,
            transfer_limit: 10,
            fetch_concurrency: 5,
            holder_source: HolderSource::Largest,
            history_fallback: HistoryFallback::Synthetic,
        }
    }
}

impl From<&Config> for AggregatorSettings {
    fn from(config: &Config) -> Self {
        Self {
            mint: config.token_mint,
            top_holders: config.top_holders,
            transfer_limit: config.transfer_limit,
            fetch_concurrency: config.fetch_concurrency,
            holder_source: config.holder_source,
            history_fallback: config.history_fallback,
        }
    }
}

/// One fetch-normalize pass over the chain and the price API.
pub struct Aggregator {
    chain: Arc<dyn ChainClient>,
    prices: Arc<dyn PriceSource>,
    clock: Arc<dyn Clock>,
    settings: AggregatorSettings,
}

impl Aggregator {
    pub fn new(chain: Arc<dyn ChainClient>, prices: Arc<dyn PriceSource>, settings: AggregatorSettings) -> Self {
        Self {
            chain,
            prices,
            clock: Arc::new(SystemClock),
            settings,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &AggregatorSettings {
        &self.settings
    }

    pub async fn poll(&self) -> Result<DashboardSnapshot, UpstreamError> {
        let started = std::time::Instant::now();
        let mint = self.settings.mint;

        let mint_info = self.fetch_mint(&mint).await?;
        let supply = scale_supply(mint_info);
        let decimals = mint_info.decimals.unwrap_or(DEFAULT_DECIMALS);

        let pair = self.prices.first_pair(&mint).await?;
        let (price, market_cap) = price_and_market_cap(pair.as_ref());
        let (price_history, history_synthetic) = self.price_history(pair.as_ref(), price);

        let (holders, transfers) = tokio::try_join!(self.fetch_holders(&mint, decimals), self.fetch_transfers(&mint))?;

        tracing::info!(
            "Cycle for {} took {:?}: price ${}, {} history points{}, {} holders, {} transfers",
            mint,
            started.elapsed(),
            price,
            price_history.len(),
            if history_synthetic { " (synthetic)" } else { "" },
            holders.len(),
            transfers.len()
        );

        Ok(DashboardSnapshot {
            supply,
            price,
            market_cap,
            price_history,
            history_synthetic,
            holders,
            transfers,
            is_loading: false,
            error: None,
            last_updated: self.clock.now_ms(),
        })
    }

    async fn fetch_mint(&self, mint: &Pubkey) -> Result<MintInfo, UpstreamError> {
        match self.chain.mint_info(mint).await? {
            Some(info) => Ok(info),
            None => {
                tracing::warn!("Mint {} did not unpack as an SPL mint, falling back to getTokenSupply", mint);
                self.chain.token_supply(mint).await
            }
        }
    }

    fn price_history(&self, pair: Option<&DexPair>, price: f64) -> (Vec<PricePoint>, bool) {
        let observed = pair
            .and_then(|p| p.price_history.as_ref())
            .map(normalize_history)
            .unwrap_or_default();
        if !observed.is_empty() {
            return (observed, false);
        }

        match self.settings.history_fallback {
            HistoryFallback::Synthetic => {
                tracing::warn!("No price history from the price API, synthesizing 24 hourly points");
                let points = synthesize_history(price, self.clock.now_ms(), &mut rand::thread_rng());
                (points, true)
            }
            HistoryFallback::None => (Vec::new(), false),
        }
    }

    async fn fetch_holders(&self, mint: &Pubkey, decimals: u8) -> Result<Vec<Holder>, UpstreamError> {
        let top_n = self.settings.top_holders;
        let holders = match self.settings.holder_source {
            HolderSource::Largest => {
                // Every listed account is resolved: one may have drained since the node ranked it.
                let candidates = nonzero_accounts(self.chain.largest_accounts(mint).await?);
                let chain = &self.chain;

                stream::iter(candidates)
                    .map(|listed| async move {
                        let resolved = chain.token_account(&listed.address).await?;
                        Ok::<_, UpstreamError>(resolve_holder(listed, resolved))
                    })
                    .buffered(self.settings.fetch_concurrency.max(1))
                    .try_collect::<Vec<_>>()
                    .await?
            }
            HolderSource::ProgramAccounts => {
                let accounts = self.chain.token_accounts_by_mint(mint).await?;
                tracing::info!("Found {} token accounts for {}", accounts.len(), mint);
                accounts
                    .into_iter()
                    .map(|holding| Holder {
                        balance: scale_amount(holding.amount, decimals),
                        address: holding.address,
                        owner: holding.owner,
                    })
                    .collect()
            }
        };

        Ok(rank_holders(holders, top_n))
    }

    async fn fetch_transfers(&self, mint: &Pubkey) -> Result<Vec<Transfer>, UpstreamError> {
        let limit = self.settings.transfer_limit;
        let signatures = self.chain.signatures_for_address(mint, limit).await?;
        let chain = &self.chain;

        stream::iter(signatures.into_iter().take(limit))
            .map(|signature| async move {
                let tx = chain.transaction(&signature.signature).await?;
                Ok::<_, UpstreamError>(build_transfer(signature, tx.as_ref()))
            })
            .buffered(self.settings.fetch_concurrency.max(1))
            .try_collect()
            .await
    }
}

pub fn scale_supply(info: MintInfo) -> f64 {
    scale_amount(info.supply, info.decimals.unwrap_or(DEFAULT_DECIMALS))
}

pub fn scale_amount(raw: u64, decimals: u8) -> f64 {
    raw as f64 / 10f64.powi(decimals as i32)
}

/// USD price and FDV of a pair, each 0 when missing, unparsable or negative.
pub fn price_and_market_cap(pair: Option<&DexPair>) -> (f64, f64) {
    let read = |value: Option<&serde_json::Value>| {
        value
            .and_then(lenient_f64)
            .filter(|v| *v >= 0.0)
            .unwrap_or(0.0)
    };
    match pair {
        Some(pair) => (read(pair.price_usd.as_ref()), read(pair.fdv.as_ref())),
        None => (0.0, 0.0),
    }
}

/// The widest non-empty window (24h, then 6h, then 1h), ascending by time
/// with duplicate timestamps removed.
pub fn normalize_history(windows: &PriceHistoryWindows) -> Vec<PricePoint> {
    let series = [&windows.h24, &windows.h6, &windows.h1]
        .into_iter()
        .flatten()
        .find(|series| !series.is_empty());
    let Some(series) = series else {
        return Vec::new();
    };

    let mut points: Vec<PricePoint> = series
        .iter()
        .filter_map(|sample| {
            let time = lenient_f64(&sample.timestamp)? as i64;
            let price = lenient_f64(&sample.value)?;
            Some(PricePoint {
                time,
                price,
                formatted_time: format_time(time),
            })
        })
        .collect();

    points.sort_by_key(|p| p.time);
    points.dedup_by_key(|p| p.time);
    points
}

/// 24 hourly points ending at `now_ms`, each within ±5% of `price`.
/// Not market data; only keeps the chart from being empty.
pub fn synthesize_history<R: Rng>(price: f64, now_ms: i64, rng: &mut R) -> Vec<PricePoint> {
    (0..SYNTHETIC_POINTS)
        .map(|i| {
            let time = now_ms - (SYNTHETIC_POINTS - 1 - i) * HOUR_MS;
            let jitter = rng.gen_range(-SYNTHETIC_SPREAD..=SYNTHETIC_SPREAD);
            PricePoint {
                time,
                price: price * (1.0 + jitter),
                formatted_time: format_time(time),
            }
        })
        .collect()
}

fn nonzero_accounts(mut accounts: Vec<RpcTokenAccountBalance>) -> Vec<RpcTokenAccountBalance> {
    accounts.retain(|a| ui_amount(&a.amount) > 0.0);
    accounts
}

/// Current owner and balance of a listed account; a closed account keeps its
/// listed balance with an unknown owner.
fn resolve_holder(listed: RpcTokenAccountBalance, resolved: Option<TokenHolding>) -> Holder {
    match resolved {
        Some(holding) => Holder {
            balance: scale_amount(holding.amount, listed.amount.decimals),
            address: listed.address,
            owner: holding.owner,
        },
        None => Holder {
            balance: ui_amount(&listed.amount),
            address: listed.address,
            owner: UNKNOWN_PARTY.to_string(),
        },
    }
}

pub fn rank_holders(mut holders: Vec<Holder>, top_n: usize) -> Vec<Holder> {
    holders.retain(|h| h.balance.is_finite() && h.balance > 0.0);
    holders.sort_by(|a, b| b.balance.total_cmp(&a.balance));
    holders.truncate(top_n);
    holders
}

/// Absolute change between the first pre- and post-transaction token
/// balances; 0 unless both are present.
pub fn transfer_amount(pre: Option<f64>, post: Option<f64>) -> f64 {
    match (pre, post) {
        (Some(pre), Some(post)) => (post - pre).abs(),
        _ => 0.0,
    }
}

pub fn build_transfer(
    signature: RpcConfirmedTransactionStatusWithSignature,
    tx: Option<&TransactionBalances>,
) -> Transfer {
    let pre = tx.and_then(|tx| tx.pre.first());
    let post = tx.and_then(|tx| tx.post.first());

    let owner_or_unknown = |balance: Option<&UiTransactionTokenBalance>| match balance.map(|b| &b.owner) {
        Some(OptionSerializer::Some(owner)) if !owner.is_empty() => owner.clone(),
        _ => UNKNOWN_PARTY.to_string(),
    };

    Transfer {
        timestamp: signature
            .block_time
            .or_else(|| tx.and_then(|t| t.block_time))
            .unwrap_or(0),
        signature: signature.signature,
        amount: transfer_amount(
            pre.map(|b| ui_amount(&b.ui_token_amount)),
            post.map(|b| ui_amount(&b.ui_token_amount)),
        ),
        from: owner_or_unknown(pre),
        to: owner_or_unknown(post),
    }
}
