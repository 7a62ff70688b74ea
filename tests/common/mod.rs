#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use solana_sdk::pubkey::Pubkey;

use memeboard::config::{HistoryFallback, HolderSource};
use memeboard::error::UpstreamError;
use memeboard::services::aggregator::{Aggregator, AggregatorSettings, Clock};
use solana_client::rpc_response::{RpcConfirmedTransactionStatusWithSignature, RpcTokenAccountBalance};
use solana_transaction_status::UiTransactionTokenBalance;

use memeboard::services::chain::{ChainClient, MintInfo, TokenHolding, TransactionBalances};
use memeboard::services::price::PriceSource;
use memeboard::types::dex::DexPair;

pub const MINT: &str = "4w6bnjMbj8G7Ga8SGYgEMYVRRbEiFV54Nt8DiF1Hpump";
pub const NOW_MS: i64 = 1_700_000_000_000;

pub fn mint() -> Pubkey {
    Pubkey::from_str(MINT).unwrap()
}

pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_ms(&self) -> i64 {
        self.0
    }
}

pub fn largest_account(address: &str, ui_amount: f64) -> RpcTokenAccountBalance {
    serde_json::from_value(json!({
        "address": address,
        "amount": format!("{}", (ui_amount * 1e6) as u64),
        "decimals": 6,
        "uiAmount": ui_amount,
        "uiAmountString": ui_amount.to_string()
    }))
    .unwrap()
}

/// Token account holding `ui_amount` of a 6-decimal mint.
pub fn holding(address: &str, ui_amount: f64, owner: &str) -> TokenHolding {
    TokenHolding {
        address: address.to_string(),
        owner: owner.to_string(),
        amount: (ui_amount * 1e6) as u64,
    }
}

pub fn signature(sig: &str, block_time: i64) -> RpcConfirmedTransactionStatusWithSignature {
    RpcConfirmedTransactionStatusWithSignature {
        signature: sig.to_string(),
        slot: 1,
        err: None,
        memo: None,
        block_time: Some(block_time),
        confirmation_status: None,
    }
}

fn token_balance(index: u8, owner: &str, ui_amount: f64) -> UiTransactionTokenBalance {
    serde_json::from_value(json!({
        "accountIndex": index, "mint": MINT, "owner": owner,
        "uiTokenAmount": {"amount": "0", "decimals": 6, "uiAmount": ui_amount, "uiAmountString": ui_amount.to_string()}
    }))
    .unwrap()
}

pub fn transaction(from: &str, pre: f64, to: &str, post: f64) -> TransactionBalances {
    TransactionBalances {
        block_time: Some(1),
        pre: vec![token_balance(1, from, pre)],
        post: vec![token_balance(2, to, post)],
    }
}

pub fn pair(price_usd: &str, fdv: f64) -> DexPair {
    serde_json::from_value(json!({"priceUsd": price_usd, "fdv": fdv})).unwrap()
}

/// In-memory chain with a switch to make every mint lookup fail.
pub struct FakeChain {
    pub mint: MintInfo,
    pub largest: Vec<RpcTokenAccountBalance>,
    pub accounts: HashMap<String, TokenHolding>,
    pub program_accounts: Vec<TokenHolding>,
    pub signatures: Vec<RpcConfirmedTransactionStatusWithSignature>,
    pub transactions: HashMap<String, TransactionBalances>,
    pub failing: AtomicBool,
    pub fail_transactions: AtomicBool,
    pub mint_calls: AtomicUsize,
    pub account_calls: AtomicUsize,
}

impl FakeChain {
    pub fn healthy() -> Self {
        let largest = vec![
            largest_account("acct-a", 500.0),
            largest_account("acct-b", 300.0),
            largest_account("acct-c", 0.0),
            largest_account("acct-d", 100.0),
        ];
        let accounts = [
            holding("acct-a", 500.0, "owner-a"),
            holding("acct-b", 300.0, "owner-b"),
            holding("acct-d", 100.0, "owner-d"),
        ]
        .into_iter()
        .map(|h| (h.address.clone(), h))
        .collect();

        let signatures = vec![signature("sig-3", 300), signature("sig-2", 200), signature("sig-1", 100)];
        let transactions = [
            ("sig-3".to_string(), transaction("alice", 100.0, "bob", 80.0)),
            ("sig-2".to_string(), transaction("carol", 5.0, "dave", 15.0)),
        ]
        .into_iter()
        .collect();

        Self {
            mint: MintInfo {
                supply: 1_000_000_000_000_000,
                decimals: Some(6),
            },
            largest,
            accounts,
            program_accounts: vec![
                holding("p1", 1.0, "o1"),
                holding("p2", 0.0, "o2"),
                holding("p3", 9.0, "o3"),
            ],
            signatures,
            transactions,
            failing: AtomicBool::new(false),
            fail_transactions: AtomicBool::new(false),
            mint_calls: AtomicUsize::new(0),
            account_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_failing_transactions(&self, failing: bool) {
        self.fail_transactions.store(failing, Ordering::SeqCst);
    }

    pub fn mint_calls(&self) -> usize {
        self.mint_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainClient for FakeChain {
    async fn mint_info(&self, _mint: &Pubkey) -> Result<Option<MintInfo>, UpstreamError> {
        self.mint_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(UpstreamError::Protocol("node unavailable".into()));
        }
        Ok(Some(self.mint))
    }

    async fn token_supply(&self, _mint: &Pubkey) -> Result<MintInfo, UpstreamError> {
        Ok(self.mint)
    }

    async fn largest_accounts(&self, _mint: &Pubkey) -> Result<Vec<RpcTokenAccountBalance>, UpstreamError> {
        Ok(self.largest.clone())
    }

    async fn token_account(&self, address: &str) -> Result<Option<TokenHolding>, UpstreamError> {
        self.account_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.accounts.get(address).cloned())
    }

    async fn token_accounts_by_mint(&self, _mint: &Pubkey) -> Result<Vec<TokenHolding>, UpstreamError> {
        Ok(self.program_accounts.clone())
    }

    async fn signatures_for_address(
        &self,
        _address: &Pubkey,
        limit: usize,
    ) -> Result<Vec<RpcConfirmedTransactionStatusWithSignature>, UpstreamError> {
        Ok(self.signatures.iter().take(limit).cloned().collect())
    }

    async fn transaction(&self, signature: &str) -> Result<Option<TransactionBalances>, UpstreamError> {
        if self.fail_transactions.load(Ordering::SeqCst) {
            return Err(UpstreamError::Parse(format!("bad transaction {}", signature)));
        }
        Ok(self.transactions.get(signature).cloned())
    }
}

/// Price source that replays a script of `(delay, pair)` responses, then
/// keeps answering with `fallback`.
pub struct ScriptedPrices {
    script: Mutex<VecDeque<(Duration, Option<DexPair>)>>,
    fallback: Option<DexPair>,
}

impl ScriptedPrices {
    pub fn constant(pair: Option<DexPair>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: pair,
        }
    }

    pub fn scripted(script: Vec<(Duration, Option<DexPair>)>, fallback: Option<DexPair>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
        }
    }
}

#[async_trait]
impl PriceSource for ScriptedPrices {
    async fn first_pair(&self, _mint: &Pubkey) -> Result<Option<DexPair>, UpstreamError> {
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some((delay, pair)) => {
                tokio::time::sleep(delay).await;
                Ok(pair)
            }
            None => Ok(self.fallback.clone()),
        }
    }
}

pub fn settings(top_holders: usize, holder_source: HolderSource, history_fallback: HistoryFallback) -> AggregatorSettings {
    AggregatorSettings {
        top_holders,
        holder_source,
        history_fallback,
        ..AggregatorSettings::new(mint())
    }
}

pub fn aggregator(
    chain: Arc<dyn ChainClient>,
    prices: Arc<dyn PriceSource>,
    settings: AggregatorSettings,
) -> Aggregator {
    Aggregator::new(chain, prices, settings).with_clock(Arc::new(FixedClock(NOW_MS)))
}
