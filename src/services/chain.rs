use std::num::NonZeroU32;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::{clock::DefaultClock, state::{InMemoryState, NotKeyed}, Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::json;
use solana_account_decoder::{parse_token::UiTokenAmount, UiAccountEncoding};
use solana_client::{
    client_error::Result as ClientResult,
    nonblocking::rpc_client::RpcClient,
    rpc_client::{GetConfirmedSignaturesForAddress2Config, RpcClientConfig},
    rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig, RpcTransactionConfig},
    rpc_filter::{Memcmp, MemcmpEncodedBytes, RpcFilterType},
    rpc_request::RpcRequest,
    rpc_response::{RpcConfirmedTransactionStatusWithSignature, RpcTokenAccountBalance},
    rpc_sender::{RpcSender, RpcTransportStats},
};
use solana_rpc_client::http_sender::HttpSender;
use solana_sdk::{
    commitment_config::CommitmentConfig, program_pack::Pack, pubkey::Pubkey, signature::Signature,
};
use solana_transaction_status::{
    EncodedConfirmedTransactionWithStatusMeta, UiTransactionEncoding, UiTransactionTokenBalance,
};
use spl_token::state::{Account as TokenAccount, Mint};

use crate::error::UpstreamError;

pub type RpcRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Raw supply and decimals of a mint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MintInfo {
    pub supply: u64,
    pub decimals: Option<u8>,
}

/// Owner and raw balance of one token account.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenHolding {
    pub address: String,
    pub owner: String,
    pub amount: u64,
}

/// Block time and token balances recorded in one transaction's metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionBalances {
    pub block_time: Option<i64>,
    pub pre: Vec<UiTransactionTokenBalance>,
    pub post: Vec<UiTransactionTokenBalance>,
}

impl From<EncodedConfirmedTransactionWithStatusMeta> for TransactionBalances {
    fn from(tx: EncodedConfirmedTransactionWithStatusMeta) -> Self {
        let (pre, post) = match tx.transaction.meta {
            Some(meta) => (
                Option::<Vec<UiTransactionTokenBalance>>::from(meta.pre_token_balances).unwrap_or_default(),
                Option::<Vec<UiTransactionTokenBalance>>::from(meta.post_token_balances).unwrap_or_default(),
            ),
            None => (Vec::new(), Vec::new()),
        };
        Self {
            block_time: tx.block_time,
            pre,
            post,
        }
    }
}

/// Human-scaled amount; a null `uiAmount` falls back to the string form, then 0.
pub fn ui_amount(amount: &UiTokenAmount) -> f64 {
    amount
        .ui_amount
        .or_else(|| amount.ui_amount_string.parse().ok())
        .unwrap_or(0.0)
}

/// The chain reads the dashboard needs.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Mint supply and decimals; `None` when the account data is not a plain SPL mint.
    async fn mint_info(&self, mint: &Pubkey) -> Result<Option<MintInfo>, UpstreamError>;

    async fn token_supply(&self, mint: &Pubkey) -> Result<MintInfo, UpstreamError>;

    /// Largest token accounts for a mint, as ranked by the node.
    async fn largest_accounts(&self, mint: &Pubkey) -> Result<Vec<RpcTokenAccountBalance>, UpstreamError>;

    /// `None` if the account no longer exists or is not a token account.
    async fn token_account(&self, address: &str) -> Result<Option<TokenHolding>, UpstreamError>;

    /// Every token account of a mint, via `getProgramAccounts`.
    async fn token_accounts_by_mint(&self, mint: &Pubkey) -> Result<Vec<TokenHolding>, UpstreamError>;

    async fn signatures_for_address(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> Result<Vec<RpcConfirmedTransactionStatusWithSignature>, UpstreamError>;

    /// `None` when the node no longer has the transaction.
    async fn transaction(&self, signature: &str) -> Result<Option<TransactionBalances>, UpstreamError>;
}

/// HTTP transport that waits on the shared rate limiter before every request,
/// including the version checks `RpcClient` issues on its own.
struct RateLimitedSender {
    inner: HttpSender,
    rate_limiter: Arc<RpcRateLimiter>,
}

#[async_trait]
impl RpcSender for RateLimitedSender {
    async fn send(&self, request: RpcRequest, params: serde_json::Value) -> ClientResult<serde_json::Value> {
        self.rate_limiter.until_ready().await;
        self.inner.send(request, params).await
    }

    fn get_transport_stats(&self) -> RpcTransportStats {
        self.inner.get_transport_stats()
    }

    fn url(&self) -> String {
        self.inner.url()
    }
}

pub struct RpcChainClient {
    rpc: RpcClient,
}

impl RpcChainClient {
    pub fn new(
        endpoint: String,
        api_key: Option<String>,
        timeout: Duration,
        rate_limiter: Arc<RpcRateLimiter>,
    ) -> Result<Self, UpstreamError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            let value = HeaderValue::from_str(&key)
                .map_err(|e| UpstreamError::Protocol(format!("RPC API key is not a valid header value: {}", e)))?;
            headers.insert("x-api-key", value);
        }
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        let sender = RateLimitedSender {
            inner: HttpSender::new_with_client(endpoint, http),
            rate_limiter,
        };
        let rpc = RpcClient::new_sender(sender, RpcClientConfig::with_commitment(CommitmentConfig::confirmed()));
        Ok(Self { rpc })
    }

    pub fn rate_limiter(requests_per_second: u32) -> Arc<RpcRateLimiter> {
        let rate = NonZeroU32::new(requests_per_second).unwrap_or(nonzero!(10u32));
        Arc::new(RateLimiter::direct(Quota::per_second(rate)))
    }

    pub async fn get_version(&self) -> Result<String, UpstreamError> {
        Ok(self.rpc.get_version().await?.solana_core)
    }

    fn base64_config(&self) -> RpcAccountInfoConfig {
        RpcAccountInfoConfig {
            encoding: Some(UiAccountEncoding::Base64),
            commitment: Some(self.rpc.commitment()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn mint_info(&self, mint: &Pubkey) -> Result<Option<MintInfo>, UpstreamError> {
        let account = self
            .rpc
            .get_account_with_config(mint, self.base64_config())
            .await?
            .value
            .ok_or_else(|| UpstreamError::Protocol(format!("mint account {} not found", mint)))?;
        Ok(parse_mint(&account.data))
    }

    async fn token_supply(&self, mint: &Pubkey) -> Result<MintInfo, UpstreamError> {
        let supply = self.rpc.get_token_supply(mint).await?;
        let raw = supply
            .amount
            .parse::<u64>()
            .map_err(|e| UpstreamError::Parse(format!("token supply {:?}: {}", supply.amount, e)))?;
        Ok(MintInfo {
            supply: raw,
            decimals: Some(supply.decimals),
        })
    }

    async fn largest_accounts(&self, mint: &Pubkey) -> Result<Vec<RpcTokenAccountBalance>, UpstreamError> {
        Ok(self.rpc.get_token_largest_accounts(mint).await?)
    }

    async fn token_account(&self, address: &str) -> Result<Option<TokenHolding>, UpstreamError> {
        let pubkey = Pubkey::from_str(address)
            .map_err(|e| UpstreamError::Parse(format!("token account {}: {}", address, e)))?;
        let account = self.rpc.get_account_with_config(&pubkey, self.base64_config()).await?.value;
        Ok(account.and_then(|account| parse_token_account(address, &account.data)))
    }

    async fn token_accounts_by_mint(&self, mint: &Pubkey) -> Result<Vec<TokenHolding>, UpstreamError> {
        let accounts = self
            .rpc
            .get_program_accounts_with_config(&spl_token::ID, token_accounts_config(mint))
            .await?;
        let total = accounts.len();

        let holdings: Vec<TokenHolding> = accounts
            .into_iter()
            .filter_map(|(pubkey, account)| parse_token_account(&pubkey.to_string(), &account.data))
            .collect();
        tracing::debug!("Unpacked {} of {} token accounts", holdings.len(), total);
        Ok(holdings)
    }

    async fn signatures_for_address(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> Result<Vec<RpcConfirmedTransactionStatusWithSignature>, UpstreamError> {
        let config = GetConfirmedSignaturesForAddress2Config {
            limit: Some(limit),
            commitment: Some(self.rpc.commitment()),
            ..Default::default()
        };
        Ok(self.rpc.get_signatures_for_address_with_config(address, config).await?)
    }

    async fn transaction(&self, signature: &str) -> Result<Option<TransactionBalances>, UpstreamError> {
        let signature = Signature::from_str(signature)
            .map_err(|e| UpstreamError::Parse(format!("signature {}: {}", signature, e)))?;
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::JsonParsed),
            commitment: Some(self.rpc.commitment()),
            max_supported_transaction_version: Some(0),
        };
        // Pruned transactions come back as `null`, which `get_transaction_with_config` rejects.
        let tx: Option<EncodedConfirmedTransactionWithStatusMeta> = self
            .rpc
            .send(RpcRequest::GetTransaction, json!([signature.to_string(), config]))
            .await?;
        Ok(tx.map(TransactionBalances::from))
    }
}

fn token_accounts_config(mint: &Pubkey) -> RpcProgramAccountsConfig {
    RpcProgramAccountsConfig {
        filters: Some(vec![
            RpcFilterType::DataSize(TokenAccount::LEN as u64),
            RpcFilterType::Memcmp(Memcmp::new(
                0,
                MemcmpEncodedBytes::Base58(mint.to_string()),
            )),
        ]),
        account_config: RpcAccountInfoConfig {
            encoding: Some(UiAccountEncoding::Base64),
            ..Default::default()
        },
        with_context: None,
    }
}

/// Token-2022 mints carry extensions past the base layout and do not unpack here.
pub(crate) fn parse_mint(data: &[u8]) -> Option<MintInfo> {
    let mint = Mint::unpack(data).ok()?;
    Some(MintInfo {
        supply: mint.supply,
        decimals: Some(mint.decimals),
    })
}

pub(crate) fn parse_token_account(address: &str, data: &[u8]) -> Option<TokenHolding> {
    let account = TokenAccount::unpack(data.get(..TokenAccount::LEN)?).ok()?;
    Some(TokenHolding {
        address: address.to_string(),
        owner: account.owner.to_string(),
        amount: account.amount,
    })
}
