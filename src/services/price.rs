use std::time::Duration;

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;

use crate::error::UpstreamError;
use crate::types::dex::{DexPair, DexTokensResponse};

/// Source of USD price, FDV and intraday history for a token.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// The first trading pair listed for the token, if any.
    async fn first_pair(&self, mint: &Pubkey) -> Result<Option<DexPair>, UpstreamError>;
}

pub struct DexScreenerClient {
    http: reqwest::Client,
    base_url: String,
}

impl DexScreenerClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    fn tokens_url(&self, mint: &Pubkey) -> String {
        format!("{}/latest/dex/tokens/{}", self.base_url.trim_end_matches('/'), mint)
    }
}

#[async_trait]
impl PriceSource for DexScreenerClient {
    async fn first_pair(&self, mint: &Pubkey) -> Result<Option<DexPair>, UpstreamError> {
        let url = self.tokens_url(mint);
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Protocol(format!("price API returned HTTP {}", status)));
        }

        let body: DexTokensResponse = serde_json::from_str(&response.text().await?)?;
        let pairs = body.pairs.unwrap_or_default();
        tracing::debug!("DexScreener listed {} pairs for {}", pairs.len(), mint);
        Ok(pairs.into_iter().next())
    }
}
