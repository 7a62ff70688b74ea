use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::rpc_request::RpcError;
use thiserror::Error;

/// Failure of a single upstream call. The aggregator never distinguishes
/// these to consumers; they collapse into the snapshot's error string.
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for UpstreamError {
    fn from(err: serde_json::Error) -> Self {
        UpstreamError::Parse(err.to_string())
    }
}

impl From<ClientError> for UpstreamError {
    fn from(err: ClientError) -> Self {
        let request = err
            .request()
            .map(|r| r.to_string())
            .unwrap_or_else(|| "RPC".to_string());
        match err.kind {
            ClientErrorKind::Reqwest(e) if e.is_decode() => {
                UpstreamError::Parse(format!("{} response: {}", request, e))
            }
            ClientErrorKind::Reqwest(e) => match e.status() {
                Some(status) => UpstreamError::Protocol(format!("{} returned HTTP {}", request, status)),
                None => UpstreamError::Transport(e),
            },
            ClientErrorKind::RpcError(RpcError::RpcResponseError { code, message, .. }) => {
                tracing::error!("RPC error from {}: {} ({})", request, message, code);
                UpstreamError::Protocol(format!("{}: {} ({})", request, message, code))
            }
            ClientErrorKind::RpcError(RpcError::ParseError(message)) => {
                UpstreamError::Parse(format!("{}: {}", request, message))
            }
            ClientErrorKind::SerdeJson(e) => UpstreamError::Parse(format!("{} result: {}", request, e)),
            other => UpstreamError::Protocol(format!("{}: {}", request, other)),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?} ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub fn invalid(name: &'static str, value: &str, reason: impl ToString) -> Self {
        ConfigError::Invalid {
            name,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}
