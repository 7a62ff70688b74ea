//! Polls a Solana RPC node and DexScreener for one token and republishes the
//! result as a [`DashboardSnapshot`](types::models::DashboardSnapshot).

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod types;
