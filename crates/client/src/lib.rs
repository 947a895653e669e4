//! Orderdesk Client - live order feed for the order desk dashboard
//!
//! This crate keeps the dashboard's cached order queries in step with the
//! order feed server: it holds one WebSocket subscription per sheet,
//! reconnects with backoff, and turns feed frames into query invalidations
//! and throttled toast notices.

pub mod logging;

pub mod config;
pub mod storage;

pub mod hooks;
pub mod stores;
pub mod sync;

pub use config::SyncConfig;
pub use sync::{use_order_sync, OrderSync, SyncDriver, SyncHandle};
