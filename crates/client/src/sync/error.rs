//! Error types for the sync client.
//!
//! None of these escape an event handler: transport and address failures
//! degrade the session to "not connected" and feed the reconnect policy.
//! They surface as `Result`s only on the control plane (building a driver,
//! posting to a stopped driver).

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("origin '{0}' is not a valid URL")]
    InvalidOrigin(String),
    #[error("origin scheme '{0}' cannot carry a feed connection")]
    UnsupportedScheme(String),
    #[error("origin '{0}' has no host")]
    MissingHost(String),
    #[error("subscription key is empty")]
    EmptyKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("invalid feed address: {0}")]
    InvalidAddress(String),
    #[error("could not create socket: {0}")]
    Construct(String),
    #[error("send failed: {0}")]
    Send(String),
    #[error("socket is not open")]
    NotOpen,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error("no page context: {0}")]
    NoPage(String),
    #[error("sync driver has stopped")]
    DriverStopped,
}
