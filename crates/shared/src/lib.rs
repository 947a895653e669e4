//! Shared wire types for the order desk real-time feed.

pub mod error;
pub mod protocol;

pub use error::*;
pub use protocol::*;
