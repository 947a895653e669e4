//! Reusable hooks.

pub mod query_resource;

pub use query_resource::use_query_resource;
