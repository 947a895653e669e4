//! Global stores for application state.

pub mod notices;
pub mod queries;

pub use notices::{dismiss_notice, push_notice, NoticeList, ShownNotice, StoreNotifier, NOTICES};
pub use queries::{
    invalidate_query, is_stale, mark_fresh, query_generation, refetch_query, StoreInvalidator,
    QUERY_GENERATIONS, STALE_QUERIES,
};
