use std::future::Future;

use dioxus::hooks::{use_resource, Resource};
use orderdesk_shared::QueryKey;

use crate::stores::{mark_fresh, query_generation};

/// A hook that wraps `use_resource` and re-runs it whenever the query store
/// invalidates or refetches `key`.
///
/// ### Example
///
/// ```rust,ignore
/// // In a component. Can be used just like `use_resource`.
/// let pending: Resource<Vec<Order>> = use_query_resource(QueryKey::PendingOrders, || async {
///     fetch_pending_orders().await
/// });
///
/// // A `new_order` update from the feed now re-runs the fetch above.
/// ```
pub fn use_query_resource<T, F>(
    key: QueryKey,
    mut future: impl FnMut() -> F + 'static,
) -> Resource<T>
where
    T: 'static,
    F: Future<Output = T> + 'static,
{
    use_resource(move || {
        let _generation = query_generation(key);
        let fetch = future();
        async move {
            let value = fetch.await;
            mark_fresh(key);
            value
        }
    })
}
