//! orderdesk-tail - follow the order feed from a terminal
//!
//! Connects to the feed for one sheet and logs every cache invalidation,
//! refetch and notice the dashboard would see. Stops on Ctrl-C.
//!
//! Usage: `orderdesk-tail <sheet>` (or set `ORDERDESK_SHEET`), with
//! `ORDERDESK_ORIGIN` pointing at the dashboard origin.

#[cfg(not(target_arch = "wasm32"))]
mod tail {
    use std::rc::Rc;

    use anyhow::Context;
    use orderdesk_client::sync::{
        Collaborators, Notice, NotificationSink, QueryInvalidator, SyncDriver, SystemClock,
    };
    use orderdesk_client::SyncConfig;
    use orderdesk_shared::QueryKey;

    struct LoggedCache;

    impl QueryInvalidator for LoggedCache {
        fn invalidate(&self, key: QueryKey) {
            tracing::info!("invalidate {}", key);
        }

        fn force_refetch(&self, key: QueryKey) {
            tracing::info!("refetch {}", key);
        }
    }

    struct LoggedNotices;

    impl NotificationSink for LoggedNotices {
        fn notify(&self, notice: Notice) {
            tracing::info!(
                severity = ?notice.severity,
                duration_ms = ?notice.duration_ms(),
                "notice: {}",
                notice.message
            );
        }
    }

    pub async fn run() -> anyhow::Result<()> {
        let sheet = std::env::args()
            .nth(1)
            .or_else(|| std::env::var("ORDERDESK_SHEET").ok())
            .filter(|s| !s.trim().is_empty())
            .context("no sheet given: pass it as the first argument or set ORDERDESK_SHEET")?;

        let config = SyncConfig::load();
        let collaborators = Collaborators {
            cache: Rc::new(LoggedCache),
            notifier: Rc::new(LoggedNotices),
            clock: Rc::new(SystemClock),
            on_status: Rc::new(|connected| tracing::info!(connected, "feed status changed")),
        };

        let (driver, handle) = SyncDriver::new(config, collaborators)?;
        handle.connect(&sheet)?;

        let shutdown = handle.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutting down");
                let _ = shutdown.shutdown();
            }
        });

        driver.run().await;
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("orderdesk_client=debug,orderdesk_tail=info")),
        )
        .init();

    tail::run().await
}

#[cfg(target_arch = "wasm32")]
fn main() {}
