//! Sync client configuration.
//!
//! Values are layered: built-in defaults, then overrides persisted under
//! [`CONFIG_STORAGE_KEY`], then (native builds only) `ORDERDESK_*`
//! environment variables:
//!
//! - `ORDERDESK_ORIGIN`: origin standing in for the page origin (default: `http://localhost`)
//! - `ORDERDESK_WS_PORT`: feed server port (default: 8000)
//! - `ORDERDESK_HEARTBEAT_MS`: heartbeat interval (default: 15000)
//! - `ORDERDESK_RECONNECT_MAX_ATTEMPTS`, `ORDERDESK_RECONNECT_BASE_MS`,
//!   `ORDERDESK_RECONNECT_CAP_MS`: reconnect backoff
//! - `ORDERDESK_NOTIFY_COOLDOWN_MS`: notification cooldown (default: 30000)
//! - `ORDERDESK_LOCAL_ACTOR`: actor id this client edits as
//!
//! Without an override the actor id is generated once and kept under
//! [`LOCAL_ACTOR_STORAGE_KEY`].

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::storage;
use crate::sync::{ReconnectConfig, ThrottleScope};

/// Storage key for persisted overrides.
pub const CONFIG_STORAGE_KEY: &str = "orderdesk_sync_config";

/// Storage key for the generated local actor id.
pub const LOCAL_ACTOR_STORAGE_KEY: &str = "orderdesk_local_actor";

/// Port the order feed server listens on.
pub const DEFAULT_SERVER_PORT: u16 = 8000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Port of the feed endpoint; the host always comes from the page origin
    pub server_port: u16,
    pub heartbeat_interval_ms: u32,
    pub reconnect: ReconnectConfig,
    /// Minimum spacing between throttled notifications
    pub notify_cooldown_ms: u32,
    pub throttle_scope: ThrottleScope,
    /// Delay before reconnecting after the page becomes visible or the network returns
    pub environment_retry_delay_ms: u32,
    /// Cell edits authored by this actor never raise a notification.
    /// Empty in persisted overrides means "use the stored generated id".
    #[serde(default)]
    pub local_actor_id: String,
    /// Origin used where there is no page (native builds)
    pub origin: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            server_port: DEFAULT_SERVER_PORT,
            heartbeat_interval_ms: 15_000,
            reconnect: ReconnectConfig::default(),
            notify_cooldown_ms: 30_000,
            throttle_scope: ThrottleScope::Shared,
            environment_retry_delay_ms: 1_000,
            local_actor_id: uuid::Uuid::new_v4().to_string(),
            origin: None,
        }
    }
}

impl SyncConfig {
    /// Defaults, persisted overrides, then environment overrides on native.
    pub fn load() -> Self {
        let mut config = Self::load_stored(CONFIG_STORAGE_KEY, LOCAL_ACTOR_STORAGE_KEY);

        #[cfg(not(target_arch = "wasm32"))]
        config.apply_env(|name| std::env::var(name).ok());

        config
    }

    fn load_stored(config_key: &str, actor_key: &str) -> Self {
        let mut config = storage::load::<SyncConfig>(config_key).unwrap_or_else(|| SyncConfig {
            local_actor_id: String::new(),
            ..SyncConfig::default()
        });
        if config.local_actor_id.trim().is_empty() {
            config.local_actor_id = stored_actor_id(actor_key);
        }
        config
    }

    /// Persist this configuration as the override layer.
    pub fn persist(&self) -> bool {
        storage::save(CONFIG_STORAGE_KEY, self)
    }

    /// Drop persisted overrides.
    pub fn clear_persisted() {
        storage::remove(CONFIG_STORAGE_KEY);
    }

    /// Apply `ORDERDESK_*` overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(origin) = lookup("ORDERDESK_ORIGIN") {
            self.origin = Some(origin);
        }
        if let Some(actor) = lookup("ORDERDESK_LOCAL_ACTOR") {
            self.local_actor_id = actor;
        }
        override_parsed(&lookup, "ORDERDESK_WS_PORT", &mut self.server_port);
        override_parsed(&lookup, "ORDERDESK_HEARTBEAT_MS", &mut self.heartbeat_interval_ms);
        override_parsed(
            &lookup,
            "ORDERDESK_RECONNECT_MAX_ATTEMPTS",
            &mut self.reconnect.max_attempts,
        );
        override_parsed(
            &lookup,
            "ORDERDESK_RECONNECT_BASE_MS",
            &mut self.reconnect.initial_delay_ms,
        );
        override_parsed(
            &lookup,
            "ORDERDESK_RECONNECT_CAP_MS",
            &mut self.reconnect.max_delay_ms,
        );
        override_parsed(&lookup, "ORDERDESK_NOTIFY_COOLDOWN_MS", &mut self.notify_cooldown_ms);
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(u64::from(self.heartbeat_interval_ms))
    }

    pub fn environment_retry_delay(&self) -> Duration {
        Duration::from_millis(u64::from(self.environment_retry_delay_ms))
    }
}

/// The actor id kept under `key`, generating and saving one on first use.
fn stored_actor_id(key: &str) -> String {
    if let Some(id) = storage::load::<String>(key).filter(|id| !id.trim().is_empty()) {
        return id;
    }
    let id = uuid::Uuid::new_v4().to_string();
    if !storage::save(key, &id) {
        crate::log_warn!("config: could not save local actor id, it will change on next load");
    }
    id
}

fn override_parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str, slot: &mut T) {
    let Some(raw) = lookup(name) else {
        return;
    };
    match raw.trim().parse() {
        Ok(value) => *slot = value,
        Err(_) => crate::log_warn!("config: ignoring {}={:?}, not a valid number", name, raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_feed_server() {
        let config = SyncConfig::default();
        assert_eq!(config.server_port, 8000);
        assert_eq!(config.heartbeat_interval(), Duration::from_secs(15));
        assert_eq!(config.notify_cooldown_ms, 30_000);
        assert_eq!(config.environment_retry_delay(), Duration::from_secs(1));
        assert_eq!(config.reconnect.max_attempts, 10);
        assert_eq!(config.reconnect.max_delay_ms, 15_000);
        assert!(!config.local_actor_id.is_empty());
    }

    #[test]
    fn env_overrides_are_applied_and_bad_values_ignored() {
        let vars: HashMap<&str, &str> = [
            ("ORDERDESK_ORIGIN", "https://orders.example.com"),
            ("ORDERDESK_WS_PORT", "9443"),
            ("ORDERDESK_HEARTBEAT_MS", "not-a-number"),
            ("ORDERDESK_RECONNECT_MAX_ATTEMPTS", " 3 "),
            ("ORDERDESK_LOCAL_ACTOR", "desk-2"),
        ]
        .into_iter()
        .collect();

        let mut config = SyncConfig::default();
        config.apply_env(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.origin.as_deref(), Some("https://orders.example.com"));
        assert_eq!(config.server_port, 9443);
        assert_eq!(config.heartbeat_interval_ms, 15_000);
        assert_eq!(config.reconnect.max_attempts, 3);
        assert_eq!(config.local_actor_id, "desk-2");
    }

    #[test]
    fn partial_persisted_overrides_keep_defaults() {
        let config: SyncConfig =
            serde_json::from_str(r#"{"server_port":9000,"throttle_scope":"per_class"}"#).unwrap();
        assert_eq!(config.server_port, 9000);
        assert_eq!(config.throttle_scope, ThrottleScope::PerClass);
        assert_eq!(config.heartbeat_interval_ms, 15_000);
        assert!(config.local_actor_id.is_empty());
    }

    #[test]
    fn local_actor_is_stable_across_loads() {
        let config_key = "orderdesk_test_config_stable_actor";
        let actor_key = "orderdesk_test_local_actor_stable";
        storage::remove(config_key);
        storage::remove(actor_key);

        let first = SyncConfig::load_stored(config_key, actor_key);
        let second = SyncConfig::load_stored(config_key, actor_key);
        storage::remove(actor_key);

        assert!(!first.local_actor_id.is_empty());
        assert_eq!(first.local_actor_id, second.local_actor_id);
    }

    #[test]
    fn persisted_actor_override_wins_over_generated_id() {
        let config_key = "orderdesk_test_config_actor_override";
        let actor_key = "orderdesk_test_local_actor_override";
        storage::remove(actor_key);
        assert!(storage::save(
            config_key,
            &serde_json::json!({ "local_actor_id": "desk-7", "server_port": 9000 }),
        ));

        let config = SyncConfig::load_stored(config_key, actor_key);
        storage::remove(config_key);

        assert_eq!(config.local_actor_id, "desk-7");
        assert_eq!(config.server_port, 9000);
        assert_eq!(storage::load::<String>(actor_key), None);
    }
}
