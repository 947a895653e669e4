//! Cross-platform key/value persistence for client settings.
//!
//! - Web: `localStorage`
//! - Native: one JSON file per key in the platform config directory
//!   (`~/.config/orderdesk/` on Linux, `~/Library/Application Support/orderdesk/`
//!   on macOS, `%APPDATA%\orderdesk\` on Windows)

use serde::{de::DeserializeOwned, Serialize};

/// Save a value. Returns `true` if it was written.
pub fn save<T: Serialize>(key: &str, value: &T) -> bool {
    match serde_json::to_string(value) {
        Ok(json) => save_raw(key, &json),
        Err(e) => {
            crate::log_warn!("storage: could not encode '{}': {}", key, e);
            false
        }
    }
}

/// Load a value. Missing keys and undecodable JSON both yield `None`.
pub fn load<T: DeserializeOwned>(key: &str) -> Option<T> {
    let json = load_raw(key)?;
    match serde_json::from_str(&json) {
        Ok(value) => Some(value),
        Err(e) => {
            crate::log_warn!("storage: ignoring unreadable '{}': {}", key, e);
            None
        }
    }
}

/// Remove a value.
pub fn remove(key: &str) {
    remove_raw(key);
}

/// Map a storage key onto a safe file stem.
#[cfg_attr(target_arch = "wasm32", allow(dead_code))]
fn file_stem(key: &str) -> String {
    key.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_")
}

// =========================================
// Web (WASM) implementation
// =========================================

#[cfg(target_arch = "wasm32")]
fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window()?.local_storage().ok()?
}

#[cfg(target_arch = "wasm32")]
fn save_raw(key: &str, value: &str) -> bool {
    local_storage()
        .map(|storage| storage.set_item(key, value).is_ok())
        .unwrap_or(false)
}

#[cfg(target_arch = "wasm32")]
fn load_raw(key: &str) -> Option<String> {
    local_storage()?.get_item(key).ok()?
}

#[cfg(target_arch = "wasm32")]
fn remove_raw(key: &str) {
    if let Some(storage) = local_storage() {
        let _ = storage.remove_item(key);
    }
}

// =========================================
// Native implementation
// =========================================

#[cfg(not(target_arch = "wasm32"))]
fn file_path(key: &str) -> Option<std::path::PathBuf> {
    let app_dir = dirs::config_dir()?.join("orderdesk");
    if !app_dir.exists() {
        std::fs::create_dir_all(&app_dir).ok()?;
    }
    Some(app_dir.join(format!("{}.json", file_stem(key))))
}

#[cfg(not(target_arch = "wasm32"))]
fn save_raw(key: &str, value: &str) -> bool {
    let Some(path) = file_path(key) else {
        return false;
    };
    std::fs::write(path, value).is_ok()
}

#[cfg(not(target_arch = "wasm32"))]
fn load_raw(key: &str) -> Option<String> {
    std::fs::read_to_string(file_path(key)?).ok()
}

#[cfg(not(target_arch = "wasm32"))]
fn remove_raw(key: &str) {
    if let Some(path) = file_path(key) {
        let _ = std::fs::remove_file(path);
    }
}
