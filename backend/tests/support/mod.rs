//! Shared helpers for integration tests that touch process environment.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use schedule_portal::config::CONFIG_PATH_ENV;

/// Every variable the portal reads at startup.
pub const PORTAL_ENV_VARS: [&str; 19] = [
    CONFIG_PATH_ENV,
    "HOST",
    "PORT",
    "PLACEMENT_TIMEOUT_MS",
    "MAX_UPLOAD_BYTES",
    "REPOSITORY_TYPE",
    "DATABASE_URL",
    "PG_DATABASE_URL",
    "PG_POOL_MAX",
    "PG_POOL_MIN",
    "PG_CONN_TIMEOUT_SEC",
    "PG_IDLE_TIMEOUT_SEC",
    "PG_MAX_RETRIES",
    "PG_RETRY_DELAY_MS",
    "STORAGE_TYPE",
    "STORAGE_FOLDER_ID",
    "STORAGE_API_BASE_URL",
    "STORAGE_UPLOAD_BASE_URL",
    "STORAGE_SERVICE_ACCOUNT_FILE",
];

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Run `f` with every portal variable unset except those in `set`.
///
/// Holds a process-wide lock for the duration and restores the previous
/// values afterwards, also on panic.
pub fn with_portal_env<F, R>(set: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = lock_env();
    let _restore = EnvSnapshot::take(PORTAL_ENV_VARS.iter().copied().chain(set.iter().map(|(k, _)| *k)));

    for name in PORTAL_ENV_VARS {
        std::env::remove_var(name);
    }
    for (name, value) in set {
        std::env::set_var(name, value);
    }
    f()
}

fn lock_env() -> MutexGuard<'static, ()> {
    // A failed assertion inside `f` poisons the lock; later tests still run.
    ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct EnvSnapshot(BTreeMap<String, Option<String>>);

impl EnvSnapshot {
    fn take<'a>(names: impl Iterator<Item = &'a str>) -> Self {
        Self(
            names
                .map(|name| (name.to_string(), std::env::var(name).ok()))
                .collect(),
        )
    }
}

impl Drop for EnvSnapshot {
    fn drop(&mut self) {
        for (name, value) in &self.0 {
            match value {
                Some(value) => std::env::set_var(name, value),
                None => std::env::remove_var(name),
            }
        }
    }
}
