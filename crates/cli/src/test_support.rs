use std::sync::{Mutex, OnceLock};

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

/// Runs `run` with the given variables set (`Some`) or removed (`None`),
/// restoring their previous values afterwards.
///
/// The process environment is locked for the whole call so parallel tests
/// never observe each other's overrides.
pub(crate) fn with_locked_env<R>(
    vars: &[(&str, Option<&str>)],
    run: impl FnOnce() -> R,
) -> R {
    let _guard = env_lock().lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    let previous: Vec<(String, Option<String>)> = vars
        .iter()
        .map(|(key, _)| (key.to_string(), std::env::var(key).ok()))
        .collect();
    for (key, value) in vars {
        apply(key, *value);
    }

    let result = run();

    for (key, value) in &previous {
        apply(key, value.as_deref());
    }
    result
}

fn apply(key: &str, value: Option<&str>) {
    // SAFETY: every caller holds `env_lock`, so no other test thread
    // touches the environment concurrently.
    unsafe {
        match value {
            Some(value) => std::env::set_var(key, value),
            None => std::env::remove_var(key),
        }
    }
}
