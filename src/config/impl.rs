use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;

use super::{DEFAULT_CONFIG_PATH, StaticConfig};

static CONFIG: OnceLock<ArcSwap<StaticConfig>> = OnceLock::new();

/// Get the global configuration instance
///
/// Returns an Arc pointer to the configuration, which is cheap to clone
/// and doesn't hold any locks. Falls back to defaults when
/// `init_config()` has not been called.
pub fn get_config() -> Arc<StaticConfig> {
    CONFIG
        .get_or_init(|| ArcSwap::from_pointee(StaticConfig::default()))
        .load_full()
}

/// Initialize the global configuration from `shortpool.toml`
///
/// # Examples
/// ```no_run
/// use shortpool::config::init_config;
/// init_config();
/// ```
pub fn init_config() {
    init_config_from(DEFAULT_CONFIG_PATH);
}

/// Initialize the global configuration from an explicit path
///
/// A second call replaces the stored configuration.
pub fn init_config_from(path: &str) {
    let loaded = StaticConfig::load(path);
    match CONFIG.get() {
        Some(existing) => existing.store(Arc::new(loaded)),
        None => {
            if let Err(rejected) = CONFIG.set(ArcSwap::from_pointee(loaded)) {
                // 并发初始化：另一方已写入，覆盖为本次加载结果
                if let Some(existing) = CONFIG.get() {
                    existing.store(rejected.load_full());
                }
            }
        }
    }
}
