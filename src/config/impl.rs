use std::sync::{Arc, OnceLock};

use super::{DEFAULT_CONFIG_PATH, StaticConfig};

static CONFIG: OnceLock<Arc<StaticConfig>> = OnceLock::new();

/// Initialize the global configuration
///
/// Loads configuration from `path` (or "config.toml" in the current
/// directory) and `LINKMAP__*` environment variables. Later calls are no-ops
/// and return the instance loaded first.
///
/// # Examples
/// ```no_run
/// use linkmap::config::init_config;
/// let config = init_config(None);
/// assert!(config.server.port > 0);
/// ```
pub fn init_config(path: Option<&str>) -> Arc<StaticConfig> {
    CONFIG
        .get_or_init(|| Arc::new(StaticConfig::load(path)))
        .clone()
}

/// Like [`init_config`], but a config that fails to load is an error
/// instead of silently becoming the defaults.
pub fn try_init_config(path: Option<&str>) -> Result<Arc<StaticConfig>, config::ConfigError> {
    if let Some(config) = CONFIG.get() {
        return Ok(config.clone());
    }
    let loaded = Arc::new(StaticConfig::try_load(path.unwrap_or(DEFAULT_CONFIG_PATH))?);
    Ok(CONFIG.get_or_init(|| loaded).clone())
}
