use serde::{Deserialize, Serialize};

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// 环境变量前缀，例如 LINKMAP__SERVER__PORT=9999
pub const ENV_PREFIX: &str = "LINKMAP";

/// 静态配置（从 TOML 和环境变量加载，启动时使用）
///
/// 包含：
/// - server: 服务器地址、端口、worker 数量
/// - storage: KV 存储后端
/// - auth: 访问代理断言头及密钥集
/// - logging: 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config file > 默认值
    pub fn load(path: Option<&str>) -> Self {
        let path = path.unwrap_or(DEFAULT_CONFIG_PATH);
        match Self::try_load(path) {
            Ok(config) => {
                if std::path::Path::new(path).exists() {
                    eprintln!("[INFO] Configuration loaded from: {}", path);
                }
                config
            }
            Err(e) => {
                eprintln!("[ERROR] Failed to load config: {}", e);
                Self::default()
            }
        }
    }

    /// Same as [`StaticConfig::load`] but surfaces build/deserialize errors.
    pub fn try_load(path: &str) -> Result<Self, config::ConfigError> {
        use config::{Config, Environment, File};

        Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<StaticConfig>()
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
}

/// KV 存储后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Redis,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Redis => write!(f, "redis"),
        }
    }
}

/// 存储配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub redis: RedisConfig,
}

/// 内存存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Maximum number of keys returned per list page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

/// Redis 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_url")]
    pub url: String,
    #[serde(default = "default_redis_key_prefix")]
    pub key_prefix: String,
    #[serde(default = "default_scan_count")]
    pub scan_count: usize,
}

/// Identity-aware proxy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Request header carrying the signed assertion.
    #[serde(default = "default_assertion_header")]
    pub assertion_header: String,
    /// Access team domain, e.g. `myteam.cloudflareaccess.com`.
    #[serde(default)]
    pub team_domain: Option<String>,
    /// Explicit JWKS endpoint; wins over `team_domain`.
    #[serde(default)]
    pub certs_url: Option<String>,
    /// Expected `aud` claim (the application AUD tag).
    #[serde(default)]
    pub audience: Option<String>,
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default = "default_jwks_refresh_secs")]
    pub jwks_refresh_secs: u64,
    /// Accept assertions without checking their signature. Development only.
    #[serde(default)]
    pub insecure_skip_verify: bool,
}

impl AuthConfig {
    /// JWKS endpoint derived from `certs_url` or `team_domain`.
    pub fn certs_endpoint(&self) -> Option<String> {
        if let Some(url) = self.certs_url.as_ref().filter(|u| !u.is_empty()) {
            return Some(url.clone());
        }
        self.team_domain
            .as_ref()
            .map(|d| d.trim().trim_start_matches("https://").trim_end_matches('/'))
            .filter(|d| !d.is_empty())
            .map(|d| format!("https://{}/cdn-cgi/access/certs", d))
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

// ============================================================
// Default value functions
// ============================================================

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_page_size() -> usize {
    1000
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/".to_string()
}

fn default_redis_key_prefix() -> String {
    "linkmap:".to_string()
}

fn default_scan_count() -> usize {
    500
}

fn default_assertion_header() -> String {
    "Cf-Access-Jwt-Assertion".to_string()
}

fn default_jwks_refresh_secs() -> u64 {
    3600
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cpu_count: default_cpu_count(),
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_redis_key_prefix(),
            scan_count: default_scan_count(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            assertion_header: default_assertion_header(),
            team_domain: None,
            certs_url: None,
            audience: None,
            issuer: None,
            jwks_refresh_secs: default_jwks_refresh_secs(),
            insecure_skip_verify: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = StaticConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.auth.assertion_header, "Cf-Access-Jwt-Assertion");
        assert!(!config.auth.insecure_skip_verify);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("linkmap.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9090

[storage]
backend = "redis"

[storage.redis]
key_prefix = "links:"

[auth]
team_domain = "acme.cloudflareaccess.com"
"#
        )
        .unwrap();

        let config = StaticConfig::try_load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.storage.backend, StorageBackend::Redis);
        assert_eq!(config.storage.redis.key_prefix, "links:");
        assert_eq!(config.storage.redis.scan_count, 500);
        assert_eq!(
            config.auth.certs_endpoint().as_deref(),
            Some("https://acme.cloudflareaccess.com/cdn-cgi/access/certs")
        );
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = StaticConfig::load(path.to_str());
        assert_eq!(config.storage.memory.page_size, 1000);
    }

    #[test]
    fn test_mistyped_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("linkmap.toml");
        std::fs::write(&path, "[storage]\nbackend = \"rediss\"\n").unwrap();

        assert!(StaticConfig::try_load(path.to_str().unwrap()).is_err());
        // the lenient loader still falls back
        assert_eq!(
            StaticConfig::load(path.to_str()).storage.backend,
            StorageBackend::Memory
        );
    }

    #[test]
    fn test_certs_url_wins_over_team_domain() {
        let auth = AuthConfig {
            team_domain: Some("acme.cloudflareaccess.com".into()),
            certs_url: Some("https://keys.example.com/jwks".into()),
            ..AuthConfig::default()
        };
        assert_eq!(
            auth.certs_endpoint().as_deref(),
            Some("https://keys.example.com/jwks")
        );
        assert_eq!(AuthConfig::default().certs_endpoint(), None);
    }

    #[test]
    fn test_sample_config_round_trips() {
        let sample = StaticConfig::generate_sample_config();
        let parsed: StaticConfig = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.auth.jwks_refresh_secs, 3600);
    }
}
