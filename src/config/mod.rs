use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub funnel_server: ServerConfig,
    pub admin_server: ServerConfig,
    pub tracking: TrackingConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// How far to trust proxy headers when extracting the client IP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustedProxyMode {
    None,
    Standard,
    Cloudflare,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Seconds between time-spent heartbeat writes per session.
    pub heartbeat_secs: u64,
    /// Timeout applied once on the shared lookup HTTP client.
    pub lookup_timeout_secs: u64,
    /// Endpoint returning the caller's public IP as {"ip": "..."}.
    pub ip_endpoint: String,
    /// Base URL of the per-IP geo lookup ({base}/{ip}/json/).
    pub geo_endpoint: String,
    pub trusted_proxy_mode: TrustedProxyMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub max_entries: u64,
    pub ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let backend_str =
            std::env::var("DATABASE_BACKEND").unwrap_or_else(|_| "sqlite".to_string());

        let backend = match backend_str.to_lowercase().as_str() {
            "postgres" | "postgresql" => DatabaseBackend::Postgres,
            _ => DatabaseBackend::Sqlite,
        };

        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://./funnel.db".to_string());

        let funnel_host = std::env::var("FUNNEL_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let funnel_port = std::env::var("FUNNEL_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()?;

        let admin_host = std::env::var("ADMIN_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let admin_port = std::env::var("ADMIN_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()?;

        let heartbeat_secs = std::env::var("TRACKING_HEARTBEAT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(15);

        let lookup_timeout_secs = std::env::var("LOOKUP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(4);

        let ip_endpoint = std::env::var("IP_LOOKUP_URL")
            .unwrap_or_else(|_| "https://api.ipify.org?format=json".to_string());

        let geo_endpoint =
            std::env::var("GEO_LOOKUP_URL").unwrap_or_else(|_| "https://ipapi.co".to_string());

        let proxy_mode_str = std::env::var("TRUSTED_PROXY_MODE")
            .unwrap_or_else(|_| "none".to_string())
            .to_lowercase();

        let trusted_proxy_mode = match proxy_mode_str.as_str() {
            "standard" => TrustedProxyMode::Standard,
            "cloudflare" => TrustedProxyMode::Cloudflare,
            "none" => TrustedProxyMode::None,
            other => {
                tracing::warn!(
                    "Unknown TRUSTED_PROXY_MODE '{other}', falling back to 'none'. Supported values: none, standard, cloudflare"
                );
                TrustedProxyMode::None
            }
        };

        let cache_max_entries = std::env::var("CACHE_MAX_ENTRIES")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(10_000);

        let cache_ttl_secs = std::env::var("CACHE_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(300);

        Ok(Config {
            database: DatabaseConfig {
                backend,
                url: database_url,
            },
            funnel_server: ServerConfig {
                host: funnel_host,
                port: funnel_port,
            },
            admin_server: ServerConfig {
                host: admin_host,
                port: admin_port,
            },
            tracking: TrackingConfig {
                heartbeat_secs,
                lookup_timeout_secs,
                ip_endpoint,
                geo_endpoint,
                trusted_proxy_mode,
            },
            cache: CacheConfig {
                max_entries: cache_max_entries,
                ttl_secs: cache_ttl_secs,
            },
        })
    }
}
