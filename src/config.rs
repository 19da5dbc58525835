use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct TintaConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub bind_addr: String,
    pub asset_path: PathBuf,
    pub content_dir: PathBuf,
    pub cache_size: usize,
    pub render_timeout: Duration,
}

impl TintaConfig {
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL")
            .expect("Failed to determine DATABASE_URL from environment variables");

        let max_connections = std::env::var("MAX_CONNECTIONS")
            .ok()
            .and_then(|val| val.parse::<u32>().ok())
            .unwrap_or(15);

        let host = std::env::var("BLOG_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("BLOG_PORT").unwrap_or_else(|_| "3000".to_string());
        let bind_addr = format!("{}:{}", host, port);

        let asset_path = PathBuf::from(
            std::env::var("ASSET_PATH")
                .expect("Failed to determine ASSET_PATH from environment variables"),
        );

        let content_dir = std::fs::canonicalize(
            std::env::var("CONTENT_DIR").unwrap_or_else(|_| "./content/md".to_string()),
        )
        .expect("Failed to resolve CONTENT_DIR to an absolute path. Does the directory exist?");

        let cache_size = std::env::var("CACHE_SIZE")
            .ok()
            .and_then(|val| val.parse::<usize>().ok())
            .unwrap_or(64);

        let render_timeout = Duration::from_millis(
            std::env::var("RENDER_TIMEOUT_MS")
                .ok()
                .and_then(|val| val.parse::<u64>().ok())
                .unwrap_or(5000),
        );

        Self {
            database_url,
            max_connections,
            bind_addr,
            asset_path,
            content_dir,
            cache_size,
            render_timeout,
        }
    }
}
