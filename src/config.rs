use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_BIND: &str = "127.0.0.1:3000";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    pub data_dir: PathBuf,
    pub api_base_url: String,
    pub public_url: String,
    pub request_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let bind_addr =
            env::var("TENNIS_TORCH_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());

        let data_dir = env::var("TENNIS_TORCH_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));

        Self {
            public_url: env::var("TENNIS_TORCH_PUBLIC_URL")
                .unwrap_or_else(|_| format!("http://{}/", bind_addr)),
            bind_addr,
            data_dir,
            api_base_url: env::var("TENNIS_TORCH_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            request_timeout: Duration::from_secs(
                env::var("REQUEST_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    /// File backing the durable key-value store (the browser's local storage
    /// equivalent).
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("local_storage.json")
    }
}
