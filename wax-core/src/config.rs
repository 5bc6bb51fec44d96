use tracing::{info, warn};

const DEFAULT_API_URL: &str = "https://api.wax.fm";
const DEFAULT_OWNERS_CHUNK_SIZE: usize = 200;

/// Path of the live-update SSE endpoint, relative to `api_url`.
pub const FEED_PATH: &str = "/api/events";

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the wax backend. Override with `WAX_API_URL` for dev/testing.
    pub api_url: String,
    /// Max entity IDs per owner batch lookup. Override with `WAX_OWNERS_CHUNK_SIZE`.
    pub owners_chunk_size: usize,
}

impl Config {
    pub fn load() -> Self {
        let api_url = std::env::var("WAX_API_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let owners_chunk_size = parse_chunk_size(std::env::var("WAX_OWNERS_CHUNK_SIZE").ok());

        info!("Config loaded: api_url={api_url}, owners_chunk_size={owners_chunk_size}");
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            owners_chunk_size,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            owners_chunk_size: DEFAULT_OWNERS_CHUNK_SIZE,
        }
    }
}

fn parse_chunk_size(raw: Option<String>) -> usize {
    match raw.filter(|s| !s.is_empty()) {
        Some(s) => match s.parse::<usize>() {
            Ok(n) if n >= 1 => n,
            _ => {
                warn!(
                    "Invalid WAX_OWNERS_CHUNK_SIZE '{}', using default {}",
                    s, DEFAULT_OWNERS_CHUNK_SIZE
                );
                DEFAULT_OWNERS_CHUNK_SIZE
            }
        },
        None => DEFAULT_OWNERS_CHUNK_SIZE,
    }
}
