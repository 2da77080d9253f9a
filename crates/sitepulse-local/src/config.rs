//! Environment-driven configuration.
//!
//! Every knob has a default that matches the interactive workflow; the CLI may override
//! individual fields after `from_env()`.

use std::time::Duration;

/// Desktop Chrome user-agent presented by both retrieval strategies.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/141.0.0.0 Safari/537.36";

pub(crate) fn env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub(crate) fn env_bool(key: &str) -> bool {
    matches!(
        env(key).unwrap_or_default().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

pub(crate) fn env_u64(key: &str) -> Option<u64> {
    env(key).and_then(|s| s.parse::<u64>().ok())
}

#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub user_agent: String,
    /// Page-load timeout handed to the browser.
    pub page_load_timeout: Duration,
    /// Fixed wait after navigation so client-side rendering can finish.
    pub settle: Duration,
    /// Wall clock for the whole browser child process.
    pub hard_timeout: Duration,
    /// Skip the browser strategy entirely.
    pub disabled: bool,
    pub node_bin: String,
    /// Explicit Node module root containing `playwright`.
    pub node_path: Option<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let page_load_timeout = Duration::from_secs(25);
        let settle = Duration::from_secs(3);
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            page_load_timeout,
            settle,
            hard_timeout: page_load_timeout + settle + Duration::from_secs(10),
            disabled: false,
            node_bin: "node".to_string(),
            node_path: None,
        }
    }
}

impl RenderConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(ua) = env("SITEPULSE_USER_AGENT") {
            cfg.user_agent = ua;
        }
        if let Some(ms) = env_u64("SITEPULSE_RENDER_TIMEOUT_MS") {
            cfg.page_load_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = env_u64("SITEPULSE_RENDER_SETTLE_MS") {
            cfg.settle = Duration::from_millis(ms);
        }
        cfg.hard_timeout = match env_u64("SITEPULSE_RENDER_HARD_TIMEOUT_MS") {
            Some(ms) => Duration::from_millis(ms),
            None => cfg.page_load_timeout + cfg.settle + Duration::from_secs(10),
        };
        cfg.disabled = env_bool("SITEPULSE_RENDER_DISABLE");
        if let Some(bin) = env("SITEPULSE_NODE") {
            cfg.node_bin = bin;
        }
        cfg.node_path = env("SITEPULSE_NODE_PATH");
        cfg
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(20),
        }
    }
}

impl FetchConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(ua) = env("SITEPULSE_USER_AGENT") {
            cfg.user_agent = ua;
        }
        if let Some(ms) = env_u64("SITEPULSE_FETCH_TIMEOUT_MS") {
            cfg.timeout = Duration::from_millis(ms);
        }
        cfg
    }
}

#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    /// Per-chunk request timeout.
    pub timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434".to_string(),
            model: "llama3".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl OllamaConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(u) = env("SITEPULSE_OLLAMA_BASE_URL") {
            cfg.base_url = u;
        }
        if let Some(m) = env("SITEPULSE_OLLAMA_MODEL") {
            cfg.model = m;
        }
        if let Some(ms) = env_u64("SITEPULSE_OLLAMA_TIMEOUT_MS") {
            cfg.timeout = Duration::from_millis(ms);
        }
        cfg
    }
}
