use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub const DEFAULT_PORT: u16 = 8081;

/// Runtime configuration, loaded from a `.env`-style file at startup.
/// Values already present in the process environment win over file values.
#[derive(Debug, Clone)]
pub struct Config {
    /// Static domain the tunnel provider forwards to this process.
    pub tunnel_domain: String,
    /// Local port the HTTP server binds and the tunnel forwards.
    pub port: u16,
    /// Directory holding the per-day log files.
    pub log_dir: PathBuf,
    /// Command the discovered tunnel URL is piped into.
    pub clipboard_cmd: String,
    /// When true, a clipboard failure aborts tunnel startup.
    pub clipboard_required: bool,
}

impl Config {
    pub fn load(env_path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(env_path).map_err(|e| ConfigError::Read {
            path: env_path.to_path_buf(),
            source: e,
        })?;
        let file_vars = parse_env_file(&content);
        let get = |key: &str| std::env::var(key).ok().or_else(|| file_vars.get(key).cloned());

        let tunnel_domain = get("NGROK_STATIC_DOMAIN")
            .ok_or(ConfigError::MissingVar("NGROK_STATIC_DOMAIN"))?;
        let port = match get("PORT") {
            Some(v) => v
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(v.clone()))?,
            None => DEFAULT_PORT,
        };
        let log_dir = get("LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let clipboard_cmd = get("CLIPBOARD_CMD").unwrap_or_else(|| "pbcopy".to_string());
        let clipboard_required = get("CLIPBOARD_REQUIRED")
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            tunnel_domain,
            port,
            log_dir,
            clipboard_cmd,
            clipboard_required,
        })
    }
}

/// Parse `KEY=VALUE` lines. Blank lines and `#` comments are skipped;
/// surrounding whitespace and double quotes around values are stripped.
fn parse_env_file(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let (key, value) = line.split_once('=')?;
            let value = value.trim().trim_matches('"');
            Some((key.trim().to_string(), value.to_string()))
        })
        .collect()
}
