//! Watch configuration file
//!
//! ```toml
//! room_id = 21000000
//! token = "..."
//!
//! [[hosts]]
//! host = "broadcast.example.com"
//! wss_port = 443
//!
//! [client]
//! user_id = 0
//! min_recommend_score = 3
//!
//! [client.backoff]
//! base_ms = 1000
//! ```

use anyhow::{Context, Result};
use barrage_client::ClientConfig;
use barrage_core::{ConnectionInfo, HostDescriptor};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub room_id: u64,
    pub token: String,
    #[serde(alias = "host_list")]
    pub hosts: Vec<HostDescriptor>,
    pub client: ClientConfig,
}

impl WatchConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// `$XDG_CONFIG_HOME/barrage/watch.toml`, if that file exists
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("barrage").join("watch.toml"))
            .filter(|path| path.is_file())
    }

    pub fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo::new(self.room_id, self.token.clone(), self.hosts.clone())
    }
}

/// Parse `host[:port]`, defaulting to 443
pub fn parse_host(value: &str) -> Result<HostDescriptor> {
    match value.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .with_context(|| format!("Invalid port in host '{}'", value))?;
            Ok(HostDescriptor::new(host, port))
        }
        None => Ok(HostDescriptor::new(value, 443)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = WatchConfig::parse(
            r#"
            room_id = 42
            token = "abc"

            [[hosts]]
            host = "a.example.com"
            wss_port = 443

            [[hosts]]
            host = "b.example.com"
            wss_port = 2245

            [client]
            user_id = 9
            min_recommend_score = 0

            [client.backoff]
            base_ms = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.room_id, 42);
        assert_eq!(config.hosts.len(), 2);
        assert_eq!(config.hosts[1].wss_port, 2245);
        assert_eq!(config.client.user_id, 9);
        assert_eq!(config.client.min_recommend_score, Some(0));
        assert_eq!(config.client.backoff.base_ms, 500);
        assert_eq!(config.client.backoff.max_ms, 30_000);
        assert_eq!(config.client.queue_capacity, 64);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = WatchConfig::parse("").unwrap();
        assert_eq!(config.room_id, 0);
        assert!(config.hosts.is_empty());
        assert_eq!(config.client, ClientConfig::default());
    }

    #[test]
    fn test_parse_host() {
        assert_eq!(
            parse_host("h.example.com:2245").unwrap(),
            HostDescriptor::new("h.example.com", 2245)
        );
        assert_eq!(
            parse_host("h.example.com").unwrap(),
            HostDescriptor::new("h.example.com", 443)
        );
        assert!(parse_host("h:notaport").is_err());
    }
}
