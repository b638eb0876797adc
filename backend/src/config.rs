use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use tokio::sync::Semaphore;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_STATIC_DIR: &str = "public";
const DEFAULT_MAX_CONNECTIONS: usize = 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub static_dir: PathBuf,
    pub catalog_path: Option<PathBuf>,
    pub max_connections: usize,
}

#[derive(Debug, PartialEq)]
pub enum ConfigError {
    Invalid { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid { key, value } => write!(f, "Invalid value for {}: {:?}", key, value),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = parse_or(&lookup, "HOST", IpAddr::V4(Ipv4Addr::LOCALHOST))?;
        let port = parse_or(&lookup, "PORT", DEFAULT_PORT)?;
        let max_connections = parse_or(&lookup, "MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?;
        if max_connections == 0 || max_connections > Semaphore::MAX_PERMITS {
            return Err(ConfigError::Invalid {
                key: "MAX_CONNECTIONS",
                value: max_connections.to_string(),
            });
        }

        let static_dir = lookup("STATIC_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR));
        let catalog_path = lookup("UPGRADE_CATALOG")
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self { host, port, static_dir, catalog_path, max_connections })
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.addr(), "127.0.0.1:3000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.static_dir, PathBuf::from("public"));
        assert_eq!(config.catalog_path, None);
        assert_eq!(config.max_connections, 1000);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("HOST", "0.0.0.0"),
            ("PORT", "8080"),
            ("STATIC_DIR", "web"),
            ("UPGRADE_CATALOG", "catalog.json"),
            ("MAX_CONNECTIONS", "5"),
        ])
        .unwrap();
        assert_eq!(config.addr(), "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.static_dir, PathBuf::from("web"));
        assert_eq!(config.catalog_path, Some(PathBuf::from("catalog.json")));
        assert_eq!(config.max_connections, 5);
    }

    #[test]
    fn test_invalid_values_are_reported() {
        assert_eq!(
            config_from(&[("PORT", "eighty")]),
            Err(ConfigError::Invalid { key: "PORT", value: "eighty".to_string() })
        );
        assert!(config_from(&[("MAX_CONNECTIONS", "0")]).is_err());
        let too_many = (Semaphore::MAX_PERMITS + 1).to_string();
        assert!(config_from(&[("MAX_CONNECTIONS", too_many.as_str())]).is_err());
    }
}
