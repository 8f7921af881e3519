use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub from_email: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests need not touch the
    /// process environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = match get("WALL_PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("WALL_PORT must be a port number, got '{raw}'"))?,
            None => 8000,
        };

        Ok(Self {
            db_path: get("WALL_DB_PATH").unwrap_or_else(|| "wall.db".into()).into(),
            host: get("WALL_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            from_email: get("WALL_FROM_EMAIL").unwrap_or_else(|| "webmaster@localhost".into()),
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .with_context(|| format!("invalid listen address '{addr}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.db_path, PathBuf::from("wall.db"));
        assert_eq!(config.port, 8000);
        assert_eq!(config.from_email, "webmaster@localhost");
        assert_eq!(config.addr().unwrap(), "0.0.0.0:8000".parse().unwrap());
    }

    #[test]
    fn overrides() {
        let config = Config::from_lookup(lookup(&[
            ("WALL_DB_PATH", "/tmp/w.db"),
            ("WALL_HOST", "127.0.0.1"),
            ("WALL_PORT", "9001"),
            ("WALL_FROM_EMAIL", "noreply@wall.test"),
        ]))
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/w.db"));
        assert_eq!(config.addr().unwrap(), "127.0.0.1:9001".parse().unwrap());
        assert_eq!(config.from_email, "noreply@wall.test");
    }

    #[test]
    fn bad_port_is_an_error() {
        assert!(Config::from_lookup(lookup(&[("WALL_PORT", "eighty")])).is_err());
        let config = Config::from_lookup(lookup(&[("WALL_HOST", "not a host")])).unwrap();
        assert!(config.addr().is_err());
    }
}
