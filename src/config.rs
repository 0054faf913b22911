//! Environment-driven service configuration.
//!
//! Every knob has a documented default; an unparsable value is a startup
//! error, never a silent fallback.

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_LISTEN_PORT: u16 = 3000;
const DEFAULT_METRICS_PATH: &str = "/metrics";
const DEFAULT_COLLECT_INTERVAL_SECS: u64 = 15;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 5;
const DEFAULT_WORKER_LIMIT: usize = 8;
const DEFAULT_RUNTIME_SOCKET: &str = "/var/run/docker.sock";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid value `{value}` for `{name}`: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Service configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// `LISTEN_PORT`, default 3000. The server binds `0.0.0.0`.
    pub listen_port: u16,
    /// `METRICS_PATH`, default `/metrics`.
    pub metrics_path: String,
    /// `COLLECT_INTERVAL_SECS`, default 15. Also the cycle deadline.
    pub collect_interval: Duration,
    /// `FETCH_TIMEOUT_SECS`, default 5. Budget per runtime call.
    pub fetch_timeout: Duration,
    /// `WORKER_LIMIT`, default 8. Max concurrent per-container fetches.
    pub worker_limit: usize,
    /// `RUNTIME_SOCKET_PATH`, default `/var/run/docker.sock`.
    pub runtime_socket_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let listen_port = parse_or("LISTEN_PORT", &lookup, DEFAULT_LISTEN_PORT)?;
        let metrics_path =
            lookup("METRICS_PATH").unwrap_or_else(|| DEFAULT_METRICS_PATH.to_owned());
        if !metrics_path.starts_with('/') {
            return Err(Error::Invalid {
                name: "METRICS_PATH",
                value: metrics_path,
                reason: "must start with `/`".to_owned(),
            });
        }

        let interval_secs: u64 =
            parse_or("COLLECT_INTERVAL_SECS", &lookup, DEFAULT_COLLECT_INTERVAL_SECS)?;
        if interval_secs == 0 {
            return Err(Error::Invalid {
                name: "COLLECT_INTERVAL_SECS",
                value: interval_secs.to_string(),
                reason: "must be at least 1".to_owned(),
            });
        }

        let timeout_secs: u64 = parse_or("FETCH_TIMEOUT_SECS", &lookup, DEFAULT_FETCH_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(Error::Invalid {
                name: "FETCH_TIMEOUT_SECS",
                value: timeout_secs.to_string(),
                reason: "must be at least 1".to_owned(),
            });
        }

        let worker_limit: usize = parse_or("WORKER_LIMIT", &lookup, DEFAULT_WORKER_LIMIT)?;
        if worker_limit == 0 {
            return Err(Error::Invalid {
                name: "WORKER_LIMIT",
                value: worker_limit.to_string(),
                reason: "must be at least 1".to_owned(),
            });
        }

        let runtime_socket_path = lookup("RUNTIME_SOCKET_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RUNTIME_SOCKET));

        Ok(Self {
            listen_port,
            metrics_path,
            collect_interval: Duration::from_secs(interval_secs),
            fetch_timeout: Duration::from_secs(timeout_secs),
            worker_limit,
            runtime_socket_path,
        })
    }
}

fn parse_or<T>(
    name: &'static str,
    lookup: impl Fn(&str) -> Option<String>,
    default: T,
) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|err: T::Err| Error::Invalid {
            name,
            value: raw,
            reason: err.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| {
            pairs
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value).to_owned())
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.listen_port, 3000);
        assert_eq!(config.metrics_path, "/metrics");
        assert_eq!(config.collect_interval, Duration::from_secs(15));
        assert_eq!(config.fetch_timeout, Duration::from_secs(5));
        assert_eq!(config.worker_limit, 8);
        assert_eq!(
            config.runtime_socket_path,
            PathBuf::from("/var/run/docker.sock")
        );
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("LISTEN_PORT", "9100"),
            ("METRICS_PATH", "/scrape"),
            ("COLLECT_INTERVAL_SECS", "30"),
            ("FETCH_TIMEOUT_SECS", "2"),
            ("WORKER_LIMIT", "4"),
            ("RUNTIME_SOCKET_PATH", "/run/containerd/containerd.sock"),
        ]))
        .unwrap();
        assert_eq!(config.listen_port, 9100);
        assert_eq!(config.metrics_path, "/scrape");
        assert_eq!(config.collect_interval, Duration::from_secs(30));
        assert_eq!(config.fetch_timeout, Duration::from_secs(2));
        assert_eq!(config.worker_limit, 4);
    }

    #[test]
    fn test_rejects_unparsable_port() {
        let err = Config::from_lookup(lookup_from(&[("LISTEN_PORT", "not-a-port")])).unwrap_err();
        let Error::Invalid { name, value, .. } = err;
        assert_eq!(name, "LISTEN_PORT");
        assert_eq!(value, "not-a-port");
    }

    #[test]
    fn test_rejects_zero_interval() {
        assert!(Config::from_lookup(lookup_from(&[("COLLECT_INTERVAL_SECS", "0")])).is_err());
    }

    #[test]
    fn test_rejects_zero_workers() {
        assert!(Config::from_lookup(lookup_from(&[("WORKER_LIMIT", "0")])).is_err());
    }

    #[test]
    fn test_rejects_relative_metrics_path() {
        assert!(Config::from_lookup(lookup_from(&[("METRICS_PATH", "metrics")])).is_err());
    }
}
