use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

const DEFAULT_ADB_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub adb_path: PathBuf,
    pub adb_serial: Option<String>,
    /// Upper bound for a single adb invocation. `None` waits forever.
    pub adb_timeout_secs: Option<u64>,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub host: String,
    pub resolve_addr: Option<String>,
    pub email: Option<String>,
    pub gsf_id: Option<String>,
    pub package_id: String,
    pub locale: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            adb_path: PathBuf::from("adb"),
            adb_serial: None,
            adb_timeout_secs: Some(DEFAULT_ADB_TIMEOUT_SECS),
            store: StoreConfig::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: "android.clients.google.com".to_string(),
            resolve_addr: None,
            email: None,
            gsf_id: None,
            package_id: "com.google.android.keep".to_string(),
            locale: "en_US".to_string(),
        }
    }
}

impl Config {
    /// Loads `.env` (when present) and then reads the process environment.
    pub fn load() -> anyhow::Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut cfg = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = get("APKPULL_HOST") {
            cfg.host = host;
        }
        if let Some(port) = get("APKPULL_PORT") {
            cfg.port = parse_var("APKPULL_PORT", &port)?;
        }
        cfg.adb_path = match get("ADB_PATH") {
            Some(path) => PathBuf::from(path),
            None => which::which("adb").unwrap_or_else(|_| PathBuf::from("adb")),
        };
        cfg.adb_serial = get("ADB_SERIAL");
        if let Some(secs) = get("ADB_TIMEOUT_SECS") {
            let secs: u64 = parse_var("ADB_TIMEOUT_SECS", &secs)?;
            cfg.adb_timeout_secs = (secs > 0).then_some(secs);
        }

        if let Some(host) = get("STORE_HOST") {
            cfg.store.host = host;
        }
        cfg.store.resolve_addr = get("STORE_RESOLVE_ADDR");
        cfg.store.email = get("GOOGLE_EMAIL");
        cfg.store.gsf_id = get("GOOGLE_GSF_ID");
        if let Some(pkg) = get("STORE_PROBE_PACKAGE") {
            cfg.store.package_id = pkg;
        }
        if let Some(locale) = get("STORE_LOCALE") {
            cfg.store.locale = locale;
        }
        Ok(cfg)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T>(key: &str, value: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("invalid value for {key}: {value:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let cfg = load(&[("ADB_PATH", "/opt/adb")]).unwrap();
        assert_eq!(cfg.bind_addr(), "0.0.0.0:5000");
        assert_eq!(cfg.adb_path, PathBuf::from("/opt/adb"));
        assert_eq!(cfg.adb_timeout_secs, Some(DEFAULT_ADB_TIMEOUT_SECS));
        assert_eq!(cfg.store.host, "android.clients.google.com");
        assert!(cfg.store.resolve_addr.is_none());
    }

    #[test]
    fn environment_overrides() {
        let cfg = load(&[
            ("APKPULL_PORT", "8080"),
            ("ADB_SERIAL", "ABC123"),
            ("ADB_TIMEOUT_SECS", "0"),
            ("STORE_RESOLVE_ADDR", "142.251.222.110"),
        ])
        .unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.adb_serial.as_deref(), Some("ABC123"));
        assert_eq!(cfg.adb_timeout_secs, None);
        assert_eq!(cfg.store.resolve_addr.as_deref(), Some("142.251.222.110"));
    }

    #[test]
    fn blank_values_are_ignored() {
        let cfg = load(&[("APKPULL_HOST", "  "), ("ADB_SERIAL", "")]).unwrap();
        assert_eq!(cfg.host, "0.0.0.0");
        assert!(cfg.adb_serial.is_none());
    }

    #[test]
    fn bad_port_is_an_error() {
        let err = load(&[("APKPULL_PORT", "http")]).unwrap_err();
        assert!(err.to_string().contains("APKPULL_PORT"));
    }
}
