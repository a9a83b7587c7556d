//! Connectivity check against the app store's API host.
//!
//! Hostname pinning is done per client through [`reqwest::ClientBuilder::resolve`],
//! so nothing outside the probe's own client is affected.

use crate::core::config::StoreConfig;
use crate::core::ProbeError;
use serde::Serialize;
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};
use tracing::{debug, info};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub url: String,
    pub pinned_addr: Option<IpAddr>,
    pub status: u16,
    pub first_chunk_len: Option<usize>,
    pub elapsed_ms: u128,
}

pub struct StoreProbe {
    client: reqwest::Client,
    config: StoreConfig,
    base_url: String,
    pinned_addr: Option<IpAddr>,
}

/// Parses the configured override address, if any.
pub fn resolve_override(config: &StoreConfig) -> Result<Option<IpAddr>, ProbeError> {
    config
        .resolve_addr
        .as_deref()
        .map(|raw| {
            raw.trim()
                .parse::<IpAddr>()
                .map_err(|_| ProbeError::BadOverride(raw.to_string()))
        })
        .transpose()
}

impl StoreProbe {
    pub fn new(config: StoreConfig) -> Result<Self, ProbeError> {
        let pinned_addr = resolve_override(&config)?;
        let mut builder = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("apkpull/", env!("CARGO_PKG_VERSION")));
        if let Some(ip) = pinned_addr {
            debug!("pinning {} to {}", config.host, ip);
            // Port 0 defers to the URL's port.
            builder = builder
                .resolve(&config.host, SocketAddr::new(ip, 0))
                .no_proxy();
        }
        Ok(Self {
            client: builder.build()?,
            base_url: format!("https://{}", config.host),
            config,
            pinned_addr,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn details_url(&self) -> String {
        format!(
            "{}/fdfe/details?doc={}",
            self.base_url.trim_end_matches('/'),
            self.config.package_id
        )
    }

    pub async fn run(&self) -> Result<ProbeReport, ProbeError> {
        let url = self.details_url();
        info!("requesting {}", url);
        let started = Instant::now();

        let mut req = self
            .client
            .get(&url)
            .header("Accept-Language", self.config.locale.replace('_', "-"));
        if let Some(gsf_id) = &self.config.gsf_id {
            req = req.header("X-DFE-Device-Id", gsf_id);
        }
        let mut resp = req.send().await?;
        let status = resp.status().as_u16();
        let first_chunk_len = resp.chunk().await?.map(|c| c.len());

        Ok(ProbeReport {
            url,
            pinned_addr: self.pinned_addr,
            status,
            first_chunk_len,
            elapsed_ms: started.elapsed().as_millis(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn store(resolve_addr: Option<&str>) -> StoreConfig {
        StoreConfig {
            host: "store.invalid".to_string(),
            resolve_addr: resolve_addr.map(str::to_string),
            gsf_id: Some("3f1a".to_string()),
            ..StoreConfig::default()
        }
    }

    #[test]
    fn parses_override_addresses() {
        assert_eq!(resolve_override(&store(None)).unwrap(), None);
        assert_eq!(
            resolve_override(&store(Some("142.251.222.110"))).unwrap(),
            Some("142.251.222.110".parse().unwrap())
        );
        assert!(resolve_override(&store(Some("::1"))).unwrap().is_some());
        assert!(matches!(
            resolve_override(&store(Some("not-an-ip"))),
            Err(ProbeError::BadOverride(_))
        ));
    }

    #[test]
    fn details_url_names_the_package() {
        let probe = StoreProbe::new(store(None)).unwrap();
        assert_eq!(
            probe.details_url(),
            "https://store.invalid/fdfe/details?doc=com.google.android.keep"
        );
    }

    #[tokio::test]
    async fn pinned_host_reaches_override_address() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = sock.read(&mut buf).await.unwrap();
            sock.write_all(
                b"HTTP/1.1 401 Unauthorized\r\nContent-Length: 5\r\nConnection: close\r\n\r\nnope!",
            )
            .await
            .unwrap();
            String::from_utf8_lossy(&buf[..n]).to_string()
        });

        let probe = StoreProbe::new(store(Some("127.0.0.1")))
            .unwrap()
            .with_base_url(format!("http://store.invalid:{port}"));
        let report = probe.run().await.unwrap();
        let request = server.await.unwrap().to_lowercase();

        assert_eq!(report.status, 401);
        assert_eq!(report.first_chunk_len, Some(5));
        assert_eq!(report.pinned_addr, Some("127.0.0.1".parse().unwrap()));
        assert!(request.contains(&format!("host: store.invalid:{port}")));
        assert!(request.contains("x-dfe-device-id: 3f1a"));
        assert!(request.contains("accept-language: en-us"));
    }
}
