//! Heartbeat ping.

use async_trait::async_trait;
use reqwest::Client;

use crate::error::Result;
use crate::models::HealthConfig;
use crate::services::HealthProbe;
use crate::utils::http;

/// Sends a GET to a heartbeat URL.
pub struct HttpHealthProbe {
    client: Client,
    url: String,
}

impl HttpHealthProbe {
    /// Build a probe if a URL is configured.
    pub fn from_config(config: &HealthConfig) -> Result<Option<Self>> {
        let Some(url) = config.url.as_ref() else {
            return Ok(None);
        };
        let client = http::create_client("boostwatch", config.timeout_secs)?;
        Ok(Some(Self {
            client,
            url: url.clone(),
        }))
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn ping(&self) -> Result<()> {
        self.client.get(&self.url).send().await?.error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_url_no_probe() {
        let probe = HttpHealthProbe::from_config(&HealthConfig::default()).unwrap();
        assert!(probe.is_none());
    }

    #[test]
    fn test_url_builds_probe() {
        let config = HealthConfig {
            url: Some("https://hc.example.com/ping/abc".into()),
            timeout_secs: 5,
        };
        let probe = HttpHealthProbe::from_config(&config).unwrap().unwrap();
        assert_eq!(probe.url, "https://hc.example.com/ping/abc");
    }
}
