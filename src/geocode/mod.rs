//! Address lookups against a Nominatim-compatible geocoder.
//!
//! Calls are spaced at least `min_delay_ms` apart.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;

use crate::config::GeocoderConfig;

const MAX_ATTEMPTS: u32 = 2;

/// A resolved location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeHit {
    pub lat: f64,
    pub lon: f64,
    pub display_name: String,
}

/// Nominatim returns coordinates as strings
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    display_name: String,
}

/// Rate-limited forward and reverse geocoder
pub struct Geocoder {
    client: Client,
    base_url: Url,
    min_delay: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl Geocoder {
    pub fn new(config: &GeocoderConfig) -> Result<Self> {
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }

        Ok(Self {
            client: Client::builder()
                .user_agent(config.user_agent.as_str())
                .timeout(Duration::from_secs(10))
                .build()
                .context("Failed to create HTTP client")?,
            base_url: Url::parse(&base).context("Invalid geocoder base URL")?,
            min_delay: Duration::from_millis(config.min_delay_ms),
            last_call: Mutex::new(None),
        })
    }

    /// Resolve an address to coordinates
    pub async fn forward(&self, address: &str) -> Result<Option<GeocodeHit>> {
        let mut url = self.base_url.join("search")?;
        url.query_pairs_mut()
            .append_pair("q", address)
            .append_pair("format", "jsonv2")
            .append_pair("limit", "1");

        let body = match self.get(url).await? {
            Some(body) => body,
            None => return Ok(None),
        };
        parse_search_response(&body)
    }

    /// Describe the place at a coordinate pair
    pub async fn reverse(&self, lat: f64, lon: f64) -> Result<Option<GeocodeHit>> {
        let mut url = self.base_url.join("reverse")?;
        url.query_pairs_mut()
            .append_pair("lat", &lat.to_string())
            .append_pair("lon", &lon.to_string())
            .append_pair("format", "jsonv2")
            .append_pair("accept-language", "en");

        let body = match self.get(url).await? {
            Some(body) => body,
            None => return Ok(None),
        };
        parse_reverse_response(&body, lat, lon)
    }

    /// Wait until the minimum delay since the previous call has passed
    async fn throttle(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(last) = *last_call {
            let elapsed = last.elapsed();
            if elapsed < self.min_delay {
                tokio::time::sleep(self.min_delay - elapsed).await;
            }
        }
        *last_call = Some(Instant::now());
    }

    async fn get(&self, url: Url) -> Result<Option<String>> {
        let mut attempts = 0;

        loop {
            attempts += 1;
            self.throttle().await;
            debug!("Geocoder request: {}", url);

            let response = match self.client.get(url.clone()).send().await {
                Ok(r) => r,
                Err(e) if attempts < MAX_ATTEMPTS => {
                    warn!(
                        "Geocoder request failed (attempt {}/{}): {}",
                        attempts, MAX_ATTEMPTS, e
                    );
                    continue;
                }
                Err(e) => return Err(e).context("Geocoder request failed"),
            };

            let status = response.status();
            if status.is_server_error() && attempts < MAX_ATTEMPTS {
                warn!(
                    "Geocoder returned {} (attempt {}/{})",
                    status, attempts, MAX_ATTEMPTS
                );
                continue;
            }
            if !status.is_success() {
                warn!("Geocoder returned {}", status);
                return Ok(None);
            }

            return Ok(Some(response.text().await?));
        }
    }
}

fn into_hit(place: NominatimPlace) -> Option<GeocodeHit> {
    Some(GeocodeHit {
        lat: place.lat.trim().parse().ok()?,
        lon: place.lon.trim().parse().ok()?,
        display_name: place.display_name,
    })
}

/// First hit of a `/search` response, if any
fn parse_search_response(body: &str) -> Result<Option<GeocodeHit>> {
    let places: Vec<NominatimPlace> =
        serde_json::from_str(body).context("Failed to parse geocoder search response")?;
    Ok(places.into_iter().next().and_then(into_hit))
}

/// A `/reverse` response; misses come back as `{"error": ...}`.
///
/// The hit keeps the queried coordinates rather than the matched feature's.
fn parse_reverse_response(body: &str, lat: f64, lon: f64) -> Result<Option<GeocodeHit>> {
    let value: serde_json::Value =
        serde_json::from_str(body).context("Failed to parse geocoder reverse response")?;
    if value.get("error").is_some() {
        return Ok(None);
    }

    Ok(value["display_name"].as_str().map(|name| GeocodeHit {
        lat,
        lon,
        display_name: name.to_string(),
    }))
}
