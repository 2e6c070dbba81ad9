use serde::Deserialize;

use crate::error::UpstreamError;
use crate::models::Coordinate;

const SERVICE: &str = "geocoder";

#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub lat: f64,
    pub lon: f64,
    pub display_name: String,
}

impl Place {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
}

/// Forward geocoder backed by the maps.co search API.
pub struct Geocoder {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl Geocoder {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// First search hit for `address`, or `None` when nothing matched.
    pub async fn geocode(&self, address: &str) -> Result<Option<Place>, UpstreamError> {
        tracing::debug!("geocoding '{address}'");
        let response = self
            .http
            .get(format!("{}/search", self.base_url))
            .query(&[("q", address), ("api_key", self.api_key.as_str())])
            .send()
            .await
            .map_err(UpstreamError::http(SERVICE))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                service: SERVICE,
                status,
            });
        }

        let hits: Vec<SearchHit> = response.json().await.map_err(UpstreamError::http(SERVICE))?;
        let place = first_place(hits, address)?;
        if place.is_none() {
            tracing::info!("no geocoding result for '{address}'");
        }
        Ok(place)
    }
}

fn first_place(hits: Vec<SearchHit>, address: &str) -> Result<Option<Place>, UpstreamError> {
    let Some(hit) = hits.into_iter().next() else {
        return Ok(None);
    };

    let parse = |value: &str, field: &str| {
        value
            .trim()
            .parse::<f64>()
            .map_err(|_| UpstreamError::Payload {
                service: SERVICE,
                message: format!("{field} '{value}' is not a number"),
            })
    };

    Ok(Some(Place {
        lat: parse(&hit.lat, "lat")?,
        lon: parse(&hit.lon, "lon")?,
        display_name: hit.display_name.unwrap_or_else(|| address.to_string()),
    }))
}
