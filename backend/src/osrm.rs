use serde::Deserialize;

use crate::error::{RouteError, UpstreamError};
use crate::models::Coordinate;

const SERVICE: &str = "osrm";

#[derive(Debug, Clone, Deserialize)]
pub struct OsrmResponse {
    pub code: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub routes: Vec<OsrmRoute>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsrmRoute {
    pub geometry: String,
    /// Metres
    pub distance: f64,
    /// Seconds
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub legs: Vec<OsrmLeg>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OsrmLeg {
    #[serde(default)]
    pub steps: Vec<OsrmStep>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OsrmStep {
    #[serde(default)]
    pub name: String,
    pub maneuver: OsrmManeuver,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OsrmManeuver {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub modifier: Option<String>,
}

/// `lon,lat;lon,lat;...` as OSRM expects coordinates in its path.
pub fn waypoint_string(points: &[Coordinate]) -> String {
    points
        .iter()
        .map(|c| format!("{},{}", c.lon, c.lat))
        .collect::<Vec<_>>()
        .join(";")
}

pub struct OsrmClient {
    http: reqwest::Client,
    base_url: String,
    profile: String,
}

impl OsrmClient {
    pub fn new(http: reqwest::Client, base_url: &str, profile: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            profile: profile.to_string(),
        }
    }

    /// Turn-by-turn route visiting `points` in order.
    pub async fn route(&self, points: &[Coordinate]) -> Result<OsrmRoute, RouteError> {
        if points.len() < 2 {
            return Err(RouteError::TooFewWaypoints(points.len()));
        }

        let url = format!(
            "{}/route/v1/{}/{}",
            self.base_url,
            self.profile,
            waypoint_string(points)
        );
        tracing::debug!("OSRM route through {} waypoints", points.len());

        let response = self
            .http
            .get(&url)
            .query(&[
                ("steps", "true"),
                ("geometries", "polyline"),
                ("overview", "full"),
            ])
            .send()
            .await
            .map_err(UpstreamError::http(SERVICE))?;

        // OSRM reports NoRoute/NoSegment with a 400 and a JSON body
        let status = response.status();
        let body: OsrmResponse = match response.json().await {
            Ok(body) => body,
            Err(_) if !status.is_success() => {
                return Err(UpstreamError::Status {
                    service: SERVICE,
                    status,
                }
                .into());
            }
            Err(err) => return Err(UpstreamError::http(SERVICE)(err).into()),
        };

        first_route(body)
    }
}

fn first_route(body: OsrmResponse) -> Result<OsrmRoute, RouteError> {
    if body.code != "Ok" {
        tracing::warn!(
            "OSRM answered {}: {}",
            body.code,
            body.message.as_deref().unwrap_or("no message")
        );
        return Err(RouteError::NoRoute);
    }
    body.routes.into_iter().next().ok_or(RouteError::NoRoute)
}
