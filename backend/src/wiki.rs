use std::{num::NonZeroUsize, sync::Mutex};

use futures::future::join_all;
use lru::LruCache;
use serde::Deserialize;

use crate::error::UpstreamError;
use crate::models::Coordinate;

const SERVICE: &str = "wikipedia";

pub const NO_SUMMARY: &str = "No summary available.";

/// Candidates whose title contains one of these get a large bonus.
pub const TOURIST_KEYWORDS: [&str; 11] = [
    "park", "museum", "shrine", "monument", "fort", "tomb", "temple", "mosque", "holy", "ancient",
    "historic",
];
const KEYWORD_BONUS: usize = 1000;
/// Best candidate must score above this to be kept.
const MIN_PLACE_SCORE: usize = 50;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeoPlace {
    pub title: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub dist: f64,
}

#[derive(Debug, Deserialize)]
struct GeoSearchResponse {
    #[serde(default)]
    query: Option<GeoSearchQuery>,
}

#[derive(Debug, Deserialize)]
struct GeoSearchQuery {
    #[serde(default)]
    geosearch: Vec<GeoPlace>,
}

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    #[serde(default)]
    extract: Option<String>,
}

pub fn score_place(title: &str, summary: &str) -> usize {
    let title = title.to_lowercase();
    let bonus = if TOURIST_KEYWORDS.iter().any(|kw| title.contains(kw)) {
        KEYWORD_BONUS
    } else {
        0
    };
    summary.chars().count() + bonus
}

/// Highest scoring candidate, ties going to the later one, if it clears the
/// quality threshold.
pub fn best_place(scored: Vec<(GeoPlace, usize)>) -> Option<GeoPlace> {
    let (place, score) = scored.into_iter().max_by_key(|(_, score)| *score)?;
    (score > MIN_PLACE_SCORE).then_some(place)
}

pub struct WikiClient {
    http: reqwest::Client,
    base_url: String,
    radius_m: u32,
    limit: u32,
    summaries: Mutex<LruCache<String, String>>,
}

impl WikiClient {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        radius_m: u32,
        limit: u32,
        cache_size: usize,
    ) -> Self {
        let capacity = NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            radius_m,
            limit,
            summaries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Lead paragraph of an article, or [`NO_SUMMARY`] when it cannot be had.
    pub async fn summary(&self, title: &str) -> String {
        if let Some(cached) = self.cached_summary(title) {
            return cached;
        }

        match self.fetch_summary(title).await {
            Ok(extract) => {
                let extract = extract
                    .filter(|e| !e.is_empty())
                    .unwrap_or_else(|| NO_SUMMARY.to_string());
                if let Ok(mut cache) = self.summaries.lock() {
                    cache.put(title.to_string(), extract.clone());
                }
                extract
            }
            Err(err) => {
                tracing::warn!("summary failed for '{title}': {err}");
                NO_SUMMARY.to_string()
            }
        }
    }

    fn cached_summary(&self, title: &str) -> Option<String> {
        self.summaries.lock().ok()?.get(title).cloned()
    }

    async fn fetch_summary(&self, title: &str) -> Result<Option<String>, UpstreamError> {
        let url = format!(
            "{}/api/rest_v1/page/summary/{}",
            self.base_url,
            urlencoding::encode(title)
        );
        let response = self
            .http
            .get(url)
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
        let body: SummaryResponse = response.json().await.map_err(UpstreamError::http(SERVICE))?;
        Ok(body.extract)
    }

    /// Articles geotagged near `coord`.
    pub async fn geosearch(&self, coord: Coordinate) -> Result<Vec<GeoPlace>, UpstreamError> {
        let gscoord = format!("{}|{}", coord.lat, coord.lon);
        let radius = self.radius_m.to_string();
        let limit = self.limit.to_string();
        let response = self
            .http
            .get(format!("{}/w/api.php", self.base_url))
            .query(&[
                ("action", "query"),
                ("list", "geosearch"),
                ("gscoord", gscoord.as_str()),
                ("gsradius", radius.as_str()),
                ("gslimit", limit.as_str()),
                ("format", "json"),
            ])
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
        let body: GeoSearchResponse = response.json().await.map_err(UpstreamError::http(SERVICE))?;
        Ok(body.query.map(|q| q.geosearch).unwrap_or_default())
    }

    /// Most notable landmark near `coord`, if any is good enough.
    pub async fn tourist_place(&self, coord: Coordinate) -> Option<GeoPlace> {
        let places = match self.geosearch(coord).await {
            Ok(places) => places,
            Err(err) => {
                tracing::warn!("geosearch failed for ({}, {}): {err}", coord.lat, coord.lon);
                return None;
            }
        };
        if places.is_empty() {
            return None;
        }

        let scored = join_all(places.into_iter().map(|place| async move {
            let summary = self.summary(&place.title).await;
            let score = score_place(&place.title, &summary);
            (place, score)
        }))
        .await;

        let best = best_place(scored);
        match &best {
            Some(place) => {
                tracing::debug!(
                    "picked '{}' {:.0} m from ({}, {})",
                    place.title,
                    place.dist,
                    coord.lat,
                    coord.lon
                )
            }
            None => tracing::debug!("no notable place near ({}, {})", coord.lat, coord.lon),
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(title: &str) -> GeoPlace {
        GeoPlace {
            title: title.to_string(),
            lat: 0.0,
            lon: 0.0,
            dist: 0.0,
        }
    }

    #[test]
    fn score_is_summary_length_in_characters() {
        assert_eq!(score_place("Anarkali Bazaar", "abcdé"), 5);
    }

    #[test]
    fn keyword_in_title_adds_bonus_case_insensitively() {
        assert_eq!(score_place("Lahore FORT", "abc"), 1003);
        assert_eq!(score_place("Badshahi Mosque", ""), 1000);
        // keywords match inside words too
        assert_eq!(score_place("Parkview Tower", ""), 1000);
    }

    #[test]
    fn best_place_prefers_highest_score() {
        let best = best_place(vec![(place("a"), 60), (place("b"), 1200), (place("c"), 90)]);
        assert_eq!(best.unwrap().title, "b");
    }

    #[test]
    fn best_place_ties_go_to_later_candidate() {
        let best = best_place(vec![(place("first"), 300), (place("second"), 300)]);
        assert_eq!(best.unwrap().title, "second");
    }

    #[test]
    fn best_place_requires_score_above_threshold() {
        assert!(best_place(vec![(place("a"), 50), (place("b"), 21)]).is_none());
        assert!(best_place(vec![(place("a"), 51)]).is_some());
        assert!(best_place(Vec::new()).is_none());
    }

    #[test]
    fn missing_query_block_means_no_candidates() {
        let body: GeoSearchResponse =
            serde_json::from_str(r#"{"batchcomplete":"","error":{"code":"badcoord"}}"#).unwrap();
        assert!(body.query.is_none());
    }

    #[tokio::test]
    async fn unreachable_service_degrades_to_placeholder_summary() {
        let client = WikiClient::new(reqwest::Client::new(), "http://127.0.0.1:9", 10_000, 10, 4);
        assert_eq!(client.summary("Lahore Fort").await, NO_SUMMARY);
        assert!(client.tourist_place(Coordinate::new(31.5, 74.3)).await.is_none());
    }
}
