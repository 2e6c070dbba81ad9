use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub const QUERY_VALID: &str = "Query is valid.";
pub const QUERY_INVALID: &str = "Query is invalid or couldn't be parsed correctly.";

const POPUP_EXCERPT_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }

    pub fn as_pair(&self) -> [f64; 2] {
        [self.lat, self.lon]
    }
}

impl From<[f64; 2]> for Coordinate {
    fn from([lat, lon]: [f64; 2]) -> Self {
        Self { lat, lon }
    }
}

/// Model used to turn the free-text query into a start and an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ModelKind {
    #[default]
    #[serde(rename = "t-5")]
    T5,
    #[serde(rename = "gemini")]
    Gemini,
    #[serde(rename = "rules")]
    Rules,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::T5 => "t-5",
            ModelKind::Gemini => "gemini",
            ModelKind::Rules => "rules",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "t-5" | "t5" => Ok(ModelKind::T5),
            "gemini" => Ok(ModelKind::Gemini),
            "rules" => Ok(ModelKind::Rules),
            other => Err(format!("unknown model '{other}'")),
        }
    }
}

/// A point sampled on the direct route: `[lat, lon]` and the distance in
/// metres travelled from the start to reach it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint(pub [f64; 2], pub f64);

impl SamplePoint {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::from(self.0)
    }

    pub fn cum_dist(&self) -> f64 {
        self.1
    }
}

/// Resolved start and end of a query plus the direct route between them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripOutline {
    pub start: String,
    pub end: String,
    pub start_lat: f64,
    pub start_lon: f64,
    pub end_lat: f64,
    pub end_lon: f64,
    pub points: Vec<[f64; 2]>,
    pub sample_points: Vec<SamplePoint>,
}

impl TripOutline {
    pub fn start_coordinate(&self) -> Coordinate {
        Coordinate::new(self.start_lat, self.start_lon)
    }

    pub fn end_coordinate(&self) -> Coordinate {
        Coordinate::new(self.end_lat, self.end_lon)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub title: String,
    pub lat: f64,
    pub lon: f64,
    pub cum_dist: f64,
    #[serde(default)]
    pub extract: String,
}

impl Stop {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl RouteBounds {
    pub fn from_path(path: &[Coordinate]) -> Option<Self> {
        let first = path.first()?;
        let seed = RouteBounds {
            min_lat: first.lat,
            max_lat: first.lat,
            min_lon: first.lon,
            max_lon: first.lon,
        };
        Some(path.iter().skip(1).fold(seed, |acc, c| RouteBounds {
            min_lat: acc.min_lat.min(c.lat),
            max_lat: acc.max_lat.max(c.lat),
            min_lon: acc.min_lon.min(c.lon),
            max_lon: acc.max_lon.max(c.lon),
        }))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripPlan {
    pub outline: TripOutline,
    pub stops: Vec<Stop>,
    pub route: Vec<Coordinate>,
    pub itinerary: Vec<String>,
    pub distance_km: f64,
    pub duration_min: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<RouteBounds>,
    #[serde(default)]
    pub gpx_base64: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
}

/// Text shown in a stop's map popup.
pub fn popup_excerpt(extract: &str) -> String {
    let head: String = extract.chars().take(POPUP_EXCERPT_CHARS).collect();
    format!("{head}...")
}
