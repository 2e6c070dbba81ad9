use std::{
    collections::HashSet,
    time::{Duration, Instant},
};

use crate::config::PlannerSettings;
use crate::error::{PlanError, QueryError, RouteError};
use crate::geo::{approximate_distance_km, cumulative_distances, decode_polyline, sample_route};
use crate::geocode::{Geocoder, Place};
use crate::gpx_export::encode_trip_as_gpx;
use crate::itinerary::build_itinerary;
use crate::models::{Coordinate, ModelKind, RouteBounds, SamplePoint, Stop, TripOutline, TripPlan};
use crate::osrm::OsrmClient;
use crate::query::QueryInterpreter;
use crate::wiki::WikiClient;

/// Runs a travel query through every upstream service in turn.
pub struct Planner {
    interpreter: QueryInterpreter,
    geocoder: Geocoder,
    osrm: OsrmClient,
    wiki: WikiClient,
    poi_delay: Duration,
    geocode_interval: Duration,
    sample_count: usize,
}

impl Planner {
    pub fn new(settings: &PlannerSettings) -> reqwest::Result<Self> {
        let http = settings.http_client()?;
        Ok(Self {
            interpreter: QueryInterpreter::new(http.clone(), settings),
            geocoder: Geocoder::new(
                http.clone(),
                &settings.geocode_url,
                &settings.geocode_api_key,
            ),
            osrm: OsrmClient::new(http.clone(), &settings.osrm_url, &settings.osrm_profile),
            wiki: WikiClient::new(
                http,
                &settings.wiki_url,
                settings.search_radius_m,
                settings.search_limit,
                settings.summary_cache_size,
            ),
            poi_delay: settings.poi_delay,
            geocode_interval: settings.geocode_interval,
            sample_count: settings.sample_count,
        })
    }

    /// Resolve the query's start and end and sample the direct route between
    /// them.
    pub async fn outline(&self, query: &str, model: ModelKind) -> Result<TripOutline, PlanError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PlanError::InvalidQuery);
        }

        let intent = match self.interpreter.interpret(query, model).await {
            Ok(intent) => intent,
            Err(err @ (QueryError::Unparseable { .. } | QueryError::MissingField(_))) => {
                tracing::warn!("query rejected: {err}");
                return Err(PlanError::InvalidQuery);
            }
            Err(err) => return Err(err.into()),
        };
        tracing::info!("{model} read trip {:?} -> {:?}", intent.start, intent.end);

        let started = Instant::now();
        let start = self.geocode(&intent.start).await?;
        pause(self.geocode_interval.saturating_sub(started.elapsed())).await;
        let end = self.geocode(&intent.end).await?;
        let (Some(start), Some(end)) = (start, end) else {
            return Err(PlanError::InvalidQuery);
        };

        let direct = self
            .osrm
            .route(&[start.coordinate(), end.coordinate()])
            .await?;
        let points = decode_polyline(&direct.geometry).map_err(RouteError::from)?;
        let cum = cumulative_distances(&points);
        let samples = sample_route(&points, &cum, direct.distance, self.sample_count);
        tracing::info!(
            "direct route {:.1} km ({:.1} km along the polyline), {} points, {} samples",
            direct.distance / 1000.0,
            approximate_distance_km(&points),
            points.len(),
            samples.len()
        );

        Ok(TripOutline {
            start: start.display_name,
            end: end.display_name,
            start_lat: start.lat,
            start_lon: start.lon,
            end_lat: end.lat,
            end_lon: end.lon,
            points: points.iter().map(Coordinate::as_pair).collect(),
            sample_points: samples
                .into_iter()
                .map(|(point, cum_dist)| SamplePoint(point.as_pair(), cum_dist))
                .collect(),
        })
    }

    /// Full plan: outline, landmarks along the way, a route through them and
    /// the itinerary.
    pub async fn plan(&self, query: &str, model: ModelKind) -> Result<TripPlan, PlanError> {
        let outline = self.outline(query, model).await?;

        let mut stops = self.collect_stops(&outline.sample_points).await;
        stops.sort_by(|a, b| a.cum_dist.total_cmp(&b.cum_dist));
        tracing::info!("{} stops selected", stops.len());

        let waypoints: Vec<Coordinate> = std::iter::once(outline.start_coordinate())
            .chain(stops.iter().map(Stop::coordinate))
            .chain(std::iter::once(outline.end_coordinate()))
            .collect();
        let route = self.osrm.route(&waypoints).await?;
        let path = decode_polyline(&route.geometry).map_err(RouteError::from)?;

        for stop in &mut stops {
            stop.extract = self.wiki.summary(&stop.title).await;
            pause(self.poi_delay).await;
        }

        let itinerary = build_itinerary(&outline.start, &outline.end, &route.legs, &stops);
        let mut plan = TripPlan {
            bounds: RouteBounds::from_path(&path),
            outline,
            stops,
            route: path,
            itinerary,
            distance_km: route.distance / 1000.0,
            duration_min: route.duration / 60.0,
            gpx_base64: String::new(),
        };
        plan.gpx_base64 = encode_trip_as_gpx(&plan)?;

        tracing::info!(
            "plan ready: {:.1} km, {} itinerary lines",
            plan.distance_km,
            plan.itinerary.len()
        );
        Ok(plan)
    }

    /// One landmark per sample point at most, never the same article twice.
    async fn collect_stops(&self, samples: &[SamplePoint]) -> Vec<Stop> {
        let mut stops = Vec::new();
        let mut seen = HashSet::new();

        for sample in samples {
            if let Some(place) = self.wiki.tourist_place(sample.coordinate()).await {
                if seen.insert(place.title.clone()) {
                    stops.push(Stop {
                        title: place.title,
                        lat: place.lat,
                        lon: place.lon,
                        cum_dist: sample.cum_dist(),
                        extract: String::new(),
                    });
                }
            }
            pause(self.poi_delay).await;
        }

        stops
    }

    async fn geocode(&self, address: &str) -> Result<Option<Place>, PlanError> {
        self.geocoder
            .geocode(address)
            .await
            .map_err(PlanError::Geocode)
    }
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
