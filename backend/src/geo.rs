use geo_types::Coord;

use crate::error::PolylineError;
use crate::models::Coordinate;

const EARTH_RADIUS_KM: f64 = 6_371.0;
const POLYLINE_PRECISION: u32 = 5;

pub fn approximate_distance_km(path: &[Coordinate]) -> f64 {
    path.windows(2).map(|w| haversine_km(w[0], w[1])).sum()
}

pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();

    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    2.0 * EARTH_RADIUS_KM * h.min(1.0).sqrt().asin()
}

/// Decode an encoded polyline (precision 5, as OSRM returns with
/// `geometries=polyline`).
pub fn decode_polyline(encoded: &str) -> Result<Vec<Coordinate>, PolylineError> {
    let line = polyline::decode_polyline(encoded, POLYLINE_PRECISION)
        .map_err(|err| PolylineError::Invalid(err.to_string()))?;
    Ok(line
        .into_points()
        .into_iter()
        .map(|point| Coordinate::new(point.y(), point.x()))
        .collect())
}

pub fn encode_polyline(points: &[Coordinate]) -> Result<String, PolylineError> {
    let coords = points.iter().map(|c| Coord { x: c.lon, y: c.lat });
    polyline::encode_coordinates(coords, POLYLINE_PRECISION)
        .map_err(|err| PolylineError::Invalid(err.to_string()))
}

/// Distance in metres from the first point to every point of the path.
pub fn cumulative_distances(points: &[Coordinate]) -> Vec<f64> {
    let mut cum = Vec::with_capacity(points.len());
    if points.is_empty() {
        return cum;
    }
    cum.push(0.0);
    for pair in points.windows(2) {
        let last = cum[cum.len() - 1];
        cum.push(last + haversine_km(pair[0], pair[1]) * 1000.0);
    }
    cum
}

/// Pick `count` evenly spaced points along a route.
///
/// Target `i` sits at `total_m * (i + 1) / (count + 1)`; the first point whose
/// cumulative distance reaches the target is returned with that distance.
/// Targets past the end of the path produce nothing.
pub fn sample_route(
    points: &[Coordinate],
    cum: &[f64],
    total_m: f64,
    count: usize,
) -> Vec<(Coordinate, f64)> {
    (0..count)
        .map(|i| total_m * (i + 1) as f64 / (count + 1) as f64)
        .filter_map(|target| {
            cum.iter()
                .zip(points)
                .find(|(cd, _)| **cd >= target)
                .map(|(cd, point)| (*point, *cd))
        })
        .collect()
}
