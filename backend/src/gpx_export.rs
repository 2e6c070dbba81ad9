use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use geo_types::Point;
use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint};

use crate::models::{Coordinate, TripPlan};

/// GPX 1.1 document for a planned trip, base64 encoded: the route as a track
/// and the start, every stop and the end as named waypoints.
pub fn encode_trip_as_gpx(plan: &TripPlan) -> Result<String, gpx::errors::GpxError> {
    let outline = &plan.outline;
    let mut gpx = Gpx {
        version: GpxVersion::Gpx11,
        creator: Some("wayfarer".into()),
        ..Default::default()
    };

    gpx.waypoints
        .push(named_waypoint(outline.start_coordinate(), &outline.start, None));
    for stop in &plan.stops {
        gpx.waypoints.push(named_waypoint(
            stop.coordinate(),
            &stop.title,
            Some(&stop.extract),
        ));
    }
    gpx.waypoints
        .push(named_waypoint(outline.end_coordinate(), &outline.end, None));

    let mut track = Track {
        name: Some(format!("{} to {}", outline.start, outline.end)),
        ..Default::default()
    };
    let mut segment = TrackSegment::new();
    for waypoint in plan.route.iter().map(to_waypoint) {
        segment.points.push(waypoint);
    }
    track.segments.push(segment);
    gpx.tracks.push(track);

    let mut buffer = Vec::new();
    gpx::write(&gpx, &mut buffer)?;
    Ok(BASE64.encode(buffer))
}

fn to_waypoint(coord: &Coordinate) -> Waypoint {
    Waypoint::new(Point::new(coord.lon, coord.lat))
}

fn named_waypoint(coord: Coordinate, name: &str, description: Option<&str>) -> Waypoint {
    let mut waypoint = to_waypoint(&coord);
    waypoint.name = Some(name.to_string());
    waypoint.description = description.map(str::to_string);
    waypoint
}
