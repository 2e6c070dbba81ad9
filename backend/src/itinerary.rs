use crate::models::Stop;
use crate::osrm::{OsrmLeg, OsrmStep};

/// Maneuvers worth a line in the itinerary.
const ANNOUNCED_MANEUVERS: [&str; 5] = ["turn", "exit", "on ramp", "off ramp", "roundabout"];
const UNNAMED_ROAD: &str = "current road";

/// Human-readable instruction for a routing step, if it deserves one.
pub fn step_to_bullet(step: &OsrmStep) -> Option<String> {
    let kind = step.maneuver.kind.as_str();
    if kind == "depart" || kind == "arrive" {
        return None;
    }

    let name = step.name.trim();
    if name.is_empty() || name == UNNAMED_ROAD {
        return None;
    }
    if !ANNOUNCED_MANEUVERS.contains(&kind) {
        return None;
    }

    let modifier = step.maneuver.modifier.as_deref().unwrap_or("").trim();
    let bullet = [capitalize(kind).as_str(), modifier, "onto", name]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    Some(bullet)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Interleave route instructions with stop narratives.
///
/// Leg `i` of the route ends at stop `i`, so the stop's narrative follows the
/// leg's instructions. Consecutive identical instructions collapse into one.
pub fn build_itinerary(start: &str, end: &str, legs: &[OsrmLeg], stops: &[Stop]) -> Vec<String> {
    let mut lines = vec![format!("Start from {start}")];

    for (i, leg) in legs.iter().enumerate() {
        for bullet in leg.steps.iter().filter_map(step_to_bullet) {
            if lines.last() != Some(&bullet) {
                lines.push(bullet);
            }
        }
        if let Some(stop) = stops.get(i) {
            lines.push(format!("Stop at {}: {}", stop.title, stop.extract));
        }
    }

    lines.push(format!("Arrive at {end}"));
    lines
}
