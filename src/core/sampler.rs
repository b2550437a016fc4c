use crate::models::{Coordinate, RoutePath, Waypoint};
use std::collections::HashSet;

/// Fewest waypoints a sample can hold: the start and the end of the route
pub const MIN_SAMPLE_POINTS: usize = 2;

/// Select the points along a route at which to sample weather
///
/// Deterministic index arithmetic, not distance-based interpolation:
/// 1. Points are deduplicated by coordinate (4 decimal places), first wins.
/// 2. If what remains fits in `max_points`, every point is kept.
/// 3. Otherwise the first and last points are kept plus `max_points - 2`
///    intermediate points at indices `k * (n - 1) / (m + 1)`.
///
/// `max_points` below 2 is treated as 2.
pub fn sample_waypoints(path: &RoutePath, max_points: usize) -> Vec<Waypoint> {
    let max_points = max_points.max(MIN_SAMPLE_POINTS);
    let points = dedup_points(&path.ordered_points);
    let n = points.len();

    let selected: Vec<Coordinate> = if n <= max_points {
        points
    } else {
        let m = max_points - 2;
        let mut selected = Vec::with_capacity(max_points);
        selected.push(points[0]);
        selected.extend((1..=m).map(|k| points[k * (n - 1) / (m + 1)]));
        selected.push(points[n - 1]);
        selected
    };

    label(selected)
}

fn dedup_points(points: &[Coordinate]) -> Vec<Coordinate> {
    let mut seen = HashSet::with_capacity(points.len());
    points
        .iter()
        .filter(|point| seen.insert(point.dedup_key()))
        .copied()
        .collect()
}

fn label(points: Vec<Coordinate>) -> Vec<Waypoint> {
    let last = points.len().saturating_sub(1);

    points
        .into_iter()
        .enumerate()
        .map(|(i, point)| {
            let label = match i {
                0 => "start".to_string(),
                i if i == last => "end".to_string(),
                i => format!("midpoint {}", i),
            };
            Waypoint {
                label,
                lat: point.lat,
                lon: point.lon,
            }
        })
        .collect()
}
