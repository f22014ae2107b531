use std::cmp::Ordering;

use crate::models::location::GeoPoint;

const EARTH_RADIUS_KM: f64 = 6_371.0;

pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.sqrt().asin();

    EARTH_RADIUS_KM * central_angle
}

/// Stable sort by distance from `origin`. Items without a position go last
/// in their original order.
pub fn sort_by_distance<T>(
    items: &mut [T],
    origin: &GeoPoint,
    position: impl Fn(&T) -> Option<GeoPoint>,
) {
    items.sort_by(|a, b| match (position(a), position(b)) {
        (Some(pa), Some(pb)) => haversine_km(origin, &pa).total_cmp(&haversine_km(origin, &pb)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

#[cfg(test)]
mod tests {
    use super::{haversine_km, sort_by_distance};
    use crate::models::location::GeoPoint;

    #[test]
    fn zero_distance_for_same_point() {
        let p = GeoPoint {
            lat: 9.9312,
            lng: 76.2673,
        };
        let distance = haversine_km(&p, &p);
        assert!(distance < 1e-9);
    }

    #[test]
    fn kochi_to_thrissur_is_around_66_km() {
        let kochi = GeoPoint {
            lat: 9.9312,
            lng: 76.2673,
        };
        let thrissur = GeoPoint {
            lat: 10.5276,
            lng: 76.2144,
        };
        let distance = haversine_km(&kochi, &thrissur);
        assert!((distance - 66.0).abs() < 5.0);
    }

    #[test]
    fn unknown_positions_sort_last() {
        let origin = GeoPoint { lat: 0.0, lng: 0.0 };
        let mut items = vec![
            ("none-a", None),
            ("far", Some(GeoPoint { lat: 2.0, lng: 0.0 })),
            ("none-b", None),
            ("near", Some(GeoPoint { lat: 0.5, lng: 0.0 })),
        ];
        sort_by_distance(&mut items, &origin, |(_, p)| *p);

        let order: Vec<&str> = items.iter().map(|(name, _)| *name).collect();
        assert_eq!(order, vec!["near", "far", "none-a", "none-b"]);
    }
}
