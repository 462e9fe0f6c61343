//! WGS84 → UTM reprojection and polygon area.
//!
//! Transverse Mercator forward series after Snyder (1987), USGS Prof. Paper
//! 1395 pp. 61-64, on the WGS84 ellipsoid with no datum shift.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::coords::{Point, UtmZone};

// ── WGS84 ellipsoid constants ────────────────────────────────────────────────

const A: f64 = 6_378_137.0; // semi-major axis (m)
const F: f64 = 1.0 / 298.257_223_563;
const E2: f64 = 2.0 * F - F * F;
const E_PRIME2: f64 = E2 / (1.0 - E2);
const K0: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

// ── Zones ────────────────────────────────────────────────────────────────────

/// UTM zone assigned to a longitude/latitude pair.
///
/// `round(lon / 6) + 31` for non-negative longitudes and
/// `round((180 + lon) / 6) + 1` otherwise, clamped to 1..=60. The hemisphere
/// follows the sign of the latitude.
pub fn utm_zone_for(lon: f64, lat: f64) -> UtmZone {
    let raw = if lon >= 0.0 {
        (lon / 6.0).round() + 31.0
    } else {
        ((180.0 + lon) / 6.0).round() + 1.0
    };
    UtmZone::new(raw.clamp(1.0, 60.0) as u8, lat >= 0.0)
}

/// Project a WGS84 longitude/latitude (degrees) to UTM easting/northing (m).
pub fn wgs84_to_utm(lon_deg: f64, lat_deg: f64, zone: UtmZone) -> (f64, f64) {
    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();
    let lon0 = zone.central_meridian().to_radians();

    let sin_lat = lat.sin();
    let cos_lat = lat.cos();
    let tan_lat = lat.tan();

    let n = A / (1.0 - E2 * sin_lat * sin_lat).sqrt();
    let t = tan_lat * tan_lat;
    let c = E_PRIME2 * cos_lat * cos_lat;
    let a = cos_lat * (lon - lon0);
    let m = meridional_arc(lat);

    let a2 = a * a;
    let a4 = a2 * a2;
    let a6 = a4 * a2;

    let easting = K0 * n
        * (a + (1.0 - t + c) * a2 * a / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * E_PRIME2) * a4 * a / 120.0)
        + FALSE_EASTING;

    let northing = K0
        * (m + n
            * tan_lat
            * (a2 / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * E_PRIME2) * a6 / 720.0));

    if zone.north {
        (easting, northing)
    } else {
        (easting, northing + FALSE_NORTHING_SOUTH)
    }
}

/// Meridional arc from the equator to `lat` (radians). Snyder eq. 3-21.
fn meridional_arc(lat: f64) -> f64 {
    let e4 = E2 * E2;
    let e6 = e4 * E2;
    A * ((1.0 - E2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
        - (3.0 * E2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
        + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
        - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
}

// ── Polygons ─────────────────────────────────────────────────────────────────

/// A region boundary as a single ring. The closing vertex may be repeated or
/// omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub ring: Vec<Point>,
}

impl Polygon {
    pub fn new(ring: Vec<Point>) -> Self {
        Self { ring }
    }

    /// Absolute shoelace area in squared coordinate units.
    pub fn planar_area(&self) -> f64 {
        let n = self.ring.len();
        if n < 3 {
            return 0.0;
        }
        let twice: f64 = (0..n)
            .map(|i| {
                let p = self.ring[i];
                let q = self.ring[(i + 1) % n];
                p.x * q.y - q.x * p.y
            })
            .sum();
        twice.abs() / 2.0
    }

    /// Zone holding the most vertices; ties go to the smallest zone.
    pub fn dominant_utm_zone(&self) -> Option<UtmZone> {
        let mut counts: HashMap<UtmZone, usize> = HashMap::new();
        for p in &self.ring {
            *counts.entry(utm_zone_for(p.x, p.y)).or_default() += 1;
        }
        counts
            .into_iter()
            .max_by(|(za, ca), (zb, cb)| ca.cmp(cb).then(zb.cmp(za)))
            .map(|(zone, _)| zone)
    }

    pub fn reproject_to_utm(&self, zone: UtmZone) -> Polygon {
        let ring = self
            .ring
            .iter()
            .map(|p| {
                let (e, n) = wgs84_to_utm(p.x, p.y, zone);
                Point::new(e, n)
            })
            .collect();
        Polygon { ring }
    }

    /// Area in square metres of a polygon given in WGS84 degrees, measured in
    /// its dominant UTM zone.
    pub fn degrees_area(&self) -> f64 {
        match self.dominant_utm_zone() {
            Some(zone) => self.reproject_to_utm(zone).planar_area(),
            None => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(x0: f64, y0: f64, side: f64) -> Polygon {
        Polygon::new(vec![
            Point::new(x0, y0),
            Point::new(x0 + side, y0),
            Point::new(x0 + side, y0 + side),
            Point::new(x0, y0 + side),
        ])
    }

    #[test]
    fn zone_rule_follows_longitude_sign() {
        assert_eq!(utm_zone_for(1.5, 10.0), UtmZone::new(31, true));
        assert_eq!(utm_zone_for(13.0, -5.0), UtmZone::new(33, false));
        assert_eq!(utm_zone_for(-58.4, -34.6), UtmZone::new(21, false));
        assert_eq!(utm_zone_for(180.0, 0.0).number, 60);
    }

    #[test]
    fn buenos_aires_projects_into_zone_21_south() {
        // pyproj reference: EPSG:4326 → EPSG:32721.
        let (e, n) = wgs84_to_utm(-58.3816, -34.6037, UtmZone::new(21, false));
        assert!((e - 373_317.50).abs() < 2.0, "easting {e}");
        assert!((n - 6_170_036.17).abs() < 2.0, "northing {n}");
    }

    #[test]
    fn central_meridian_at_equator_is_false_easting() {
        let (e, n) = wgs84_to_utm(3.0, 0.0, UtmZone::new(31, true));
        assert_relative_eq!(e, FALSE_EASTING, epsilon = 1e-6);
        assert_relative_eq!(n, 0.0, epsilon = 1e-6);
        let (_, s) = wgs84_to_utm(3.0, 0.0, UtmZone::new(31, false));
        assert_relative_eq!(s, FALSE_NORTHING_SOUTH, epsilon = 1e-6);
    }

    #[test]
    fn shoelace_ignores_orientation_and_closure() {
        let mut sq = square(0.0, 0.0, 10.0);
        assert_relative_eq!(sq.planar_area(), 100.0);
        sq.ring.reverse();
        assert_relative_eq!(sq.planar_area(), 100.0);
        sq.ring.push(sq.ring[0]);
        assert_relative_eq!(sq.planar_area(), 100.0);
        assert_eq!(Polygon::new(vec![Point::new(0.0, 0.0)]).planar_area(), 0.0);
    }

    #[test]
    fn dominant_zone_counts_vertices() {
        // Three vertices map to zone 31, one to zone 33.
        let poly = Polygon::new(vec![
            Point::new(1.0, 45.0),
            Point::new(2.0, 45.0),
            Point::new(2.0, 46.0),
            Point::new(9.5, 46.0),
        ]);
        assert_eq!(poly.dominant_utm_zone(), Some(UtmZone::new(31, true)));
        assert_eq!(Polygon::new(vec![]).dominant_utm_zone(), None);
    }

    #[test]
    fn small_degree_square_has_expected_area() {
        // 0.01° square at the equator near the zone-31 central meridian:
        // roughly 1113 m × 1106 m.
        let area = square(2.5, 0.0, 0.01).degrees_area();
        let expected = 1_113.2 * 1_105.7;
        assert!((area - expected).abs() / expected < 0.01, "area {area}");
    }
}
