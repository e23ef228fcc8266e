//! Coordinate reference systems understood by the region validator.
//!
//! Everything is normalised to WGS84 longitude/latitude (EPSG:4326) before
//! any membership test runs. Besides the canonical system we accept:
//!
//! - NAD83 geographic (EPSG:4269), treated as coincident with WGS84; the
//!   datum shift is well under a metre.
//! - Spherical Web Mercator (EPSG:3857 and its aliases).
//! - NAD83 / New York Long Island (EPSG:2263), the Lambert Conformal Conic
//!   state plane in US survey feet used for NYC borough boundaries.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};
use std::fmt;
use std::str::FromStr;

use geo::Coord;

use crate::error::FloodNetError;

/// Canonical CRS identifier written into outputs.
pub const CANONICAL_CRS: &str = "EPSG:4326";

/// Web Mercator sphere radius (metres).
const MERCATOR_RADIUS: f64 = 6_378_137.0;

/// Web Mercator stops short of the poles.
const MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_59;

/// One US survey foot in metres.
const US_SURVEY_FOOT: f64 = 1200.0 / 3937.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Crs {
    Wgs84,
    Nad83,
    WebMercator,
    NyLongIsland,
}

impl Crs {
    pub fn is_canonical(&self) -> bool {
        matches!(self, Crs::Wgs84 | Crs::Nad83)
    }

    pub fn code(&self) -> &'static str {
        match self {
            Crs::Wgs84 => CANONICAL_CRS,
            Crs::Nad83 => "EPSG:4269",
            Crs::WebMercator => "EPSG:3857",
            Crs::NyLongIsland => "EPSG:2263",
        }
    }

    /// Projects a coordinate in this CRS to WGS84 (x = lon, y = lat).
    pub fn to_wgs84(&self, c: Coord<f64>) -> Coord<f64> {
        match self {
            Crs::Wgs84 | Crs::Nad83 => c,
            Crs::WebMercator => mercator_to_wgs84(c),
            Crs::NyLongIsland => ny_long_island().inverse(c),
        }
    }

    /// Projects a WGS84 coordinate into this CRS.
    pub fn from_wgs84(&self, c: Coord<f64>) -> Coord<f64> {
        match self {
            Crs::Wgs84 | Crs::Nad83 => c,
            Crs::WebMercator => wgs84_to_mercator(c),
            Crs::NyLongIsland => ny_long_island().forward(c),
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Crs {
    type Err = FloodNetError;

    /// Accepts `EPSG:n`, OGC URNs (`urn:ogc:def:crs:EPSG::n`,
    /// `urn:ogc:def:crs:OGC:1.3:CRS84`) and the `CRS84` shorthands.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        if upper.ends_with("CRS84") {
            return Ok(Crs::Wgs84);
        }

        let code = upper
            .rsplit(':')
            .find(|part| !part.is_empty())
            .unwrap_or_default();
        let has_epsg_authority = upper.starts_with("EPSG:") || upper.contains(":EPSG:");

        match (has_epsg_authority, code) {
            (true, "4326") => Ok(Crs::Wgs84),
            (true, "4269") => Ok(Crs::Nad83),
            (true, "3857" | "900913" | "102100" | "3785") => Ok(Crs::WebMercator),
            (true, "2263") => Ok(Crs::NyLongIsland),
            _ => Err(FloodNetError::UnsupportedCrs(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Web Mercator
// ---------------------------------------------------------------------------

fn mercator_to_wgs84(c: Coord<f64>) -> Coord<f64> {
    let lon = (c.x / MERCATOR_RADIUS).to_degrees();
    let lat = (2.0 * (c.y / MERCATOR_RADIUS).exp().atan() - FRAC_PI_2).to_degrees();
    Coord { x: lon, y: lat }
}

fn wgs84_to_mercator(c: Coord<f64>) -> Coord<f64> {
    let lat = c.y.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT).to_radians();
    Coord {
        x: MERCATOR_RADIUS * c.x.to_radians(),
        y: MERCATOR_RADIUS * (FRAC_PI_4 + lat / 2.0).tan().ln(),
    }
}

// ---------------------------------------------------------------------------
// Lambert Conformal Conic (2 standard parallels, ellipsoidal)
// ---------------------------------------------------------------------------

/// Ellipsoidal Lambert Conformal Conic with two standard parallels.
///
/// Projected coordinates are in `unit` metres per unit (US survey feet for
/// the New York state plane).
#[derive(Debug, Clone)]
struct LambertConformal {
    /// Semi-major axis (metres)
    a: f64,
    /// First eccentricity
    e: f64,
    /// Central meridian (radians)
    lon0: f64,
    false_easting: f64,
    false_northing: f64,
    unit: f64,
    n: f64,
    f: f64,
    rho0: f64,
}

impl LambertConformal {
    #[allow(clippy::too_many_arguments)]
    fn new(
        a: f64,
        inv_flattening: f64,
        lat0_deg: f64,
        lon0_deg: f64,
        lat1_deg: f64,
        lat2_deg: f64,
        false_easting: f64,
        false_northing: f64,
        unit: f64,
    ) -> Self {
        let flattening = 1.0 / inv_flattening;
        let e = (2.0 * flattening - flattening * flattening).sqrt();

        let lat0 = lat0_deg.to_radians();
        let lat1 = lat1_deg.to_radians();
        let lat2 = lat2_deg.to_radians();

        let m1 = m(lat1, e);
        let m2 = m(lat2, e);
        let t0 = t(lat0, e);
        let t1 = t(lat1, e);
        let t2 = t(lat2, e);

        let n = if (lat1 - lat2).abs() < 1e-12 {
            lat1.sin()
        } else {
            (m1.ln() - m2.ln()) / (t1.ln() - t2.ln())
        };
        let f = m1 / (n * t1.powf(n));
        let rho0 = a * f * t0.powf(n);

        Self {
            a,
            e,
            lon0: lon0_deg.to_radians(),
            false_easting,
            false_northing,
            unit,
            n,
            f,
            rho0,
        }
    }

    fn forward(&self, c: Coord<f64>) -> Coord<f64> {
        let lat = c.y.to_radians();
        let mut dlon = c.x.to_radians() - self.lon0;
        while dlon > PI {
            dlon -= 2.0 * PI;
        }
        while dlon < -PI {
            dlon += 2.0 * PI;
        }

        let rho = self.a * self.f * t(lat, self.e).powf(self.n);
        let theta = self.n * dlon;

        Coord {
            x: (self.false_easting + rho * theta.sin()) / self.unit,
            y: (self.false_northing + self.rho0 - rho * theta.cos()) / self.unit,
        }
    }

    fn inverse(&self, c: Coord<f64>) -> Coord<f64> {
        let x = c.x * self.unit - self.false_easting;
        let y = self.rho0 - (c.y * self.unit - self.false_northing);

        let sign = self.n.signum();
        let rho = sign * (x * x + y * y).sqrt();
        let theta = (sign * x).atan2(sign * y);
        let t_val = (rho / (self.a * self.f)).powf(1.0 / self.n);

        let lon = theta / self.n + self.lon0;

        let mut lat = FRAC_PI_2 - 2.0 * t_val.atan();
        for _ in 0..15 {
            let es = self.e * lat.sin();
            let next = FRAC_PI_2 - 2.0 * (t_val * ((1.0 - es) / (1.0 + es)).powf(self.e / 2.0)).atan();
            let done = (next - lat).abs() < 1e-12;
            lat = next;
            if done {
                break;
            }
        }

        Coord {
            x: lon.to_degrees(),
            y: lat.to_degrees(),
        }
    }
}

fn m(lat: f64, e: f64) -> f64 {
    let es = e * lat.sin();
    lat.cos() / (1.0 - es * es).sqrt()
}

fn t(lat: f64, e: f64) -> f64 {
    let es = e * lat.sin();
    (FRAC_PI_4 - lat / 2.0).tan() / ((1.0 - es) / (1.0 + es)).powf(e / 2.0)
}

/// NAD83 / New York Long Island (ftUS), GRS80 ellipsoid.
fn ny_long_island() -> LambertConformal {
    LambertConformal::new(
        6_378_137.0,
        298.257_222_101,
        40.0 + 10.0 / 60.0,
        -74.0,
        41.0 + 2.0 / 60.0,
        40.0 + 40.0 / 60.0,
        300_000.0,
        0.0,
        US_SURVEY_FOOT,
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Coord<f64>, b: Coord<f64>, tol: f64) {
        assert!(
            (a.x - b.x).abs() < tol && (a.y - b.y).abs() < tol,
            "expected {:?} ≈ {:?} (tolerance {})",
            a,
            b,
            tol
        );
    }

    // --- CRS names ----------------------------------------------------------

    #[test]
    fn test_parse_common_crs_spellings() {
        assert_eq!("EPSG:4326".parse::<Crs>().unwrap(), Crs::Wgs84);
        assert_eq!("epsg:4326".parse::<Crs>().unwrap(), Crs::Wgs84);
        assert_eq!("urn:ogc:def:crs:OGC:1.3:CRS84".parse::<Crs>().unwrap(), Crs::Wgs84);
        assert_eq!("urn:ogc:def:crs:EPSG::4326".parse::<Crs>().unwrap(), Crs::Wgs84);
        assert_eq!("EPSG:3857".parse::<Crs>().unwrap(), Crs::WebMercator);
        assert_eq!("EPSG:900913".parse::<Crs>().unwrap(), Crs::WebMercator);
        assert_eq!("urn:ogc:def:crs:EPSG::2263".parse::<Crs>().unwrap(), Crs::NyLongIsland);
        assert_eq!("EPSG:4269".parse::<Crs>().unwrap(), Crs::Nad83);
    }

    #[test]
    fn test_unknown_crs_is_rejected() {
        let result = "EPSG:32618".parse::<Crs>();
        assert!(matches!(result, Err(FloodNetError::UnsupportedCrs(_))));

        let result = "4326".parse::<Crs>();
        assert!(
            matches!(result, Err(FloodNetError::UnsupportedCrs(_))),
            "a bare number has no authority and should not be guessed"
        );
    }

    #[test]
    fn test_canonical_flags() {
        assert!(Crs::Wgs84.is_canonical());
        assert!(Crs::Nad83.is_canonical());
        assert!(!Crs::WebMercator.is_canonical());
        assert!(!Crs::NyLongIsland.is_canonical());
    }

    // --- Web Mercator -------------------------------------------------------

    #[test]
    fn test_mercator_origin_is_null_island() {
        let c = Crs::WebMercator.to_wgs84(Coord { x: 0.0, y: 0.0 });
        assert_close(c, Coord { x: 0.0, y: 0.0 }, 1e-9);
    }

    #[test]
    fn test_mercator_known_point_nyc() {
        // Lower Manhattan is roughly (-8238310, 4970072) in Web Mercator.
        let c = Crs::WebMercator.to_wgs84(Coord { x: -8_238_310.0, y: 4_970_072.0 });
        assert!((c.x - (-74.006)).abs() < 0.01, "lon was {}", c.x);
        assert!((c.y - 40.7128).abs() < 0.01, "lat was {}", c.y);
    }

    #[test]
    fn test_mercator_round_trip() {
        let original = Coord { x: -73.95, y: 40.65 };
        let back = Crs::WebMercator.to_wgs84(Crs::WebMercator.from_wgs84(original));
        assert_close(back, original, 1e-9);
    }

    // --- New York Long Island state plane -----------------------------------

    #[test]
    fn test_ny_long_island_origin_maps_to_false_origin() {
        let c = Crs::NyLongIsland.from_wgs84(Coord { x: -74.0, y: 40.0 + 10.0 / 60.0 });
        assert!((c.x - 984_250.0).abs() < 0.01, "x was {}", c.x);
        assert!(c.y.abs() < 0.01, "y was {}", c.y);
    }

    #[test]
    fn test_ny_long_island_lower_manhattan_is_in_expected_range() {
        let c = Crs::NyLongIsland.from_wgs84(Coord { x: -74.006, y: 40.7128 });
        assert!(c.x > 950_000.0 && c.x < 1_020_000.0, "x was {}", c.x);
        assert!(c.y > 180_000.0 && c.y < 220_000.0, "y was {}", c.y);
    }

    #[test]
    fn test_ny_long_island_round_trip() {
        for original in [
            Coord { x: -73.95, y: 40.65 },
            Coord { x: -74.25, y: 40.50 },
            Coord { x: -73.70, y: 40.90 },
        ] {
            let projected = Crs::NyLongIsland.from_wgs84(original);
            let back = Crs::NyLongIsland.to_wgs84(projected);
            assert_close(back, original, 1e-8);
        }
    }
}
