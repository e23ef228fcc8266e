//! Region validation: turns caller-supplied shapes into a [`Boundary`].
//!
//! A boundary is a single valid, simple multipolygon in WGS84 lon/lat. It is
//! built once per query and can be reused for any number of membership tests.
//!
//! Pipeline:
//! 1. accept only Polygon / MultiPolygon shapes (a bare shape, or a non-empty
//!    collection tagged with its CRS);
//! 2. clean rings (repeated vertices, unclosed rings, degenerate rings);
//! 3. when a ring crosses itself, a hole crosses or leaves its shell, holes
//!    overlap, or parts may overlap, rebuild every part as its shell minus
//!    its holes and union the parts;
//! 4. check the result is non-empty and valid;
//! 5. reproject to WGS84 if the input CRS is not canonical.

use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::algorithm::coordinate_position::CoordPos;
use geo::{
    Area, BooleanOps, BoundingRect, Contains, Coord, CoordinatePosition, Geometry, Line, LineString,
    MapCoords, MultiPolygon, Point, Polygon, Rect,
};
use geojson::{GeoJson, JsonObject};

use crate::error::{FloodNetError, Result};
use crate::projection::Crs;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A caller-supplied area of interest.
#[derive(Debug, Clone, PartialEq)]
pub enum Region {
    /// One shape in WGS84 lon/lat.
    Shape(Geometry<f64>),
    /// An ordered collection of shapes sharing an explicit CRS.
    Collection { crs: Crs, shapes: Vec<Geometry<f64>> },
}

impl From<Polygon<f64>> for Region {
    fn from(polygon: Polygon<f64>) -> Self {
        Region::Shape(Geometry::Polygon(polygon))
    }
}

impl From<MultiPolygon<f64>> for Region {
    fn from(multi: MultiPolygon<f64>) -> Self {
        Region::Shape(Geometry::MultiPolygon(multi))
    }
}

impl Region {
    /// Parses a GeoJSON Geometry, Feature or FeatureCollection.
    ///
    /// The CRS is taken from the legacy `crs` member
    /// (`{"type": "name", "properties": {"name": "EPSG:2263"}}`) when
    /// present; without it the shapes are read as WGS84. Features without a
    /// geometry are skipped.
    pub fn from_geojson_str(s: &str) -> Result<Self> {
        let geojson: GeoJson = s
            .parse()
            .map_err(|e| FloodNetError::InvalidRegion(format!("invalid GeoJSON: {}", e)))?;

        let (crs_member, geometries) = match geojson {
            GeoJson::Geometry(geometry) => {
                let crs = crs_name(geometry.foreign_members.as_ref());
                (crs, vec![geometry])
            }
            GeoJson::Feature(feature) => {
                let crs = crs_name(feature.foreign_members.as_ref());
                (crs, feature.geometry.into_iter().collect())
            }
            GeoJson::FeatureCollection(collection) => {
                let crs = crs_name(collection.foreign_members.as_ref());
                let geometries = collection
                    .features
                    .into_iter()
                    .filter_map(|f| f.geometry)
                    .collect();
                (crs, geometries)
            }
        };

        let crs = match crs_member {
            Some(name) => name.parse::<Crs>()?,
            None => Crs::Wgs84,
        };

        let shapes = geometries
            .into_iter()
            .map(|g| {
                Geometry::<f64>::try_from(g.value)
                    .map_err(|e| FloodNetError::InvalidRegion(format!("unsupported GeoJSON geometry: {}", e)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Region::Collection { crs, shapes })
    }
}

fn crs_name(foreign_members: Option<&JsonObject>) -> Option<String> {
    foreign_members?
        .get("crs")?
        .get("properties")?
        .get("name")?
        .as_str()
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// A validated region in WGS84 longitude/latitude.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    shape: MultiPolygon<f64>,
    bounds: Rect<f64>,
}

impl Boundary {
    pub fn shape(&self) -> &MultiPolygon<f64> {
        &self.shape
    }

    /// Bounding rectangle of the union of all parts.
    pub fn bounds(&self) -> Rect<f64> {
        self.bounds
    }

    /// Strict containment: points on an edge are outside.
    pub fn contains_lon_lat(&self, lon: f64, lat: f64) -> bool {
        let (min, max) = (self.bounds.min(), self.bounds.max());
        if lon <= min.x || lon >= max.x || lat <= min.y || lat >= max.y {
            return false;
        }
        self.shape.contains(&Point::new(lon, lat))
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validates, repairs and reprojects a region.
///
/// # Errors
/// - `InvalidRegion`: wrong geometry type, empty collection, non-finite or
///   out-of-range coordinates.
/// - `GeometryRepair`: no valid, simple, non-empty polygon could be made.
pub fn validate(region: &Region) -> Result<Boundary> {
    let (crs, shapes): (Crs, &[Geometry<f64>]) = match region {
        Region::Shape(shape) => (Crs::Wgs84, std::slice::from_ref(shape)),
        Region::Collection { crs, shapes } => {
            if shapes.is_empty() {
                return Err(FloodNetError::InvalidRegion(
                    "collection must contain at least one geometry".to_string(),
                ));
            }
            (*crs, shapes.as_slice())
        }
    };

    let mut parts = Vec::new();
    for shape in shapes {
        match shape {
            Geometry::Polygon(p) => parts.push(p.clone()),
            Geometry::MultiPolygon(mp) => parts.extend(mp.0.iter().cloned()),
            other => {
                return Err(FloodNetError::InvalidRegion(format!(
                    "geometry must be Polygon or MultiPolygon, got {}",
                    geometry_name(other)
                )));
            }
        }
    }

    if !parts.iter().all(polygon_is_finite) {
        return Err(FloodNetError::InvalidRegion("coordinates must be finite".to_string()));
    }

    let repaired = repair(parts)?;

    let canonical = if crs.is_canonical() {
        repaired
    } else {
        repaired.map_coords(|c| crs.to_wgs84(c))
    };

    let in_range = canonical
        .iter()
        .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors()))
        .flat_map(|ring| ring.coords())
        .all(|c| c.x.is_finite() && c.y.is_finite() && c.x.abs() <= 180.0 && c.y.abs() <= 90.0);
    if !in_range {
        return Err(FloodNetError::InvalidRegion(format!(
            "coordinates fall outside longitude/latitude range after reading them as {}",
            crs
        )));
    }

    let bounds = canonical
        .bounding_rect()
        .ok_or_else(|| FloodNetError::GeometryRepair("boundary is empty".to_string()))?;

    Ok(Boundary {
        shape: canonical,
        bounds,
    })
}

fn geometry_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

fn polygon_is_finite(polygon: &Polygon<f64>) -> bool {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .flat_map(|ring| ring.coords())
        .all(|c| c.x.is_finite() && c.y.is_finite())
}

/// Cleans every part and, when parts overlap or rings cross, rebuilds and
/// unions them into one valid multipolygon. Input that is already valid
/// keeps its exact coordinates.
fn repair(parts: Vec<Polygon<f64>>) -> Result<MultiPolygon<f64>> {
    let cleaned: Vec<Polygon<f64>> = parts.into_iter().filter_map(clean_polygon).collect();
    if cleaned.is_empty() {
        return Err(FloodNetError::GeometryRepair(
            "no polygon with at least three distinct vertices".to_string(),
        ));
    }

    let needs_union = !cleaned.iter().all(polygon_is_valid) || parts_may_overlap(&cleaned);
    let merged = if needs_union {
        cleaned
            .into_iter()
            .fold(MultiPolygon::new(Vec::new()), |acc, part| acc.union(&shell_minus_holes(part)))
    } else {
        MultiPolygon::new(cleaned)
    };

    if merged.0.is_empty() || merged.unsigned_area() <= 0.0 {
        return Err(FloodNetError::GeometryRepair("polygon has no area".to_string()));
    }
    if !merged.iter().all(polygon_is_valid) {
        return Err(FloodNetError::GeometryRepair(
            "rings still cross after repair".to_string(),
        ));
    }

    Ok(merged)
}

/// A hole only removes area from its own shell: hole area outside the shell
/// is ignored and overlapping holes merge.
fn shell_minus_holes(polygon: Polygon<f64>) -> MultiPolygon<f64> {
    let (exterior, interiors) = polygon.into_inner();
    let empty = MultiPolygon::new(Vec::new());

    let shell = empty.union(&MultiPolygon::new(vec![Polygon::new(exterior, vec![])]));
    if interiors.is_empty() {
        return shell;
    }
    let holes = interiors
        .into_iter()
        .fold(empty, |acc, ring| acc.union(&MultiPolygon::new(vec![Polygon::new(ring, vec![])])));
    shell.difference(&holes)
}

/// Every ring is simple, no two rings cross or share an edge, each hole lies
/// in its shell and no hole lies in another. Rings may touch at points.
fn polygon_is_valid(polygon: &Polygon<f64>) -> bool {
    let rings: Vec<&LineString<f64>> = std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .collect();
    if !rings.iter().all(|ring| ring_is_simple(ring)) {
        return false;
    }

    for (i, a) in rings.iter().enumerate() {
        for b in &rings[i + 1..] {
            if rings_cross(a, b) {
                return false;
            }
        }
    }

    let shell = Polygon::new(polygon.exterior().clone(), vec![]);
    let holes: Vec<Polygon<f64>> = polygon
        .interiors()
        .iter()
        .map(|ring| Polygon::new(ring.clone(), vec![]))
        .collect();

    holes.iter().enumerate().all(|(i, hole)| {
        let inside_shell = hole
            .exterior()
            .coords()
            .all(|c| shell.coordinate_position(c) != CoordPos::Outside);
        let inside_other_hole = holes.iter().enumerate().any(|(j, other)| {
            i != j
                && hole
                    .exterior()
                    .coords()
                    .any(|c| other.coordinate_position(c) == CoordPos::Inside)
        });
        inside_shell && !inside_other_hole
    })
}

/// Proper crossings or shared stretches between two different rings.
fn rings_cross(a: &LineString<f64>, b: &LineString<f64>) -> bool {
    a.lines().any(|sa| {
        b.lines().any(|sb| {
            matches!(
                line_intersection(sa, sb),
                Some(LineIntersection::Collinear { .. })
                    | Some(LineIntersection::SinglePoint { is_proper: true, .. })
            )
        })
    })
}

/// Conservative: parts whose bounding rectangles touch are treated as
/// overlapping.
fn parts_may_overlap(parts: &[Polygon<f64>]) -> bool {
    let rects: Vec<Rect<f64>> = parts.iter().filter_map(|p| p.bounding_rect()).collect();
    rects.iter().enumerate().any(|(i, a)| {
        rects[i + 1..].iter().any(|b| {
            a.min().x <= b.max().x
                && b.min().x <= a.max().x
                && a.min().y <= b.max().y
                && b.min().y <= a.max().y
        })
    })
}

/// Drops repeated vertices and closes rings; `None` if the exterior is
/// degenerate. Degenerate holes are dropped.
fn clean_polygon(polygon: Polygon<f64>) -> Option<Polygon<f64>> {
    let (exterior, interiors) = polygon.into_inner();
    let exterior = clean_ring(exterior)?;
    let interiors = interiors.into_iter().filter_map(clean_ring).collect();
    Some(Polygon::new(exterior, interiors))
}

fn clean_ring(ring: LineString<f64>) -> Option<LineString<f64>> {
    let mut coords: Vec<Coord<f64>> = Vec::with_capacity(ring.0.len());
    for c in ring.0 {
        if coords.last() != Some(&c) {
            coords.push(c);
        }
    }
    if coords.len() > 1 && coords.first() == coords.last() {
        coords.pop();
    }
    if coords.len() < 3 {
        return None;
    }

    let mut ring = LineString::new(coords);
    ring.close();
    Some(ring)
}

/// A ring is simple when no two segments cross or overlap. Rings that touch
/// themselves at a vertex (a repaired bow-tie can come back that way) are
/// accepted since containment is still well defined.
fn ring_is_simple(ring: &LineString<f64>) -> bool {
    let segments: Vec<Line<f64>> = ring.lines().collect();
    let n = segments.len();
    if n < 3 {
        return false;
    }

    for i in 0..n {
        for j in (i + 1)..n {
            match line_intersection(segments[i], segments[j]) {
                None => {}
                Some(LineIntersection::Collinear { .. }) => return false,
                Some(LineIntersection::SinglePoint { is_proper: true, .. }) => return false,
                Some(LineIntersection::SinglePoint { is_proper: false, .. }) => {}
            }
        }
    }
    true
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
