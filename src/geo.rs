use earcutr::earcut;
use glam::DVec2;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Minimum distinct vertices for a ring to enclose an area.
pub const MIN_RING_POINTS: usize = 3;

/// Distance in degrees under which a point counts as lying on an edge
const ON_EDGE_EPSILON: f64 = 1e-9;

/// Rings (and triangles) with less area than this, in square degrees, are degenerate
const AREA_EPSILON: f64 = 1e-12;

/// Why a ring produced no geometry. Never fatal: the ring is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingDefect {
    /// Fewer than three vertices after dropping the closing duplicate
    TooFewPoints(usize),
    /// All vertices collinear (or coincident)
    ZeroArea,
    /// Triangulation failed or produced only degenerate triangles
    TriangulationFailed,
}

impl fmt::Display for RingDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RingDefect::TooFewPoints(n) => write!(f, "ring has {} points, need {}", n, MIN_RING_POINTS),
            RingDefect::ZeroArea => write!(f, "ring encloses no area"),
            RingDefect::TriangulationFailed => write!(f, "ring could not be triangulated"),
        }
    }
}

/// A closed ring of (lon, lat) degrees. `x` is longitude, `y` latitude.
/// The closing edge is implicit; a repeated first point is dropped on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    points: Vec<DVec2>,
}

impl Polygon {
    /// Build a ring, tolerating an explicit closing point.
    /// Fails when fewer than three points remain.
    pub fn new(mut points: Vec<DVec2>) -> Result<Self, RingDefect> {
        if points.len() >= 2 && points.first() == points.last() {
            points.pop();
        }
        if points.len() < MIN_RING_POINTS {
            return Err(RingDefect::TooFewPoints(points.len()));
        }
        Ok(Self { points })
    }

    pub fn from_lonlat(coords: impl IntoIterator<Item = (f64, f64)>) -> Result<Self, RingDefect> {
        Self::new(coords.into_iter().map(|(lon, lat)| DVec2::new(lon, lat)).collect())
    }

    #[inline(always)]
    pub fn points(&self) -> &[DVec2] {
        &self.points
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterate every edge, including the implicit closing edge last -> first
    pub fn edges(&self) -> impl Iterator<Item = (DVec2, DVec2)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    /// Axis-aligned bounds in degrees as (min, max)
    pub fn bbox(&self) -> (DVec2, DVec2) {
        self.points.iter().fold(
            (DVec2::splat(f64::INFINITY), DVec2::splat(f64::NEG_INFINITY)),
            |(min, max), &p| (min.min(p), max.max(p)),
        )
    }

    /// Shoelace area in square degrees; positive for counter-clockwise rings
    pub fn signed_area(&self) -> f64 {
        self.edges().map(|(a, b)| a.perp_dot(b)).sum::<f64>() * 0.5
    }

    /// Ray-casting (even-odd) containment test. Points exactly on an edge
    /// may land on either side; callers only rely on strict interiors.
    pub fn contains(&self, p: DVec2) -> bool {
        let mut inside = false;
        for (a, b) in self.edges() {
            if (a.y > p.y) != (b.y > p.y) {
                let x_cross = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
                if p.x < x_cross {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Ear-clip the ring in the lon/lat plane into triangles over [`Polygon::points`].
    /// Zero-area triangles are dropped; a ring with none left cannot be meshed.
    pub fn triangulate(&self) -> Result<Vec<[u32; 3]>, RingDefect> {
        if self.signed_area().abs() < AREA_EPSILON {
            return Err(RingDefect::ZeroArea);
        }

        let coords: Vec<f64> = self.points.iter().flat_map(|p| [p.x, p.y]).collect();
        let indices = earcut(&coords, &[], 2).map_err(|_| RingDefect::TriangulationFailed)?;

        let triangles: Vec<[u32; 3]> = indices
            .chunks_exact(3)
            .map(|t| [t[0] as u32, t[1] as u32, t[2] as u32])
            .filter(|&[a, b, c]| {
                let (pa, pb, pc) = (self.points[a as usize], self.points[b as usize], self.points[c as usize]);
                (pb - pa).perp_dot(pc - pa).abs() >= AREA_EPSILON
            })
            .collect();

        if triangles.is_empty() {
            return Err(RingDefect::TriangulationFailed);
        }
        Ok(triangles)
    }

    /// Containment excluding points that lie on an edge
    pub fn contains_strict(&self, p: DVec2) -> bool {
        self.contains(p) && !self.edges().any(|(a, b)| on_segment(a, b, p))
    }
}

/// Whether `p` lies on segment `ab`, within rounding
fn on_segment(a: DVec2, b: DVec2, p: DVec2) -> bool {
    let ab = b - a;
    let ap = p - a;
    let len2 = ab.length_squared();
    if len2 == 0.0 {
        return ap.length_squared() <= ON_EDGE_EPSILON * ON_EDGE_EPSILON;
    }
    let t = ap.dot(ab) / len2;
    (0.0..=1.0).contains(&t) && ab.perp_dot(ap).abs() <= ON_EDGE_EPSILON * len2.sqrt()
}

/// A named country made of one or more rings
#[derive(Debug, Clone)]
pub struct Country {
    pub name: String,
    pub polygons: Vec<Polygon>,
}

impl Country {
    /// Total vertex count over all rings
    pub fn vertex_count(&self) -> usize {
        self.polygons.iter().map(Polygon::len).sum()
    }
}

/// Countries in ingestion order. Names are unique and case-sensitive in storage;
/// lookups by query string are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct CountrySet {
    countries: Vec<Country>,
    by_name: HashMap<String, usize>,
}

impl CountrySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert raw rings for a country. Rings that cannot be meshed (too few
    /// points, no area, no surviving triangles) are dropped; a country left
    /// with no rings is not stored and `false` is returned.
    /// Re-inserting an existing name replaces its rings but keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, rings: Vec<Vec<DVec2>>) -> bool {
        let name = name.into();
        let polygons: Vec<Polygon> = rings
            .into_iter()
            .filter_map(|ring| match Polygon::new(ring).and_then(|p| p.triangulate().map(|_| p)) {
                Ok(poly) => Some(poly),
                Err(defect) => {
                    debug!(country = %name, %defect, "skipping ring");
                    None
                }
            })
            .collect();

        if polygons.is_empty() {
            debug!(country = %name, "country has no usable rings");
            return false;
        }

        match self.by_name.get(&name) {
            Some(&idx) => self.countries[idx].polygons = polygons,
            None => {
                self.by_name.insert(name.clone(), self.countries.len());
                self.countries.push(Country { name, polygons });
            }
        }
        true
    }

    /// Convenience for (lon, lat) tuples, matching the GeoJSON loader's output
    pub fn insert_lonlat(&mut self, name: impl Into<String>, rings: Vec<Vec<(f64, f64)>>) -> bool {
        let rings = rings
            .into_iter()
            .map(|ring| ring.into_iter().map(|(lon, lat)| DVec2::new(lon, lat)).collect())
            .collect();
        self.insert(name, rings)
    }

    /// Exact, case-sensitive lookup
    pub fn get(&self, name: &str) -> Option<&Country> {
        self.by_name.get(name).map(|&idx| &self.countries[idx])
    }

    /// Case-insensitive substring match; the first country in iteration order wins.
    /// An empty (or whitespace) query matches nothing.
    pub fn find(&self, query: &str) -> Option<&Country> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.countries
            .iter()
            .find(|c| c.name.to_lowercase().contains(&needle))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Country> {
        self.countries.iter()
    }

    pub fn as_slice(&self) -> &[Country] {
        &self.countries
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> Vec<DVec2> {
        vec![
            DVec2::new(x0, y0),
            DVec2::new(x0 + size, y0),
            DVec2::new(x0 + size, y0 + size),
            DVec2::new(x0, y0 + size),
        ]
    }

    #[test]
    fn test_closing_point_dropped() {
        let mut ring = square(0.0, 0.0, 1.0);
        ring.push(ring[0]);
        let poly = Polygon::new(ring).unwrap();
        assert_eq!(poly.len(), 4);
        assert_eq!(poly.edges().count(), 4);
    }

    #[test]
    fn test_short_ring_rejected() {
        let ring = vec![DVec2::ZERO, DVec2::X, DVec2::ZERO];
        assert_eq!(Polygon::new(ring), Err(RingDefect::TooFewPoints(2)));
    }

    #[test]
    fn test_contains_and_area() {
        let poly = Polygon::new(square(0.0, 0.0, 2.0)).unwrap();
        assert!(poly.contains(DVec2::new(1.0, 1.0)));
        assert!(!poly.contains(DVec2::new(3.0, 1.0)));
        assert!(!poly.contains(DVec2::new(-0.5, 1.0)));
        assert!((poly.signed_area() - 4.0).abs() < 1e-12);

        let (min, max) = poly.bbox();
        assert_eq!(min, DVec2::new(0.0, 0.0));
        assert_eq!(max, DVec2::new(2.0, 2.0));
    }

    #[test]
    fn test_concave_contains() {
        // U shape opening upwards
        let ring = vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(3.0, 0.0),
            DVec2::new(3.0, 3.0),
            DVec2::new(2.0, 3.0),
            DVec2::new(2.0, 1.0),
            DVec2::new(1.0, 1.0),
            DVec2::new(1.0, 3.0),
            DVec2::new(0.0, 3.0),
        ];
        let poly = Polygon::new(ring).unwrap();
        assert!(poly.contains(DVec2::new(0.5, 2.0)));
        assert!(!poly.contains(DVec2::new(1.5, 2.0)));
        assert!(poly.contains(DVec2::new(1.5, 0.5)));
    }

    #[test]
    fn test_contains_strict_excludes_edges() {
        let poly = Polygon::new(square(0.0, 0.0, 2.0)).unwrap();
        assert!(poly.contains_strict(DVec2::new(1.0, 1.0)));
        assert!(!poly.contains_strict(DVec2::new(0.0, 0.0)));
        assert!(!poly.contains_strict(DVec2::new(0.0, 1.0)));
        assert!(!poly.contains_strict(DVec2::new(1.0, 0.0)));
        assert!(!poly.contains_strict(DVec2::new(3.0, 1.0)));
    }

    #[test]
    fn test_empty_country_excluded() {
        let mut set = CountrySet::new();
        assert!(!set.insert("Dot", vec![vec![DVec2::ZERO, DVec2::X]]));
        assert!(set.insert("Testland", vec![square(0.0, 0.0, 1.0)]));
        assert_eq!(set.len(), 1);
        assert!(set.get("Dot").is_none());
        assert!(set.find("dot").is_none());
    }

    #[test]
    fn test_unmeshable_rings_rejected_at_insert() {
        let mut set = CountrySet::new();
        let flat = vec![DVec2::new(10.0, 10.0), DVec2::new(11.0, 10.0), DVec2::new(12.0, 10.0)];
        let bowtie = vec![DVec2::new(0.0, 0.0), DVec2::new(1.0, 1.0), DVec2::new(1.0, 0.0), DVec2::new(0.0, 1.0)];
        assert!(!set.insert("Flatland", vec![flat.clone()]));
        assert!(!set.insert("Bowtie", vec![bowtie]));
        assert!(set.is_empty());
        assert!(set.find("flat").is_none());

        // a good part survives next to a bad one
        assert!(set.insert("Mixed", vec![flat, square(0.0, 0.0, 1.0)]));
        assert_eq!(set.get("Mixed").unwrap().polygons.len(), 1);
    }

    #[test]
    fn test_triangulate() {
        let poly = Polygon::new(square(0.0, 0.0, 1.0)).unwrap();
        assert_eq!(poly.triangulate().unwrap().len(), 2);

        let line = Polygon::from_lonlat([(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]).unwrap();
        assert_eq!(line.triangulate(), Err(RingDefect::ZeroArea));

        // self-intersecting: the two lobes cancel out
        let bowtie = Polygon::from_lonlat([(0.0, 0.0), (1.0, 1.0), (1.0, 0.0), (0.0, 1.0)]).unwrap();
        assert!(bowtie.triangulate().is_err());
    }

    #[test]
    fn test_find_case_insensitive_first_wins() {
        let mut set = CountrySet::new();
        set.insert("Nigeria", vec![square(0.0, 0.0, 1.0)]);
        set.insert("Niger", vec![square(2.0, 0.0, 1.0)]);
        assert_eq!(set.find("NIGER").map(|c| c.name.as_str()), Some("Nigeria"));
        assert_eq!(set.find("testland").map(|c| c.name.as_str()), None);
        assert!(set.find("   ").is_none());
        assert_eq!(set.get("Niger").map(|c| c.name.as_str()), Some("Niger"));
    }

    #[test]
    fn test_reinsert_keeps_position() {
        let mut set = CountrySet::new();
        set.insert("A", vec![square(0.0, 0.0, 1.0)]);
        set.insert("B", vec![square(2.0, 0.0, 1.0)]);
        set.insert("A", vec![square(5.0, 5.0, 1.0), square(7.0, 7.0, 1.0)]);
        let names: Vec<&str> = set.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["A", "B"]);
        assert_eq!(set.get("A").unwrap().polygons.len(), 2);
        assert_eq!(set.get("A").unwrap().vertex_count(), 8);
    }
}
