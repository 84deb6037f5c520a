use glam::DVec3;

use crate::index::SpatialIndex;

/// Why a pick resolved to no country
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MissReason {
    /// The point is on or behind the horizon as seen from the camera
    BackFacing,
    /// The index holds no anchors
    EmptyIndex,
    /// Nearest anchor is farther than the allowed pick distance
    TooFar { distance: f64 },
}

/// Outcome of [`resolve_pick`]
#[derive(Debug, Clone, PartialEq)]
pub enum Pick<'a> {
    Hit { country: &'a str, distance: f64 },
    Miss(MissReason),
}

impl<'a> Pick<'a> {
    /// Country name on a hit
    pub fn country(&self) -> Option<&'a str> {
        match self {
            Pick::Hit { country, .. } => Some(*country),
            Pick::Miss(_) => None,
        }
    }
}

/// Map a surface point from the picking layer back to a country.
///
/// Points with `dot(point, camera) <= 0` are rejected before any lookup, so
/// a hit on the far hemisphere can never resolve even if it lands exactly
/// on an anchor. A nearest anchor exactly `max_distance` away still hits.
pub fn resolve_pick(index: &SpatialIndex, point: DVec3, camera: DVec3, max_distance: f64) -> Pick<'_> {
    if point.dot(camera) <= 0.0 {
        return Pick::Miss(MissReason::BackFacing);
    }

    match index.nearest(point) {
        None => Pick::Miss(MissReason::EmptyIndex),
        Some((_, distance)) if distance > max_distance => Pick::Miss(MissReason::TooFar { distance }),
        Some((anchor, distance)) => Pick::Hit {
            country: &anchor.country,
            distance,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GlobeConfig;
    use crate::geo::CountrySet;
    use crate::map::projection::project;
    use crate::map::spatial::SearchBackend;

    fn testland_index(backend: SearchBackend) -> (SpatialIndex, GlobeConfig) {
        let mut set = CountrySet::new();
        set.insert_lonlat("Testland", vec![vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]]);
        let config = GlobeConfig {
            search: backend,
            ..GlobeConfig::default()
        };
        (SpatialIndex::build(&set, &config), config)
    }

    #[test]
    fn test_front_pick_hits() {
        for backend in [SearchBackend::RTree, SearchBackend::Grid, SearchBackend::Linear] {
            let (index, config) = testland_index(backend);
            let p = project(0.5, 0.5, config.layers.surface, config.base_radius);
            let camera = p * 3.0;
            let pick = resolve_pick(&index, p, camera, config.pick_max_distance);
            assert_eq!(pick.country(), Some("Testland"));
        }
    }

    #[test]
    fn test_antipode_is_back_facing() {
        let (index, config) = testland_index(SearchBackend::RTree);
        let p = project(0.5, 0.5, config.layers.surface, config.base_radius);
        let camera = p * 3.0;
        assert_eq!(
            resolve_pick(&index, -p, camera, config.pick_max_distance),
            Pick::Miss(MissReason::BackFacing)
        );
    }

    #[test]
    fn test_back_facing_ignores_proximity() {
        let (index, config) = testland_index(SearchBackend::Linear);
        // an anchor itself, seen from the opposite side
        let anchor = index.points()[0].position;
        assert_eq!(
            resolve_pick(&index, anchor, -anchor, f64::INFINITY),
            Pick::Miss(MissReason::BackFacing)
        );
        // exactly on the horizon: (0, 0) is a ring corner, so an anchor sits there
        let corner = project(0.0, 0.0, config.layers.surface, config.base_radius);
        assert_eq!(
            resolve_pick(&index, corner, DVec3::new(0.0, 3.0, 0.0), config.pick_max_distance),
            Pick::Miss(MissReason::BackFacing)
        );
    }

    #[test]
    fn test_far_pick_misses() {
        let (index, config) = testland_index(SearchBackend::RTree);
        let p = project(30.0, 0.5, config.layers.surface, config.base_radius);
        match resolve_pick(&index, p, p * 3.0, config.pick_max_distance) {
            Pick::Miss(MissReason::TooFar { distance }) => assert!(distance > config.pick_max_distance),
            other => panic!("expected a miss, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_index() {
        let index = SpatialIndex::from_points(Vec::new(), SearchBackend::RTree, 0.04);
        assert_eq!(
            resolve_pick(&index, DVec3::X, DVec3::X * 3.0, 0.15),
            Pick::Miss(MissReason::EmptyIndex)
        );
    }
}
