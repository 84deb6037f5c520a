use glam::{DVec2, DVec3};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::info;

use crate::config::{GlobeConfig, SamplingConfig};
use crate::geo::{Country, CountrySet, Polygon};
use crate::map::projection::project_batch;
use crate::map::spatial::{build_search, NearestSearch, SearchBackend};

/// A pick anchor: a surface position tagged with its country
#[derive(Debug, Clone, PartialEq)]
pub struct SampledPoint {
    pub position: DVec3,
    /// Shared name of the owning country
    pub country: Arc<str>,
}

/// Reverse lookup from a surface point to the country under it.
///
/// Each country is covered by anchors interpolated along its ring edges plus
/// a grid over each ring's interior, projected to the surface layer. A pick
/// resolves to the owner of the nearest anchor.
pub struct SpatialIndex {
    points: Vec<SampledPoint>,
    search: Box<dyn NearestSearch>,
}

impl SpatialIndex {
    /// Sample every country and build the configured search backend.
    /// Countries are sampled in parallel; anchors keep country iteration order.
    pub fn build(countries: &CountrySet, config: &GlobeConfig) -> Self {
        let radius = config.base_radius;
        let altitude = config.layers.surface;
        let sampling = config.sampling;

        let per_country: Vec<Vec<SampledPoint>> = countries
            .as_slice()
            .par_iter()
            .map(|country| sample_country(country, &sampling, altitude, radius))
            .collect();

        let points: Vec<SampledPoint> = per_country.into_iter().flatten().collect();
        Self::from_points(points, config.search, config.grid_cell_size)
    }

    /// Index an explicit anchor set
    pub fn from_points(points: Vec<SampledPoint>, backend: SearchBackend, grid_cell_size: f64) -> Self {
        let positions: Vec<DVec3> = points.iter().map(|p| p.position).collect();
        let search = build_search(backend, &positions, grid_cell_size);
        info!(
            anchors = points.len(),
            backend = %search.backend(),
            "spatial index ready"
        );
        Self { points, search }
    }

    /// Closest anchor to `query` and its Euclidean distance
    pub fn nearest(&self, query: DVec3) -> Option<(&SampledPoint, f64)> {
        self.search
            .nearest(query)
            .and_then(|(idx, dist)| self.points.get(idx).map(|p| (p, dist)))
    }

    pub fn points(&self) -> &[SampledPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Backend actually in use (after any fallback)
    pub fn backend(&self) -> SearchBackend {
        self.search.backend()
    }
}

/// All anchors for one country, boundary first then interior, ring by ring
pub fn sample_country(
    country: &Country,
    sampling: &SamplingConfig,
    altitude: f64,
    radius: f64,
) -> Vec<SampledPoint> {
    let name: Arc<str> = Arc::from(country.name.as_str());
    let mut flat: Vec<DVec2> = Vec::new();

    for polygon in &country.polygons {
        flat.extend(sample_boundary(polygon, sampling.boundary_step_deg));
        flat.extend(sample_interior(polygon, sampling.interior_step_deg));
    }

    project_batch(&flat, altitude, radius)
        .into_iter()
        .map(|position| SampledPoint {
            position,
            country: Arc::clone(&name),
        })
        .collect()
}

/// Evenly spaced points along every edge, endpoints included.
/// Each edge gets `max(2, floor(length / step))` points.
pub fn sample_boundary(polygon: &Polygon, step: f64) -> Vec<DVec2> {
    let mut out = Vec::new();
    for (a, b) in polygon.edges() {
        let count = ((a.distance(b) / step).floor() as usize).max(2);
        let last = (count - 1) as f64;
        out.extend((0..count).map(|i| a.lerp(b, i as f64 / last)));
    }
    out
}

/// Regular grid over the ring's bounding box, starting at its minimum corner,
/// keeping only points strictly inside the ring
pub fn sample_interior(polygon: &Polygon, step: f64) -> Vec<DVec2> {
    let (min, max) = polygon.bbox();
    let cols = grid_steps(min.x, max.x, step);
    let rows = grid_steps(min.y, max.y, step);

    let mut out = Vec::new();
    for row in 0..rows {
        let lat = min.y + row as f64 * step;
        for col in 0..cols {
            let p = DVec2::new(min.x + col as f64 * step, lat);
            if polygon.contains_strict(p) {
                out.push(p);
            }
        }
    }
    out
}

/// Number of samples in `[start, end)` at `step`
#[inline]
fn grid_steps(start: f64, end: f64, step: f64) -> usize {
    if end <= start {
        0
    } else {
        ((end - start) / step).ceil() as usize
    }
}
