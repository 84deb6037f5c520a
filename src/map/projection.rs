use glam::{DVec2, DVec3};
use rayon::prelude::*;

use crate::config::GlobeConfig;

/// Batches at least this long are projected in parallel
const PAR_BATCH_MIN: usize = 4096;

/// Named rendering layer; resolved to a radius multiplier through [`GlobeConfig`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AltitudeLayer {
    Surface,
    Border,
    Highlight,
}

impl AltitudeLayer {
    #[inline]
    pub fn factor(self, config: &GlobeConfig) -> f64 {
        match self {
            AltitudeLayer::Surface => config.layers.surface,
            AltitudeLayer::Border => config.layers.border,
            AltitudeLayer::Highlight => config.layers.highlight,
        }
    }

    /// World-space radius of this layer
    #[inline]
    pub fn radius(self, config: &GlobeConfig) -> f64 {
        config.layer_radius(self.factor(config))
    }
}

/// Spherical to Cartesian: lon/lat in degrees on a sphere of `radius * altitude`.
/// Inputs are not range-clamped.
#[inline(always)]
pub fn project(lon: f64, lat: f64, altitude: f64, radius: f64) -> DVec3 {
    let r = radius * altitude;
    let (sin_lon, cos_lon) = lon.to_radians().sin_cos();
    let (sin_lat, cos_lat) = lat.to_radians().sin_cos();
    DVec3::new(r * cos_lat * cos_lon, r * cos_lat * sin_lon, r * sin_lat)
}

/// [`project`] for a point stored as `DVec2(lon, lat)`
#[inline(always)]
pub fn project_point(p: DVec2, altitude: f64, radius: f64) -> DVec3 {
    project(p.x, p.y, altitude, radius)
}

/// Project a batch of (lon, lat) points, preserving order
pub fn project_batch(points: &[DVec2], altitude: f64, radius: f64) -> Vec<DVec3> {
    if points.len() >= PAR_BATCH_MIN {
        points
            .par_iter()
            .map(|&p| project_point(p, altitude, radius))
            .collect()
    } else {
        points
            .iter()
            .map(|&p| project_point(p, altitude, radius))
            .collect()
    }
}

/// Inverse of [`project`] for the direction only: (lon, lat) degrees of `p`
#[inline]
pub fn unproject(p: DVec3) -> (f64, f64) {
    let len = p.length();
    if len == 0.0 {
        return (0.0, 0.0);
    }
    let lat = (p.z / len).clamp(-1.0, 1.0).asin().to_degrees();
    let lon = p.y.atan2(p.x).to_degrees();
    (lon, lat)
}
