use anyhow::{ensure, Result};

use crate::map::spatial::SearchBackend;

/// Radius multipliers for each rendering layer.
/// Must be strictly increasing so layers never z-fight.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AltitudeLayers {
    /// Country fill, also the altitude of every sampled pick anchor
    pub surface: f64,
    /// Boundary polylines, just above the fill
    pub border: f64,
    /// Selected country overlay, above everything else
    pub highlight: f64,
}

impl Default for AltitudeLayers {
    fn default() -> Self {
        Self {
            surface: 1.025,
            border: 1.027,
            highlight: 1.035,
        }
    }
}

/// Density of the pick-anchor point cloud, in degrees of lon/lat.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplingConfig {
    /// Target spacing of points interpolated along each ring edge
    pub boundary_step_deg: f64,
    /// Spacing of the interior grid; coarser than the boundary step
    pub interior_step_deg: f64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            boundary_step_deg: 0.15,
            interior_step_deg: 0.4,
        }
    }
}

/// Central configuration for building and querying a globe.
///
/// Every tunable of the geometry pipeline. Sampling steps and pick distance
/// are only meaningful relative to the sphere radius and data resolution.
///
/// `Default` matches a unit sphere with 110m-resolution Natural Earth data.
/// Use [`GlobeConfig::with_base_radius`] to move to another radius while
/// keeping distance-type values proportional.
#[derive(Clone, Debug, PartialEq)]
pub struct GlobeConfig {
    /// Radius of the ocean sphere in world units
    pub base_radius: f64,
    pub layers: AltitudeLayers,
    pub sampling: SamplingConfig,
    /// Farthest a pick may land from its nearest anchor and still hit (world units)
    pub pick_max_distance: f64,
    /// Nearest-neighbour backend used by the spatial index
    pub search: SearchBackend,
    /// Cell edge length for [`SearchBackend::Grid`] (world units)
    pub grid_cell_size: f64,
    /// Camera distance from the centre when focusing a country (world units)
    pub camera_distance: f64,
}

impl Default for GlobeConfig {
    fn default() -> Self {
        Self {
            base_radius: 1.0,
            layers: AltitudeLayers::default(),
            sampling: SamplingConfig::default(),
            pick_max_distance: 0.15,
            search: SearchBackend::RTree,
            grid_cell_size: 0.04,
            camera_distance: 3.5,
        }
    }
}

impl GlobeConfig {
    /// Change the base radius, scaling every distance-type tunable with it.
    /// Angular sampling steps are unaffected.
    pub fn with_base_radius(mut self, radius: f64) -> Self {
        let scale = radius / self.base_radius;
        self.base_radius = radius;
        self.pick_max_distance *= scale;
        self.grid_cell_size *= scale;
        self.camera_distance *= scale;
        self
    }

    /// World-space radius of a layer
    #[inline]
    pub fn layer_radius(&self, altitude: f64) -> f64 {
        self.base_radius * altitude
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.base_radius.is_finite() && self.base_radius > 0.0,
            "base radius must be positive, got {}",
            self.base_radius
        );

        let AltitudeLayers { surface, border, highlight } = self.layers;
        ensure!(
            surface > 0.0 && surface < border && border < highlight,
            "altitude layers must satisfy 0 < surface < border < highlight, got {} / {} / {}",
            surface,
            border,
            highlight
        );

        let SamplingConfig { boundary_step_deg, interior_step_deg } = self.sampling;
        ensure!(
            boundary_step_deg > 0.0 && boundary_step_deg.is_finite(),
            "boundary step must be positive, got {}",
            boundary_step_deg
        );
        ensure!(
            interior_step_deg >= boundary_step_deg && interior_step_deg.is_finite(),
            "interior step ({}) must be finite and no finer than the boundary step ({})",
            interior_step_deg,
            boundary_step_deg
        );

        ensure!(
            self.pick_max_distance > 0.0,
            "pick distance must be positive, got {}",
            self.pick_max_distance
        );
        ensure!(
            self.camera_distance > self.layer_radius(highlight),
            "camera distance {} is inside the globe",
            self.camera_distance
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        GlobeConfig::default().validate().unwrap();
    }

    #[test]
    fn test_layers_must_increase() {
        let mut config = GlobeConfig::default();
        config.layers.border = config.layers.highlight;
        assert!(config.validate().is_err());

        config.layers = AltitudeLayers { surface: 1.03, border: 1.02, highlight: 1.04 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_interior_not_finer_than_boundary() {
        let mut config = GlobeConfig::default();
        config.sampling.interior_step_deg = 0.05;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_with_base_radius_scales_distances() {
        let config = GlobeConfig::default().with_base_radius(10.0);
        assert!((config.pick_max_distance - 1.5).abs() < 1e-12);
        assert!((config.grid_cell_size - 0.4).abs() < 1e-12);
        assert!((config.camera_distance - 35.0).abs() < 1e-12);
        assert_eq!(config.sampling, SamplingConfig::default());
        assert!((config.layer_radius(config.layers.surface) - 10.25).abs() < 1e-12);
        config.validate().unwrap();
    }
}
