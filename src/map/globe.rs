use glam::DVec3;

use crate::map::projection::{project, unproject};

/// Smallest sphere radius as a fraction of canvas width
const MIN_RADIUS_FRAC: f64 = 0.35;
/// Largest sphere radius as a multiple of canvas width
const MAX_RADIUS_FRAC: f64 = 35.0;

/// Orthographic view of the globe from outside.
/// Orientation is an orthonormal basis; `forward` points from the centre
/// towards the viewer, so a world point faces the viewer when it has a
/// positive component along `forward`.
#[derive(Clone, Debug)]
pub struct GlobeViewport {
    forward: DVec3,
    /// Screen x axis (east at the view centre)
    right: DVec3,
    /// Screen y axis (north at the view centre)
    up: DVec3,
    /// Braille pixels per world unit (controls zoom)
    pub radius: f64,
    /// Radius of the globe in world units
    globe_radius: f64,
    /// Canvas pixel width
    pub width: usize,
    /// Canvas pixel height
    pub height: usize,
}

impl GlobeViewport {
    /// View centred on (lon, lat) degrees
    pub fn new(center_lon: f64, center_lat: f64, radius: f64, width: usize, height: usize) -> Self {
        let mut vp = Self {
            forward: DVec3::X,
            right: DVec3::Y,
            up: DVec3::Z,
            radius,
            globe_radius: 1.0,
            width,
            height,
        };
        vp.look_at(project(center_lon, center_lat, 1.0, 1.0));
        vp
    }

    /// Whole globe of `globe_radius` world units fits the canvas
    pub fn fit(center_lon: f64, center_lat: f64, globe_radius: f64, width: usize, height: usize) -> Self {
        let mut vp = Self::new(center_lon, center_lat, 1.0, width, height);
        vp.globe_radius = globe_radius;
        vp.radius = vp.fit_radius();
        vp
    }

    pub fn globe_radius(&self) -> f64 {
        self.globe_radius
    }

    /// Pixels per world unit at which the globe's disk spans 70% of the canvas
    fn fit_radius(&self) -> f64 {
        let span = self.width.min(self.height * 2) as f64;
        (span * MIN_RADIUS_FRAC).max(1.0) / self.globe_radius
    }

    /// Re-centre on a direction from the globe centre, keeping north up
    pub fn look_at(&mut self, direction: DVec3) {
        let Some(forward) = direction.try_normalize() else {
            return;
        };
        // Derivative of forward w.r.t. latitude points north; degenerate at the poles
        let (lon, lat) = unproject(forward);
        let (sin_lon, cos_lon) = lon.to_radians().sin_cos();
        let (sin_lat, cos_lat) = lat.to_radians().sin_cos();
        let north = DVec3::new(-sin_lat * cos_lon, -sin_lat * sin_lon, cos_lat);

        let right = north.cross(forward).try_normalize().unwrap_or(DVec3::Y);
        self.forward = forward;
        self.right = right;
        self.up = forward.cross(right).normalize();
    }

    /// Lon/lat at the view centre
    pub fn center_lonlat(&self) -> (f64, f64) {
        unproject(self.forward)
    }

    /// Camera position at `distance` from the centre along the view axis
    pub fn camera_position(&self, distance: f64) -> DVec3 {
        self.forward * distance
    }

    /// Project a world point to screen pixels.
    /// Returns `None` for points on the hidden hemisphere.
    pub fn project(&self, p: DVec3) -> Option<(i32, i32)> {
        if p.dot(self.forward) < 0.0 {
            return None;
        }
        let sx = p.dot(self.right);
        let sy = p.dot(self.up);
        let px = (self.width as f64 / 2.0 + sx * self.radius) as i32;
        let py = (self.height as f64 / 2.0 - sy * self.radius) as i32;
        Some((px, py))
    }

    /// Cast a view ray through a pixel onto a sphere of `sphere_radius`.
    /// Returns the visible intersection, or `None` when the ray misses.
    pub fn surface_point(&self, px: i32, py: i32, sphere_radius: f64) -> Option<DVec3> {
        let sx = (px as f64 - self.width as f64 / 2.0) / self.radius;
        let sy = -(py as f64 - self.height as f64 / 2.0) / self.radius;

        let r2 = sphere_radius * sphere_radius;
        let d2 = sx * sx + sy * sy;
        if d2 > r2 {
            return None;
        }
        let sz = (r2 - d2).sqrt();
        Some(self.right * sx + self.up * sy + self.forward * sz)
    }

    /// Rotate about the screen `up` axis
    fn yaw(&mut self, angle: f64) {
        if angle.abs() > 1e-10 {
            let (sin_a, cos_a) = angle.sin_cos();
            let forward = self.forward * cos_a + self.right * sin_a;
            let right = self.right * cos_a - self.forward * sin_a;
            self.forward = forward.normalize();
            self.right = right.normalize();
        }
    }

    /// Rotate about the screen `right` axis
    fn pitch(&mut self, angle: f64) {
        if angle.abs() > 1e-10 {
            let (sin_a, cos_a) = angle.sin_cos();
            let forward = self.forward * cos_a + self.up * sin_a;
            let up = self.up * cos_a - self.forward * sin_a;
            self.forward = forward.normalize();
            self.up = up.normalize();
        }
    }

    /// Rotate the globe by a pixel drag delta.
    /// Positive dx = dragged left, so the view centre moves east.
    pub fn rotate_drag(&mut self, dx: i32, dy: i32) {
        let pixels_per_radian = self.radius * self.globe_radius;
        self.yaw(dx as f64 / pixels_per_radian);
        self.pitch(-(dy as f64) / pixels_per_radian);
    }

    fn radius_bounds(&self) -> (f64, f64) {
        let min_r = self.fit_radius();
        let max_r = self.width.max(1) as f64 * MAX_RADIUS_FRAC / self.globe_radius;
        (min_r, max_r.max(min_r))
    }

    pub fn zoom_in(&mut self) {
        self.zoom_by(1.5);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_by(1.0 / 1.5);
    }

    fn zoom_by(&mut self, factor: f64) {
        let (min_r, max_r) = self.radius_bounds();
        self.radius = (self.radius * factor).clamp(min_r, max_r);
    }

    /// Zoom towards a pixel, keeping the point under the cursor in place
    pub fn zoom_in_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.5);
    }

    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.0 / 1.5);
    }

    fn zoom_at(&mut self, px: i32, py: i32, factor: f64) {
        let target = self.surface_point(px, py, self.globe_radius);
        self.zoom_by(factor);

        if let Some(target) = target {
            let sx_now = target.dot(self.right);
            let sy_now = target.dot(self.up);
            let sx_want = (px as f64 - self.width as f64 / 2.0) / self.radius;
            let sy_want = -(py as f64 - self.height as f64 / 2.0) / self.radius;
            self.yaw(-(sx_want - sx_now) / self.globe_radius);
            self.pitch(-(sy_want - sy_now) / self.globe_radius);
        }
    }

    /// Zoom relative to the whole-globe view
    pub fn effective_zoom(&self) -> f64 {
        self.radius / self.fit_radius()
    }

    pub fn set_size(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
    }
}
