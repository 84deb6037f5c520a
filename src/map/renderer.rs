use std::f64::consts::TAU;

use glam::DVec3;

use crate::braille::BrailleCanvas;
use crate::map::geometry::{draw_line, fill_triangle, segment_might_be_visible, Pixel};
use crate::map::globe::GlobeViewport;
use crate::map::mesh::Mesh;
use crate::scene::Scene;

/// Segments used for the globe's silhouette
const LIMB_SEGMENTS: usize = 180;

/// Display settings for globe layers
#[derive(Clone)]
pub struct DisplaySettings {
    pub show_land: bool,
    pub show_borders: bool,
    pub show_limb: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_land: true,
            show_borders: true,
            show_limb: true,
        }
    }
}

/// One canvas per layer, so each can be drawn in its own colour
pub struct GlobeLayers {
    pub limb: BrailleCanvas,
    pub land: BrailleCanvas,
    pub borders: BrailleCanvas,
    pub highlight: BrailleCanvas,
}

#[derive(Default)]
pub struct GlobeRenderer {
    pub settings: DisplaySettings,
}

impl GlobeRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rasterize the scene as seen through `viewport` onto `width` x `height` character canvases.
    /// The highlight layer is drawn only for `overlay`, the country the caller currently shows.
    pub fn render(
        &self,
        scene: &Scene,
        overlay: Option<&str>,
        viewport: &GlobeViewport,
        width: usize,
        height: usize,
    ) -> GlobeLayers {
        let mut layers = GlobeLayers {
            limb: BrailleCanvas::new(width, height),
            land: BrailleCanvas::new(width, height),
            borders: BrailleCanvas::new(width, height),
            highlight: BrailleCanvas::new(width, height),
        };

        if self.settings.show_limb {
            draw_limb(&mut layers.limb, viewport, scene.config().base_radius);
        }

        if self.settings.show_land {
            for country in scene.base_meshes() {
                fill_mesh(&mut layers.land, &country.mesh, viewport);
            }
        }

        if self.settings.show_borders {
            for line in scene.border_lines() {
                draw_ring(&mut layers.borders, line, viewport);
            }
        }

        let highlight = scene
            .selection()
            .highlight()
            .filter(|h| overlay == Some(h.country.as_str()))
            .and_then(|h| h.mesh.as_ref());
        if let Some(mesh) = highlight {
            fill_mesh(&mut layers.highlight, mesh, viewport);
            for [a, b] in mesh.boundary_edges() {
                let (a, b) = (mesh.vertices[a as usize], mesh.vertices[b as usize]);
                draw_segment(&mut layers.highlight, a, b, viewport);
            }
        }

        layers
    }
}

/// Fill every triangle whose corners all face the viewer
fn fill_mesh(canvas: &mut BrailleCanvas, mesh: &Mesh, viewport: &GlobeViewport) {
    let projected: Vec<Option<Pixel>> = mesh.vertices.iter().map(|&v| viewport.project(v)).collect();
    for tri in &mesh.triangles {
        let corners = (
            projected[tri[0] as usize],
            projected[tri[1] as usize],
            projected[tri[2] as usize],
        );
        if let (Some(a), Some(b), Some(c)) = corners {
            fill_triangle(canvas, a, b, c);
        }
    }
}

/// Closed polyline, closing edge included
fn draw_ring(canvas: &mut BrailleCanvas, ring: &[DVec3], viewport: &GlobeViewport) {
    if ring.len() < 2 {
        return;
    }
    let closing = ring.last().copied().zip(ring.first().copied());
    for (a, b) in ring.windows(2).map(|w| (w[0], w[1])).chain(closing) {
        draw_segment(canvas, a, b, viewport);
    }
}

fn draw_segment(canvas: &mut BrailleCanvas, a: DVec3, b: DVec3, viewport: &GlobeViewport) {
    let (Some(p0), Some(p1)) = (viewport.project(a), viewport.project(b)) else {
        return;
    };
    // Long jumps come from edges crossing the horizon
    let dist = ((p1.0 - p0.0).abs() + (p1.1 - p0.1).abs()) as usize;
    if dist < viewport.width.max(1) && segment_might_be_visible(canvas, p0, p1) {
        draw_line(canvas, p0, p1);
    }
}

/// Silhouette of the sphere
fn draw_limb(canvas: &mut BrailleCanvas, viewport: &GlobeViewport, base_radius: f64) {
    let r = viewport.radius * base_radius;
    let (cx, cy) = (viewport.width as f64 / 2.0, viewport.height as f64 / 2.0);
    let point = |i: usize| -> Pixel {
        let (sin_a, cos_a) = (TAU * i as f64 / LIMB_SEGMENTS as f64).sin_cos();
        ((cx + r * cos_a) as i32, (cy + r * sin_a) as i32)
    };
    for i in 0..LIMB_SEGMENTS {
        let (p0, p1) = (point(i), point(i + 1));
        if segment_might_be_visible(canvas, p0, p1) {
            draw_line(canvas, p0, p1);
        }
    }
}
