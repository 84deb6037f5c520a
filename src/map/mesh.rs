use glam::{DVec2, DVec3};
use std::collections::HashMap;
use tracing::debug;

use crate::geo::{Country, Polygon, RingDefect};
use crate::map::projection::project_batch;

/// Triangle mesh on the sphere: vertex buffer plus triangle index buffer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<DVec3>,
    pub triangles: Vec<[u32; 3]>,
}

impl Mesh {
    /// Append another mesh, offsetting its indices. Vertices are not welded.
    pub fn append(&mut self, other: Mesh) {
        let offset = self.vertices.len() as u32;
        self.vertices.extend(other.vertices);
        self.triangles.extend(
            other
                .triangles
                .into_iter()
                .map(|[a, b, c]| [a + offset, b + offset, c + offset]),
        );
    }

    /// Mean vertex position, `None` for an empty mesh
    pub fn centroid(&self) -> Option<DVec3> {
        if self.vertices.is_empty() {
            return None;
        }
        let sum: DVec3 = self.vertices.iter().copied().sum();
        Some(sum / self.vertices.len() as f64)
    }

    /// Edges referenced by exactly one triangle: the outline of each part.
    /// Returned in triangle order.
    pub fn boundary_edges(&self) -> Vec<[u32; 2]> {
        let mut uses: HashMap<(u32, u32), u32> = HashMap::with_capacity(self.triangles.len() * 3);
        for tri in &self.triangles {
            for (a, b) in tri_edges(tri) {
                *uses.entry(edge_key(a, b)).or_insert(0) += 1;
            }
        }

        self.triangles
            .iter()
            .flat_map(tri_edges)
            .filter(|&(a, b)| uses.get(&edge_key(a, b)) == Some(&1))
            .map(|(a, b)| [a, b])
            .collect()
    }
}

#[inline(always)]
fn tri_edges(tri: &[u32; 3]) -> [(u32, u32); 3] {
    [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])]
}

#[inline(always)]
fn edge_key(a: u32, b: u32) -> (u32, u32) {
    if a < b { (a, b) } else { (b, a) }
}

/// Bends flat lon/lat rings onto the sphere.
///
/// Each ring is ear-clipped in the lon/lat plane, refined by one level of
/// linear subdivision (every triangle split into four) and only then
/// projected, which keeps large flat triangles from cutting visibly
/// through the sphere. Connectivity is reused unchanged after projection.
#[derive(Clone, Copy, Debug)]
pub struct MeshBuilder {
    radius: f64,
}

impl MeshBuilder {
    pub fn new(radius: f64) -> Self {
        Self { radius }
    }

    /// Mesh a single ring at `altitude`
    pub fn build_polygon(&self, polygon: &Polygon, altitude: f64) -> Result<Mesh, RingDefect> {
        let flat_triangles = polygon.triangulate()?;
        let (vertices_2d, triangles) = subdivide(polygon.points(), &flat_triangles);

        Ok(Mesh {
            vertices: project_batch(&vertices_2d, altitude, self.radius),
            triangles,
        })
    }

    /// Mesh every usable ring of a country and merge the parts.
    /// Defective rings are skipped; `None` when no ring survives.
    pub fn build_country(&self, country: &Country, altitude: f64) -> Option<Mesh> {
        let mut merged: Option<Mesh> = None;
        for (i, polygon) in country.polygons.iter().enumerate() {
            match self.build_polygon(polygon, altitude) {
                Ok(part) => match merged.as_mut() {
                    Some(mesh) => mesh.append(part),
                    None => merged = Some(part),
                },
                Err(defect) => {
                    debug!(country = %country.name, ring = i, %defect, "dropping ring from mesh");
                }
            }
        }
        merged
    }
}

/// One level of linear subdivision. Midpoints are shared between the two
/// triangles on either side of an edge, so the result stays watertight.
fn subdivide(vertices: &[DVec2], triangles: &[[u32; 3]]) -> (Vec<DVec2>, Vec<[u32; 3]>) {
    let mut out_vertices = vertices.to_vec();
    let mut out_triangles = Vec::with_capacity(triangles.len() * 4);
    let mut midpoints: HashMap<(u32, u32), u32> = HashMap::with_capacity(triangles.len() * 3 / 2);

    let mut midpoint = |a: u32, b: u32, verts: &mut Vec<DVec2>| -> u32 {
        *midpoints.entry(edge_key(a, b)).or_insert_with(|| {
            let mid = (verts[a as usize] + verts[b as usize]) * 0.5;
            verts.push(mid);
            (verts.len() - 1) as u32
        })
    };

    for &[a, b, c] in triangles {
        let ab = midpoint(a, b, &mut out_vertices);
        let bc = midpoint(b, c, &mut out_vertices);
        let ca = midpoint(c, a, &mut out_vertices);
        out_triangles.push([a, ab, ca]);
        out_triangles.push([ab, b, bc]);
        out_triangles.push([ca, bc, c]);
        out_triangles.push([ab, bc, ca]);
    }

    (out_vertices, out_triangles)
}
