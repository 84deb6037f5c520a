use glam::DVec3;
use rstar::primitives::GeomWithData;
use rstar::RTree;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Which nearest-neighbour structure backs a spatial index.
/// Results agree across backends up to ties; only latency differs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SearchBackend {
    /// Bulk-loaded R*-tree
    #[default]
    RTree,
    /// Uniform 3D hash grid
    Grid,
    /// Brute-force scan
    Linear,
}

impl fmt::Display for SearchBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SearchBackend::RTree => "rtree",
            SearchBackend::Grid => "grid",
            SearchBackend::Linear => "linear",
        })
    }
}

impl FromStr for SearchBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rtree" | "tree" => Ok(SearchBackend::RTree),
            "grid" => Ok(SearchBackend::Grid),
            "linear" | "brute" => Ok(SearchBackend::Linear),
            other => Err(format!("unknown search backend '{}' (expected rtree, grid or linear)", other)),
        }
    }
}

/// A nearest-neighbour structure could not be built
#[derive(Debug, Clone, PartialEq)]
pub struct IndexUnavailable(pub String);

impl fmt::Display for IndexUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "nearest-neighbour index unavailable: {}", self.0)
    }
}

impl std::error::Error for IndexUnavailable {}

/// Nearest-point query over a fixed set of positions
pub trait NearestSearch: Send + Sync {
    /// Position index and Euclidean distance of the closest stored point
    fn nearest(&self, query: DVec3) -> Option<(usize, f64)>;

    fn backend(&self) -> SearchBackend;
}

/// Build the requested backend over `positions`.
/// Falls back to [`LinearScan`] if the structure cannot be built.
pub fn build_search(
    backend: SearchBackend,
    positions: &[DVec3],
    grid_cell_size: f64,
) -> Box<dyn NearestSearch> {
    match backend {
        SearchBackend::RTree => Box::new(RTreeSearch::build(positions)),
        SearchBackend::Grid => match SpatialGrid::build(positions, grid_cell_size) {
            Ok(grid) => Box::new(grid),
            Err(err) => {
                warn!(%err, "falling back to linear nearest-point search");
                Box::new(LinearScan::new(positions))
            }
        },
        SearchBackend::Linear => Box::new(LinearScan::new(positions)),
    }
}

/// Brute-force scan. Always available; ties resolve to the lowest index.
pub struct LinearScan {
    positions: Vec<DVec3>,
}

impl LinearScan {
    pub fn new(positions: &[DVec3]) -> Self {
        Self { positions: positions.to_vec() }
    }
}

impl NearestSearch for LinearScan {
    fn nearest(&self, query: DVec3) -> Option<(usize, f64)> {
        nearest_in(self.positions.iter().copied().enumerate(), query)
    }

    fn backend(&self) -> SearchBackend {
        SearchBackend::Linear
    }
}

#[inline]
fn nearest_in(candidates: impl Iterator<Item = (usize, DVec3)>, query: DVec3) -> Option<(usize, f64)> {
    candidates
        .fold(None, |best: Option<(usize, f64)>, (idx, p)| {
            let d2 = p.distance_squared(query);
            match best {
                Some((_, best_d2)) if best_d2 <= d2 => best,
                _ => Some((idx, d2)),
            }
        })
        .map(|(idx, d2)| (idx, d2.sqrt()))
}

type Anchor = GeomWithData<[f64; 3], usize>;

/// R*-tree over the positions, bulk loaded once
pub struct RTreeSearch {
    tree: RTree<Anchor>,
}

impl RTreeSearch {
    pub fn build(positions: &[DVec3]) -> Self {
        let anchors: Vec<Anchor> = positions
            .iter()
            .enumerate()
            .map(|(idx, p)| GeomWithData::new(p.to_array(), idx))
            .collect();
        Self { tree: RTree::bulk_load(anchors) }
    }
}

impl NearestSearch for RTreeSearch {
    fn nearest(&self, query: DVec3) -> Option<(usize, f64)> {
        self.tree
            .nearest_neighbor(&query.to_array())
            .map(|anchor| (anchor.data, DVec3::from_array(*anchor.geom()).distance(query)))
    }

    fn backend(&self) -> SearchBackend {
        SearchBackend::RTree
    }
}

type Cell = (i32, i32, i32);

/// Spatial hash grid over 3D positions.
/// Divides space into cubic cells; a query walks outward shell by shell
/// until no unvisited cell can hold anything closer than the best hit.
pub struct SpatialGrid {
    /// Position indices per occupied cell
    cells: HashMap<Cell, Vec<usize>>,
    positions: Vec<DVec3>,
    /// Cell edge length in world units
    cell_size: f64,
    /// Inclusive bounds of occupied cells
    min_cell: Cell,
    max_cell: Cell,
}

impl SpatialGrid {
    pub fn build(positions: &[DVec3], cell_size: f64) -> Result<Self, IndexUnavailable> {
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(IndexUnavailable(format!("grid cell size {} is not positive", cell_size)));
        }

        let limit = (i32::MAX / 4) as f64;
        let mut cells: HashMap<Cell, Vec<usize>> = HashMap::new();
        let mut min_cell = (i32::MAX, i32::MAX, i32::MAX);
        let mut max_cell = (i32::MIN, i32::MIN, i32::MIN);

        for (idx, p) in positions.iter().enumerate() {
            let scaled = *p / cell_size;
            if !scaled.is_finite() || scaled.abs().max_element() > limit {
                return Err(IndexUnavailable(format!("position {:?} cannot be bucketed", p)));
            }
            let cell = cell_of(*p, cell_size);
            min_cell = (min_cell.0.min(cell.0), min_cell.1.min(cell.1), min_cell.2.min(cell.2));
            max_cell = (max_cell.0.max(cell.0), max_cell.1.max(cell.1), max_cell.2.max(cell.2));
            cells.entry(cell).or_default().push(idx);
        }

        Ok(Self {
            cells,
            positions: positions.to_vec(),
            cell_size,
            min_cell,
            max_cell,
        })
    }

    /// Number of occupied cells
    #[inline(always)]
    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    /// Indices stored in every cell at Chebyshev distance exactly `r` from `center`
    fn visit_shell(&self, center: Cell, r: i32, mut visit: impl FnMut(usize)) {
        let mut visit_cell = |cell: Cell| {
            if let Some(indices) = self.cells.get(&cell) {
                indices.iter().for_each(|&i| visit(i));
            }
        };

        for dx in -r..=r {
            for dy in -r..=r {
                if dx.abs() == r || dy.abs() == r {
                    for dz in -r..=r {
                        visit_cell((center.0 + dx, center.1 + dy, center.2 + dz));
                    }
                } else if r == 0 {
                    visit_cell(center);
                } else {
                    visit_cell((center.0 + dx, center.1 + dy, center.2 - r));
                    visit_cell((center.0 + dx, center.1 + dy, center.2 + r));
                }
            }
        }
    }

    /// Shells needed to cover every occupied cell from `center`
    fn max_shell(&self, center: Cell) -> i64 {
        let span = |c: i32, lo: i32, hi: i32| (c as i64 - lo as i64).abs().max((hi as i64 - c as i64).abs());
        span(center.0, self.min_cell.0, self.max_cell.0)
            .max(span(center.1, self.min_cell.1, self.max_cell.1))
            .max(span(center.2, self.min_cell.2, self.max_cell.2))
    }
}

#[inline(always)]
fn cell_of(p: DVec3, cell_size: f64) -> Cell {
    let c = (p / cell_size).floor();
    (c.x as i32, c.y as i32, c.z as i32)
}

impl NearestSearch for SpatialGrid {
    fn nearest(&self, query: DVec3) -> Option<(usize, f64)> {
        if self.positions.is_empty() || !query.is_finite() {
            return None;
        }

        let scaled = query / self.cell_size;
        if scaled.abs().max_element() > (i32::MAX / 4) as f64 {
            return nearest_in(self.positions.iter().copied().enumerate(), query);
        }

        let center = cell_of(query, self.cell_size);
        let max_shell = self.max_shell(center);
        let mut best: Option<(usize, f64)> = None;

        let mut r: i64 = 0;
        while r <= max_shell {
            // Once a shell holds more cells than are occupied, a flat scan is cheaper
            let shell_volume = (2 * r + 1).pow(3);
            if r > 0 && shell_volume > 2 * self.cells.len() as i64 {
                return nearest_in(self.positions.iter().copied().enumerate(), query);
            }

            self.visit_shell(center, r as i32, |idx| {
                let d2 = self.positions[idx].distance_squared(query);
                match best {
                    Some((best_idx, best_d2)) if best_d2 < d2 || (best_d2 == d2 && best_idx < idx) => {}
                    _ => best = Some((idx, d2)),
                }
            });

            // Anything beyond shell r is at least r whole cells away
            if let Some((_, d2)) = best {
                let reach = r as f64 * self.cell_size;
                if d2 <= reach * reach {
                    break;
                }
            }
            r += 1;
        }

        best.map(|(idx, d2)| (idx, d2.sqrt()))
    }

    fn backend(&self) -> SearchBackend {
        SearchBackend::Grid
    }
}
