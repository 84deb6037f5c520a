use anyhow::Result;
use glam::DVec3;
use rayon::prelude::*;
use std::time::Instant;
use tracing::info;

use crate::config::GlobeConfig;
use crate::geo::CountrySet;
use crate::index::SpatialIndex;
use crate::map::mesh::{Mesh, MeshBuilder};
use crate::map::projection::{project_batch, AltitudeLayer};
use crate::pick::{resolve_pick, Pick};
use crate::selection::{HighlightEvent, Selection, SelectionState};

/// A country's fill mesh on the surface layer
pub struct CountryMesh {
    pub country: String,
    pub mesh: Mesh,
}

/// Everything built once from a loaded dataset, plus the live selection.
///
/// Geometry and the index are read-only after [`Scene::build`]; only the
/// selection changes, and only through `&mut self`.
pub struct Scene {
    config: GlobeConfig,
    countries: CountrySet,
    base_meshes: Vec<CountryMesh>,
    border_lines: Vec<Vec<DVec3>>,
    index: SpatialIndex,
    selection: Selection,
}

impl Scene {
    pub fn build(countries: CountrySet, config: GlobeConfig) -> Result<Self> {
        config.validate()?;
        let start = Instant::now();

        let builder = MeshBuilder::new(config.base_radius);
        let surface = config.layers.surface;
        let base_meshes: Vec<CountryMesh> = countries
            .as_slice()
            .par_iter()
            .filter_map(|country| {
                builder.build_country(country, surface).map(|mesh| CountryMesh {
                    country: country.name.clone(),
                    mesh,
                })
            })
            .collect();

        let border = config.layers.border;
        let border_lines: Vec<Vec<DVec3>> = countries
            .iter()
            .flat_map(|country| &country.polygons)
            .map(|polygon| project_batch(polygon.points(), border, config.base_radius))
            .collect();

        let index = SpatialIndex::build(&countries, &config);
        let selection = Selection::new(&config);

        info!(
            countries = countries.len(),
            vertices = countries.iter().map(|c| c.vertex_count()).sum::<usize>(),
            meshes = base_meshes.len(),
            anchors = index.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "scene built"
        );

        Ok(Self {
            config,
            countries,
            base_meshes,
            border_lines,
            index,
            selection,
        })
    }

    /// Resolve a pick from the interaction layer. Never touches the selection.
    pub fn resolve_pick(&self, point: DVec3, camera: DVec3) -> Pick<'_> {
        resolve_pick(&self.index, point, camera, self.config.pick_max_distance)
    }

    /// Select by case-insensitive substring
    pub fn select(&mut self, query: &str) -> Option<&str> {
        self.selection.select(query, &self.countries)
    }

    /// Select by exact stored name
    pub fn select_exact(&mut self, name: &str) -> Option<&str> {
        self.selection.select_exact(name, &self.countries)
    }

    pub fn clear(&mut self) {
        self.selection.clear();
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selection_state(&self) -> SelectionState {
        self.selection.state()
    }

    pub fn drain_events(&mut self) -> Vec<HighlightEvent> {
        self.selection.drain_events()
    }

    /// Unit direction from the centre towards the selected country's highlight
    pub fn focus_direction(&self) -> Option<DVec3> {
        let mesh = self.selection.highlight()?.mesh.as_ref()?;
        mesh.centroid().and_then(|c| c.try_normalize())
    }

    /// Camera position looking at the selected country
    pub fn focus_camera(&self) -> Option<DVec3> {
        self.focus_direction().map(|d| d * self.config.camera_distance)
    }

    pub fn base_meshes(&self) -> &[CountryMesh] {
        &self.base_meshes
    }

    /// Every ring as a closed polyline on the border layer (closing edge implicit)
    pub fn border_lines(&self) -> &[Vec<DVec3>] {
        &self.border_lines
    }

    pub fn countries(&self) -> &CountrySet {
        &self.countries
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    pub fn config(&self) -> &GlobeConfig {
        &self.config
    }

    /// Radius of a layer in world units
    pub fn layer_radius(&self, layer: AltitudeLayer) -> f64 {
        layer.radius(&self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::projection::project;

    fn scene() -> Scene {
        let mut set = CountrySet::new();
        set.insert_lonlat(
            "Testland",
            vec![vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]],
        );
        set.insert_lonlat(
            "Islandia",
            vec![
                vec![(40.0, 10.0), (42.0, 10.0), (42.0, 12.0), (40.0, 12.0)],
                vec![(45.0, 10.0), (46.0, 10.0), (46.0, 11.0)],
            ],
        );
        Scene::build(set, GlobeConfig::default()).unwrap()
    }

    #[test]
    fn test_build_layers() {
        let scene = scene();
        assert_eq!(scene.base_meshes().len(), 2);
        assert_eq!(scene.border_lines().len(), 3);

        let border_r = scene.layer_radius(AltitudeLayer::Border);
        for line in scene.border_lines() {
            assert!(line.iter().all(|p| (p.length() - border_r).abs() < 1e-12));
        }
        let surface_r = scene.layer_radius(AltitudeLayer::Surface);
        for cm in scene.base_meshes() {
            assert!(cm.mesh.vertices.iter().all(|p| (p.length() - surface_r).abs() < 1e-12));
        }
    }

    #[test]
    fn test_pick_then_select() {
        let mut scene = scene();
        let p = project(0.5, 0.5, scene.config().layers.surface, 1.0);
        let name = scene.resolve_pick(p, p * 3.0).country().map(str::to_owned);
        assert_eq!(name.as_deref(), Some("Testland"));

        assert_eq!(scene.select_exact("Testland"), Some("Testland"));
        assert_eq!(scene.selection_state(), SelectionState::Selected("Testland".into()));

        // pick resolution is side-effect free
        assert!(scene.resolve_pick(-p, p * 3.0).country().is_none());
        assert_eq!(scene.selection_state(), SelectionState::Selected("Testland".into()));
    }

    #[test]
    fn test_flat_country_absent_everywhere() {
        let mut set = CountrySet::new();
        set.insert_lonlat("Testland", vec![vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]]);
        set.insert_lonlat("Flatland", vec![vec![(10.0, 10.0), (11.0, 10.0), (12.0, 10.0)]]);
        let mut scene = Scene::build(set, GlobeConfig::default()).unwrap();

        let meshed: Vec<&str> = scene.base_meshes().iter().map(|m| m.country.as_str()).collect();
        assert_eq!(meshed, ["Testland"]);
        assert!(scene.index().points().iter().all(|p| &*p.country == "Testland"));

        let on_line = project(11.0, 10.0, scene.config().layers.surface, 1.0);
        assert!(scene.resolve_pick(on_line, on_line * 3.0).country().is_none());
        assert_eq!(scene.select("flat"), None);
        assert_eq!(scene.selection_state(), SelectionState::NoSelection);
    }

    #[test]
    fn test_focus_direction() {
        let mut scene = scene();
        assert!(scene.focus_direction().is_none());
        scene.select("islandia");
        let dir = scene.focus_direction().unwrap();
        let camera = scene.focus_camera().unwrap();
        assert!((dir.length() - 1.0).abs() < 1e-12);
        assert!((camera.length() - scene.config().camera_distance).abs() < 1e-9);
        // the multi-part centroid lies between the two parts' longitudes
        let (lon, _) = crate::map::projection::unproject(dir);
        assert!(lon > 40.0 && lon < 46.0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = GlobeConfig::default();
        config.layers.surface = 2.0;
        assert!(Scene::build(CountrySet::new(), config).is_err());
    }
}
