use country_globe::map::{AltitudeLayer, GlobeRenderer, GlobeViewport};
use country_globe::{HighlightEvent, MissReason, Pick, Scene};
use tracing::{debug, info};

/// Where the view starts and where `r` returns to
pub const HOME_LON: f64 = 10.0;
pub const HOME_LAT: f64 = 45.0;

/// Application state
pub struct App {
    pub viewport: GlobeViewport,
    pub scene: Scene,
    pub renderer: GlobeRenderer,
    pub should_quit: bool,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    /// Current mouse position for cursor marker
    pub mouse_pos: Option<(u16, u16)>,
    /// Country whose overlay is currently drawn, kept in step with selection events
    pub overlay: Option<String>,
    /// One-line feedback for the status bar
    pub message: String,
}

impl App {
    pub fn new(width: usize, height: usize, scene: Scene) -> Self {
        let (pixel_width, pixel_height) = inner_pixels(width, height);
        let globe_radius = scene.layer_radius(AltitudeLayer::Surface);
        Self {
            viewport: GlobeViewport::fit(HOME_LON, HOME_LAT, globe_radius, pixel_width, pixel_height),
            scene,
            renderer: GlobeRenderer::new(),
            should_quit: false,
            last_mouse: None,
            mouse_pos: None,
            overlay: None,
            message: String::from("right-click a country to select it"),
        }
    }

    /// Update viewport size when terminal resizes
    pub fn resize(&mut self, width: usize, height: usize) {
        let (pixel_width, pixel_height) = inner_pixels(width, height);
        self.viewport.set_size(pixel_width, pixel_height);
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
    }

    /// Zoom in towards a screen position (terminal column/row)
    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        let (px, py) = to_pixels(col, row);
        self.viewport.zoom_in_at(px, py);
    }

    /// Zoom out from a screen position (terminal column/row)
    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        let (px, py) = to_pixels(col, row);
        self.viewport.zoom_out_at(px, py);
    }

    /// Rotate by a key press, in braille pixels
    pub fn rotate(&mut self, dx: i32, dy: i32) {
        self.viewport.rotate_drag(dx, dy);
    }

    pub fn toggle_land(&mut self) {
        self.renderer.settings.show_land = !self.renderer.settings.show_land;
    }

    pub fn toggle_borders(&mut self) {
        self.renderer.settings.show_borders = !self.renderer.settings.show_borders;
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Back to the home view, keeping the selection
    pub fn reset_view(&mut self) {
        let radius = self.viewport.radius;
        self.viewport = GlobeViewport::fit(
            HOME_LON,
            HOME_LAT,
            self.viewport.globe_radius(),
            self.viewport.width,
            self.viewport.height,
        );
        self.viewport.radius = radius;
    }

    /// Handle mouse drag: rotate the globe so the surface follows the cursor
    pub fn handle_drag(&mut self, x: u16, y: u16) {
        if let Some((last_x, last_y)) = self.last_mouse {
            let dx = (last_x as i32 - x as i32) * 2;
            let dy = (last_y as i32 - y as i32) * 4;
            self.viewport.rotate_drag(dx, dy);
        }
        self.last_mouse = Some((x, y));
    }

    /// Reset drag state when mouse button released
    pub fn end_drag(&mut self) {
        self.last_mouse = None;
    }

    pub fn set_mouse_pos(&mut self, col: u16, row: u16) {
        self.mouse_pos = Some((col, row));
    }

    /// Mouse position in braille pixel coordinates
    pub fn mouse_pixel_pos(&self) -> Option<(i32, i32)> {
        self.mouse_pos.map(|(col, row)| to_pixels(col, row))
    }

    /// Select by name query and turn the globe towards it
    pub fn select_query(&mut self, query: &str) -> bool {
        match self.scene.select(query).map(str::to_owned) {
            Some(name) => {
                self.message = format!("selected {}", name);
                self.sync_overlay();
                self.focus_selection();
                true
            }
            None => {
                self.message = format!("no country matches '{}'", query);
                false
            }
        }
    }

    /// Resolve a click at a terminal cell and select what is under it
    pub fn pick_at(&mut self, col: u16, row: u16) {
        let (px, py) = to_pixels(col, row);
        let surface = self.scene.layer_radius(AltitudeLayer::Surface);
        let Some(point) = self.viewport.surface_point(px, py, surface) else {
            self.message = String::from("missed the globe");
            return;
        };
        let camera = self.viewport.camera_position(self.scene.config().camera_distance);

        let picked = match self.scene.resolve_pick(point, camera) {
            Pick::Hit { country, distance } => {
                debug!(country, distance, "pick hit");
                Ok(country.to_owned())
            }
            Pick::Miss(reason) => Err(reason),
        };

        match picked {
            Ok(name) => {
                self.scene.select_exact(&name);
                self.message = format!("selected {}", name);
                self.sync_overlay();
            }
            Err(MissReason::TooFar { .. }) => self.message = String::from("no country there"),
            Err(MissReason::BackFacing) => self.message = String::from("that side faces away"),
            Err(MissReason::EmptyIndex) => self.message = String::from("no countries loaded"),
        }
    }

    pub fn clear_selection(&mut self) {
        self.scene.clear();
        self.sync_overlay();
        self.message = String::from("selection cleared");
    }

    /// Centre the view on the selected country
    pub fn focus_selection(&mut self) {
        if let Some(direction) = self.scene.focus_direction() {
            self.viewport.look_at(direction);
        }
    }

    /// Apply queued highlight events to the drawn overlay
    fn sync_overlay(&mut self) {
        for event in self.scene.drain_events() {
            match event {
                HighlightEvent::Removed { country } => {
                    info!(%country, "highlight removed");
                    if self.overlay.as_deref() == Some(country.as_str()) {
                        self.overlay = None;
                    }
                }
                HighlightEvent::Added { country } => {
                    info!(%country, "highlight added");
                    self.overlay = Some(country);
                }
            }
        }
    }

    /// Selected country, if any
    pub fn selected(&self) -> Option<&str> {
        self.scene.selection().current()
    }

    pub fn zoom_level(&self) -> String {
        format!("{:.1}x", self.viewport.effective_zoom())
    }

    pub fn center_coords(&self) -> String {
        let (lon, lat) = self.viewport.center_lonlat();
        format!(
            "{:.1}°{}, {:.1}°{}",
            lat.abs(),
            if lat >= 0.0 { "N" } else { "S" },
            lon.abs(),
            if lon >= 0.0 { "E" } else { "W" }
        )
    }
}

/// Braille pixel size of the map area inside the border and above the status bar
fn inner_pixels(width: usize, height: usize) -> (usize, usize) {
    let inner_width = width.saturating_sub(2);
    let inner_height = height.saturating_sub(3);
    (inner_width * 2, inner_height * 4)
}

/// Terminal cell to braille pixel, accounting for the 1-cell border
fn to_pixels(col: u16, row: u16) -> (i32, i32) {
    ((col.saturating_sub(1) as i32) * 2, (row.saturating_sub(1) as i32) * 4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use country_globe::{CountrySet, GlobeConfig, SelectionState};

    fn app_with(config: GlobeConfig) -> App {
        let mut set = CountrySet::new();
        set.insert_lonlat(
            "Testland",
            vec![vec![(5.0, 40.0), (15.0, 40.0), (15.0, 50.0), (5.0, 50.0)]],
        );
        let scene = Scene::build(set, config).unwrap();
        App::new(82, 43, scene)
    }

    fn app() -> App {
        app_with(GlobeConfig::default())
    }

    fn center_cell(app: &App) -> (u16, u16) {
        (
            1 + (app.viewport.width / 2 / 2) as u16,
            1 + (app.viewport.height / 2 / 4) as u16,
        )
    }

    #[test]
    fn test_pick_center_selects() {
        let mut app = app();
        // centre of the map area, which faces (10E, 45N)
        let (col, row) = center_cell(&app);
        app.pick_at(col, row);
        assert_eq!(app.selected(), Some("Testland"));
        assert_eq!(app.overlay.as_deref(), Some("Testland"));
    }

    #[test]
    fn test_pick_off_globe() {
        let mut app = app();
        app.pick_at(1, 1);
        assert_eq!(app.scene.selection_state(), SelectionState::NoSelection);
    }

    #[test]
    fn test_query_then_clear() {
        let mut app = app();
        assert!(app.select_query("TEST"));
        assert_eq!(app.overlay.as_deref(), Some("Testland"));
        assert!(!app.select_query("Atlantis"));
        assert_eq!(app.selected(), Some("Testland"));
        app.clear_selection();
        assert!(app.selected().is_none());
        assert!(app.overlay.is_none());
    }

    #[test]
    fn test_large_globe_fits_canvas() {
        let mut app = app_with(GlobeConfig::default().with_base_radius(10.0));
        let (w, h) = (app.viewport.width as f64, app.viewport.height as f64);
        let border = app.scene.layer_radius(AltitudeLayer::Border);
        let disk = |app: &App| app.viewport.radius * border;
        assert!(disk(&app) * 2.0 < w.min(h));

        let (col, row) = center_cell(&app);
        app.pick_at(col, row);
        assert_eq!(app.selected(), Some("Testland"));

        // zooming out at the cursor and resetting never shrinks below the fitted disk
        for _ in 0..10 {
            app.zoom_out_at(col + 5, row);
        }
        app.reset_view();
        assert!(disk(&app) * 2.0 < w.min(h));
        assert!((app.viewport.effective_zoom() - 1.0).abs() < 1e-9);
        app.pick_at(col, row);
        assert_eq!(app.selected(), Some("Testland"));
    }
}
