mod app;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use country_globe::map::SearchBackend;
use country_globe::{data, GlobeConfig, Scene};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use ratatui::DefaultTerminal;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Selected when `--country` matches nothing
const FALLBACK_COUNTRY: &str = "Germany";

#[derive(Parser, Debug)]
#[command(author, version, about = "Spin a globe of country outlines and pick countries from it")]
struct Args {
    /// Directory holding ne_110m_admin_0_countries.geojson
    #[arg(long, default_value = "data")]
    data: PathBuf,

    /// Country to select on start (case-insensitive substring)
    #[arg(long, default_value = FALLBACK_COUNTRY)]
    country: String,

    /// Globe radius in world units; distance tunables scale with it
    #[arg(long)]
    radius: Option<f64>,

    /// Boundary sampling step in degrees
    #[arg(long)]
    boundary_step: Option<f64>,

    /// Interior grid step in degrees
    #[arg(long)]
    interior_step: Option<f64>,

    /// Largest distance from a click to an anchor that still counts as a hit
    #[arg(long)]
    pick_distance: Option<f64>,

    /// Nearest-neighbour backend: rtree, grid or linear
    #[arg(long, default_value_t = SearchBackend::RTree)]
    search: SearchBackend,

    /// Cell size for the grid backend
    #[arg(long)]
    grid_cell: Option<f64>,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Args {
    fn config(&self) -> GlobeConfig {
        let mut config = match self.radius {
            Some(r) => GlobeConfig::default().with_base_radius(r),
            None => GlobeConfig::default(),
        };
        if let Some(step) = self.boundary_step {
            config.sampling.boundary_step_deg = step;
        }
        if let Some(step) = self.interior_step {
            config.sampling.interior_step_deg = step;
        }
        if let Some(d) = self.pick_distance {
            config.pick_max_distance = d;
        }
        if let Some(cell) = self.grid_cell {
            config.grid_cell_size = cell;
        }
        config.search = self.search;
        config
    }
}

fn init_logging(log_file: Option<&PathBuf>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    match log_file {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_ref())?;

    // Build everything before touching the terminal so errors print normally
    let config = args.config();
    let countries = data::load_default(&args.data);
    let scene = Scene::build(countries, config).context("building globe")?;

    let mut terminal = ratatui::init();
    terminal.clear()?;
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let result = run(&mut terminal, scene, &args.country);

    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

/// Handle mouse events for rotating, zooming and picking
fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    // Always track mouse position for cursor marker
    app.set_mouse_pos(mouse.column, mouse.row);

    match mouse.kind {
        MouseEventKind::ScrollUp => app.zoom_in_at(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.zoom_out_at(mouse.column, mouse.row),
        MouseEventKind::ScrollLeft => app.rotate(-15, 0),
        MouseEventKind::ScrollRight => app.rotate(15, 0),
        // Click and drag to spin
        MouseEventKind::Down(MouseButton::Left) => {
            app.last_mouse = Some((mouse.column, mouse.row));
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            app.handle_drag(mouse.column, mouse.row);
        }
        MouseEventKind::Up(MouseButton::Left) => {
            app.end_drag();
        }
        // Right click picks the country under the cursor
        MouseEventKind::Down(MouseButton::Right) => {
            app.pick_at(mouse.column, mouse.row);
        }
        _ => {}
    }
}

fn run(terminal: &mut DefaultTerminal, scene: Scene, initial_country: &str) -> Result<()> {
    let size = terminal.size()?;
    let mut app = App::new(size.width as usize, size.height as usize, scene);

    if !app.select_query(initial_country) {
        warn!(query = initial_country, "initial country not found");
        if initial_country != FALLBACK_COUNTRY && !app.select_query(FALLBACK_COUNTRY) {
            info!("starting without a selection");
        }
    }

    loop {
        terminal.draw(|frame| ui::render(frame, &app))?;

        // Handle events with ~60fps target
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) => {
                    // Only handle key press events (not release)
                    if key.kind == KeyEventKind::Press {
                        match key.code {
                            KeyCode::Char('q') | KeyCode::Esc => app.quit(),

                            // Rotate with hjkl or arrow keys
                            KeyCode::Left | KeyCode::Char('h') => app.rotate(-10, 0),
                            KeyCode::Right | KeyCode::Char('l') => app.rotate(10, 0),
                            KeyCode::Up | KeyCode::Char('k') => app.rotate(0, -8),
                            KeyCode::Down | KeyCode::Char('j') => app.rotate(0, 8),

                            KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
                            KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

                            KeyCode::Char('f') | KeyCode::Char('F') => app.toggle_land(),
                            KeyCode::Char('b') | KeyCode::Char('B') => app.toggle_borders(),

                            KeyCode::Char('c') => app.focus_selection(),
                            KeyCode::Char('x') => app.clear_selection(),
                            KeyCode::Char('r') | KeyCode::Char('0') => app.reset_view(),

                            _ => {}
                        }
                    }
                }
                Event::Mouse(mouse) => handle_mouse(&mut app, mouse),
                Event::Resize(width, height) => app.resize(width as usize, height as usize),
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
