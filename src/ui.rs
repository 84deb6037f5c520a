use crate::app::App;
use country_globe::braille::{BrailleCanvas, BLANK};
use country_globe::map::GlobeLayers;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
    Frame,
};

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    // Split into map area and status bar
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Globe
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    render_globe(frame, app, chunks[0]);
    render_status_bar(frame, app, chunks[1]);
}

fn render_globe(frame: &mut Frame, app: &App, area: Rect) {
    let title = match app.selected() {
        Some(name) => format!(" {} ", name),
        None => String::from(" Globe "),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            title,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    // Braille gives 2x4 resolution per character
    let mut viewport = app.viewport.clone();
    viewport.set_size(inner.width as usize * 2, inner.height as usize * 4);

    let layers = app.renderer.render(
        &app.scene,
        app.overlay.as_deref(),
        &viewport,
        inner.width as usize,
        inner.height as usize,
    );

    let cursor_pos = app.mouse_pixel_pos().and_then(|(px, py)| {
        let cx = (px / 2) as u16;
        let cy = (py / 4) as u16;
        (cx < inner.width && cy < inner.height).then_some((cx, cy))
    });

    frame.render_widget(GlobeWidget { layers, cursor_pos }, inner);
}

/// Braille globe with one colour per layer
struct GlobeWidget {
    layers: GlobeLayers,
    cursor_pos: Option<(u16, u16)>,
}

impl GlobeWidget {
    /// Render a braille canvas layer with a specific color
    fn render_layer(&self, canvas: &BrailleCanvas, color: Color, area: Rect, buf: &mut Buffer) {
        for (row_idx, row_str) in canvas.rows().enumerate() {
            if row_idx >= area.height as usize {
                break;
            }
            let y = area.y + row_idx as u16;

            for (col_idx, ch) in row_str.chars().enumerate() {
                if col_idx >= area.width as usize {
                    break;
                }
                if ch == BLANK {
                    continue;
                }
                let x = area.x + col_idx as u16;
                buf[(x, y)].set_char(ch).set_fg(color);
            }
        }
    }
}

impl Widget for GlobeWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Back to front; later layers overwrite shared cells
        self.render_layer(&self.layers.limb, Color::DarkGray, area, buf);
        self.render_layer(&self.layers.land, Color::Green, area, buf);
        self.render_layer(&self.layers.borders, Color::White, area, buf);
        self.render_layer(&self.layers.highlight, Color::Red, area, buf);

        if let Some((cx, cy)) = self.cursor_pos {
            let x = area.x + cx;
            let y = area.y + cy;
            if x < area.x + area.width && y < area.y + area.height {
                buf[(x, y)].set_char('╋').set_fg(Color::Yellow);
            }
        }
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let settings = &app.renderer.settings;
    let index = app.scene.index();

    let status = Line::from(vec![
        Span::styled(" Zoom: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.center_coords(), Style::default().fg(Color::Cyan)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("{} anchors ({}) ", index.len(), index.backend()),
            Style::default().fg(Color::Magenta),
        ),
        Span::styled(
            if settings.show_land { "[F]ill " } else { "[f]ill " },
            Style::default().fg(if settings.show_land { Color::Green } else { Color::DarkGray }),
        ),
        Span::styled(
            if settings.show_borders { "[B]order " } else { "[b]order " },
            Style::default().fg(if settings.show_borders { Color::Green } else { Color::DarkGray }),
        ),
        Span::styled("| ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.message.as_str(), Style::default().fg(Color::White)),
        Span::styled(
            " | hjkl:rotate +/-:zoom r:reset x:clear q:quit",
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    frame.render_widget(Paragraph::new(status), area);
}
