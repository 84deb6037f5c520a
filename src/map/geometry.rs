use crate::braille::BrailleCanvas;

pub type Pixel = (i32, i32);

/// Draw a line using Bresenham's algorithm
pub fn draw_line(canvas: &mut BrailleCanvas, (x0, y0): Pixel, (x1, y1): Pixel) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (x0, y0);

    loop {
        canvas.set(x, y);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// Rough visibility test for a segment against the canvas bounds
pub fn segment_might_be_visible(canvas: &BrailleCanvas, p0: Pixel, p1: Pixel) -> bool {
    let (w, h) = canvas.pixel_size();
    p0.0.max(p1.0) >= 0 && p0.0.min(p1.0) < w as i32 && p0.1.max(p1.1) >= 0 && p0.1.min(p1.1) < h as i32
}

/// Fill a triangle (either winding) by testing pixel centres against its edges.
/// The scan is clipped to the canvas.
pub fn fill_triangle(canvas: &mut BrailleCanvas, a: Pixel, b: Pixel, c: Pixel) {
    let (w, h) = canvas.pixel_size();
    let min_x = a.0.min(b.0).min(c.0).max(0);
    let max_x = a.0.max(b.0).max(c.0).min(w as i32 - 1);
    let min_y = a.1.min(b.1).min(c.1).max(0);
    let max_y = a.1.max(b.1).max(c.1).min(h as i32 - 1);
    if min_x > max_x || min_y > max_y {
        return;
    }

    let area = edge(a, b, c);
    if area == 0 {
        // Collapsed to a line or a point
        draw_line(canvas, a, b);
        draw_line(canvas, b, c);
        return;
    }

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let p = (x, y);
            let (w0, w1, w2) = (edge(b, c, p), edge(c, a, p), edge(a, b, p));
            let inside = if area > 0 {
                w0 >= 0 && w1 >= 0 && w2 >= 0
            } else {
                w0 <= 0 && w1 <= 0 && w2 <= 0
            };
            if inside {
                canvas.set(x, y);
            }
        }
    }
}

/// Twice the signed area of (a, b, p)
#[inline(always)]
fn edge(a: Pixel, b: Pixel, p: Pixel) -> i64 {
    (b.0 - a.0) as i64 * (p.1 - a.1) as i64 - (b.1 - a.1) as i64 * (p.0 - a.0) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizontal_line() {
        let mut canvas = BrailleCanvas::new(5, 1);
        draw_line(&mut canvas, (0, 0), (9, 0));
        assert!((0..10).all(|x| canvas.get(x, 0)));
        assert!(!canvas.get(0, 1));
    }

    #[test]
    fn test_vertical_line_reversed() {
        let mut canvas = BrailleCanvas::new(1, 2);
        draw_line(&mut canvas, (0, 7), (0, 0));
        assert!((0..8).all(|y| canvas.get(0, y)));
    }

    #[test]
    fn test_fill_triangle_either_winding() {
        for (a, b, c) in [((0, 0), (7, 0), (0, 7)), ((0, 0), (0, 7), (7, 0))] {
            let mut canvas = BrailleCanvas::new(4, 2);
            fill_triangle(&mut canvas, a, b, c);
            assert!(canvas.get(1, 1));
            assert!(canvas.get(0, 7));
            assert!(!canvas.get(7, 7));
        }
    }

    #[test]
    fn test_fill_offscreen_triangle() {
        let mut canvas = BrailleCanvas::new(2, 2);
        fill_triangle(&mut canvas, (-50, -50), (-40, -50), (-45, -40));
        assert!(canvas.rows().all(|row| row.chars().all(|c| c == '\u{2800}')));
    }

    #[test]
    fn test_segment_visibility() {
        let canvas = BrailleCanvas::new(10, 10);
        assert!(segment_might_be_visible(&canvas, (-5, 3), (5, 3)));
        assert!(!segment_might_be_visible(&canvas, (-5, -3), (-1, -9)));
    }
}
