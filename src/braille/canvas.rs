/// Dot bit for each (x % 2, y % 4) position inside a braille cell:
/// ```text
/// (0,0) (1,0)   bits: 0x01 0x08
/// (0,1) (1,1)   bits: 0x02 0x10
/// (0,2) (1,2)   bits: 0x04 0x20
/// (0,3) (1,3)   bits: 0x40 0x80
/// ```
const DOT_BITS: [[u8; 4]; 2] = [[0x01, 0x02, 0x04, 0x40], [0x08, 0x10, 0x20, 0x80]];

/// Empty braille pattern (U+2800)
pub const BLANK: char = '\u{2800}';

/// Braille Unicode canvas: each character cell holds a 2x4 dot grid,
/// so a `width` x `height` character canvas has `width*2` x `height*4` pixels.
pub struct BrailleCanvas {
    width: usize,
    height: usize,
    /// Dot pattern per character, row-major
    cells: Vec<u8>,
}

impl BrailleCanvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![0; width * height],
        }
    }

    /// Pixel dimensions
    #[inline(always)]
    pub fn pixel_size(&self) -> (usize, usize) {
        (self.width * 2, self.height * 4)
    }

    /// Set a pixel; out-of-range coordinates (including negatives) are ignored
    #[inline]
    pub fn set(&mut self, x: i32, y: i32) {
        if x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as usize, y as usize);
        let (cx, cy) = (x / 2, y / 4);
        if cx >= self.width || cy >= self.height {
            return;
        }
        self.cells[cy * self.width + cx] |= DOT_BITS[x % 2][y % 4];
    }

    /// Whether a pixel is set
    pub fn get(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 {
            return false;
        }
        let (x, y) = (x as usize, y as usize);
        let (cx, cy) = (x / 2, y / 4);
        cx < self.width && cy < self.height && self.cells[cy * self.width + cx] & DOT_BITS[x % 2][y % 4] != 0
    }

    /// Character for a cell, `None` when out of range
    #[inline]
    pub fn char_at(&self, col: usize, row: usize) -> Option<char> {
        if col >= self.width || row >= self.height {
            return None;
        }
        char::from_u32(0x2800 + self.cells[row * self.width + col] as u32)
    }

    /// Rows as strings, top to bottom
    pub fn rows(&self) -> impl Iterator<Item = String> + '_ {
        self.cells.chunks(self.width.max(1)).take(self.height).map(|row| {
            row.iter()
                .map(|&b| char::from_u32(0x2800 + b as u32).unwrap_or(' '))
                .collect()
        })
    }
}
