/// Braille Unicode canvas for terminal map layers.
/// Each character cell packs a 2x4 dot grid into one of U+2800..U+28FF.
pub struct BrailleCanvas {
    width: usize,  // Characters
    height: usize, // Characters
    cells: Vec<u8>,
}

const BLANK: u32 = 0x2800;

impl BrailleCanvas {
    /// Create a canvas with the given character dimensions.
    /// Effective dot resolution: width*2 x height*4
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![0u8; width * height],
        }
    }

    /// Dot width in braille pixels
    pub fn pixel_width(&self) -> usize {
        self.width * 2
    }

    /// Dot height in braille pixels
    pub fn pixel_height(&self) -> usize {
        self.height * 4
    }

    /// Set a dot. Layout per character:
    /// ```text
    /// (0,0) (1,0)   bits: 0x01 0x08
    /// (0,1) (1,1)   bits: 0x02 0x10
    /// (0,2) (1,2)   bits: 0x04 0x20
    /// (0,3) (1,3)   bits: 0x40 0x80
    /// ```
    pub fn set_pixel(&mut self, x: usize, y: usize) {
        let cx = x / 2;
        let cy = y / 4;
        if cx >= self.width || cy >= self.height {
            return;
        }

        let bit = match (x % 2, y % 4) {
            (0, 0) => 0x01,
            (1, 0) => 0x08,
            (0, 1) => 0x02,
            (1, 1) => 0x10,
            (0, 2) => 0x04,
            (1, 2) => 0x20,
            (0, 3) => 0x40,
            _ => 0x80,
        };

        self.cells[cy * self.width + cx] |= bit;
    }

    /// Set a dot using signed coordinates (off-canvas values are ignored)
    pub fn set_pixel_signed(&mut self, x: i32, y: i32) {
        if x >= 0 && y >= 0 {
            self.set_pixel(x as usize, y as usize);
        }
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|&b| b == 0)
    }

    /// Glyph at a character cell
    pub fn glyph(&self, col: usize, row: usize) -> char {
        let bits = self
            .cells
            .get(row * self.width + col)
            .copied()
            .filter(|_| col < self.width)
            .unwrap_or(0);
        char::from_u32(BLANK + bits as u32).unwrap_or(' ')
    }

    /// Non-blank cells as (column, row, glyph)
    pub fn lit_cells(&self) -> impl Iterator<Item = (u16, u16, char)> + '_ {
        self.cells.iter().enumerate().filter_map(move |(idx, &bits)| {
            if bits == 0 {
                return None;
            }
            let col = (idx % self.width) as u16;
            let row = (idx / self.width) as u16;
            char::from_u32(BLANK + bits as u32).map(|ch| (col, row, ch))
        })
    }

    #[cfg(test)]
    pub fn to_string(&self) -> String {
        (0..self.height)
            .map(|row| (0..self.width).map(|col| self.glyph(col, row)).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
