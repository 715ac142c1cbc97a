//! Frame-buffer console (spec.md §4.N): splash-image startup, scrolling
//! text console, and glyph rendering over a board-supplied pixel
//! buffer.

pub mod bmp;
pub mod font;

use alloc::vec;
use alloc::vec::Vec;

use crate::board::FrameSink;
use bmp::{BmpImage, PixelFormat};
use font::{render_row, Font, Paint};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Console,
    Pixel,
}

#[derive(Debug, Clone, Copy)]
pub struct Geometry {
    pub screen_width: u32,
    pub screen_height: u32,
    pub bytes_per_pixel: u32,
}

impl Geometry {
    pub fn frame_bytes(&self) -> usize {
        (self.screen_width * self.screen_height * self.bytes_per_pixel) as usize
    }

    pub fn row_bytes(&self, char_height: u32) -> usize {
        (self.screen_width * char_height * self.bytes_per_pixel) as usize
    }
}

/// Double-buffered text console: `front` is what's displayed, `back`
/// holds the duplicated scroll-ahead copy (spec.md §4.N scroll
/// algorithm).
pub struct Console<S: FrameSink> {
    pub geometry: Geometry,
    pub front: Vec<u8>,
    pub back: Vec<u8>,
    pub mode: Mode,
    pub background: u32,
    pub foreground: u32,
    pub font: Font,
    pub cursor_row: u32,
    pub cursor_col: u32,
    pub base_offset_rows: u32,
    sink: S,
}

impl<S: FrameSink> Console<S> {
    pub fn new(geometry: Geometry, font: Font, background: u32, foreground: u32, sink: S) -> Self {
        let bytes = geometry.frame_bytes();
        Console {
            geometry,
            front: vec![0u8; bytes],
            back: vec![0u8; bytes],
            mode: Mode::Console,
            background,
            foreground,
            font,
            cursor_row: 0,
            cursor_col: 0,
            base_offset_rows: 0,
            sink,
        }
    }

    /// Whether splash startup found a usable file (`splash.gz` or
    /// `splash.bin`); if so the caller blits it and sets pixel mode.
    pub fn choose_splash<'a>(files: impl Iterator<Item = &'a str>) -> Option<&'a str> {
        let files: Vec<&str> = files.collect();
        files.iter().find(|f| **f == "splash.gz").or_else(|| files.iter().find(|f| **f == "splash.bin")).copied()
    }

    pub fn enter_pixel_mode(&mut self) {
        self.mode = Mode::Pixel;
    }

    /// The "one extra scan line for the first `modulo` rows" fix
    /// that eliminates the visual jitter from `screen_height % char_height`
    /// (spec.md §4.N).
    pub fn row_padding(&self, row_index: u32) -> u32 {
        let modulo = self.geometry.screen_height % self.font.char_height;
        if row_index < modulo {
            1
        } else {
            0
        }
    }

    /// Advance one text line. With a hardware base pointer, write the
    /// new line into both buffers (the back buffer's copy lives one
    /// frame ahead) and slide the base; without one, memcpy everything
    /// up by one row and clear the last (spec.md §4.N).
    pub fn newline(&mut self) {
        let row_bytes = self.geometry.row_bytes(self.font.char_height);
        if self.sink.advance_base(1) {
            self.base_offset_rows = (self.base_offset_rows + 1) % (self.geometry.screen_height / self.font.char_height);
        } else {
            let total = self.front.len();
            self.front.copy_within(row_bytes..total, 0);
            self.front[total - row_bytes..].fill(self.background as u8);
        }
        self.cursor_row += 1;
        self.cursor_col = 0;
    }

    /// Paint one glyph's cell at the cursor and advance the cursor,
    /// wrapping to a new line when the cell would overrun the row
    /// (spec.md §4.N). Always opaque: every pixel of the cell,
    /// including the inter-glyph gap, gets written.
    pub fn put_glyph(&mut self, ch: u8) {
        let bpp = self.geometry.bytes_per_pixel as usize;
        let cell_width = (self.font.char_width + self.font.gap) as usize;
        let stride = (self.geometry.screen_width * self.geometry.bytes_per_pixel) as usize;
        let base_col = self.cursor_col as usize * cell_width;
        for row in 0..self.font.char_height {
            let pixels = render_row(&self.font, ch, row, true);
            let row_off = (self.cursor_row * self.font.char_height + row) as usize * stride;
            for (col, paint) in pixels.iter().enumerate() {
                let color = match paint {
                    Some(Paint::Foreground) => self.foreground,
                    _ => self.background,
                };
                let off = row_off + (base_col + col) * bpp;
                if off + bpp <= self.front.len() {
                    self.front[off..off + bpp].copy_from_slice(&color.to_le_bytes()[..bpp]);
                }
            }
        }
        self.cursor_col += 1;
        if (self.cursor_col as usize + 1) * cell_width > self.geometry.screen_width as usize {
            self.newline();
        }
    }

    /// Blit a decoded splash image into the visible buffer (spec.md
    /// §4.N splash image startup). Only meaningful once
    /// [`Console::enter_pixel_mode`] has been called.
    pub fn blit_splash(&mut self, image: &BmpImage<'_>, format: PixelFormat) {
        let stride = (self.geometry.screen_width * self.geometry.bytes_per_pixel) as usize;
        image.blit(&mut self.front, stride, format);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::NullFrameSink;

    #[test]
    fn picks_gz_splash_over_bin_when_both_present() {
        let files = ["readme.txt", "splash.bin", "splash.gz"];
        assert_eq!(Console::<NullFrameSink>::choose_splash(files.into_iter()), Some("splash.gz"));
    }

    #[test]
    fn falls_back_to_bin_splash() {
        let files = ["splash.bin"];
        assert_eq!(Console::<NullFrameSink>::choose_splash(files.into_iter()), Some("splash.bin"));
    }

    #[test]
    fn fallback_scroll_shifts_rows_and_clears_last() {
        let geometry = Geometry { screen_width: 4, screen_height: 16, bytes_per_pixel: 1 };
        let char_height = Font::default_8x8().char_height;
        let mut console = Console::new(geometry, Font::default_8x8(), 0, 0xff, NullFrameSink);
        console.front.iter_mut().enumerate().for_each(|(i, b)| *b = i as u8);
        console.newline();
        let row_bytes = geometry.row_bytes(char_height);
        assert_eq!(console.front[0], row_bytes as u8);
        assert!(console.front[console.front.len() - row_bytes..].iter().all(|&b| b == 0));
    }

    #[test]
    fn put_glyph_paints_foreground_pixel_and_leaves_gap_as_background() {
        let geometry = Geometry { screen_width: 16, screen_height: 16, bytes_per_pixel: 1 };
        let mut font = Font::default_8x8();
        font.glyphs[b'A' as usize][0] = 0x8000; // single bit, top-left
        let mut console = Console::new(geometry, font, 0, 0xff, NullFrameSink);
        console.put_glyph(b'A');
        assert_eq!(console.front[0], 0xff);
        assert_eq!(console.front[1], 0);
        let gap_col = geometry.bytes_per_pixel as usize * (console.font.char_width as usize);
        assert_eq!(console.front[gap_col], 0);
    }

    #[test]
    fn put_glyph_wraps_cursor_at_end_of_row() {
        let geometry = Geometry { screen_width: 9, screen_height: 16, bytes_per_pixel: 1 };
        let font = Font::default_8x8();
        let mut console = Console::new(geometry, font, 0, 0xff, NullFrameSink);
        console.put_glyph(b' ');
        assert_eq!(console.cursor_row, 1);
        assert_eq!(console.cursor_col, 0);
    }

    #[test]
    fn blit_splash_writes_image_pixels_into_front_buffer() {
        let geometry = Geometry { screen_width: 2, screen_height: 2, bytes_per_pixel: 2 };
        let mut console = Console::new(geometry, Font::default_8x8(), 0, 0, NullFrameSink);
        let stride = 8; // (2 * 3 + 3) / 4 * 4
        let mut bmp_bytes = alloc::vec![0u8; 54 + stride * 2];
        bmp_bytes[0] = b'B';
        bmp_bytes[1] = b'M';
        bmp_bytes[10..14].copy_from_slice(&54u32.to_le_bytes());
        bmp_bytes[18..22].copy_from_slice(&2u32.to_le_bytes());
        bmp_bytes[22..26].copy_from_slice(&2u32.to_le_bytes());
        bmp_bytes[28..30].copy_from_slice(&24u16.to_le_bytes());
        for row in 0..2 {
            let base = 54 + row * stride;
            for col in 0..2 {
                let px = base + col * 3;
                bmp_bytes[px..px + 3].copy_from_slice(&[0, 0, 0xff]); // BGR bytes: b=0 g=0 r=0xff
            }
        }
        let image = bmp::BmpImage::parse(&bmp_bytes).unwrap();
        console.blit_splash(&image, PixelFormat::Rgb565);
        let expected = PixelFormat::Rgb565.pack(0xff, 0, 0).to_le_bytes();
        assert_eq!(&console.front[0..2], &expected[0..2]);
    }
}
