//! Bitmap font glyph rendering (spec.md §4.N).

use alloc::vec::Vec;

#[derive(Debug, Clone)]
pub struct Font {
    pub char_width: u32,
    pub char_height: u32,
    pub gap: u32,
    /// `glyphs[ch as usize]` is `char_height` rows of a bitmask with
    /// the glyph's bits in the high `char_width` bits.
    pub glyphs: Vec<[u16; 16]>,
}

impl Font {
    pub fn default_8x8() -> Self {
        Font {
            char_width: 8,
            char_height: 8,
            gap: 1,
            glyphs: alloc::vec![[0u16; 16]; 256],
        }
    }

    fn rows(&self, ch: u8) -> &[u16; 16] {
        &self.glyphs[ch as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Paint {
    Foreground,
    Background,
}

/// Render one glyph row as a sequence of pixel paints: for each of the
/// font's `char_width` columns (shifted through the row's high bits),
/// paint foreground where set, background where clear if `opaque`, or
/// nothing (transparent) otherwise. Margin rows above/below the glyph
/// are background-filled when opaque, skipped when transparent
/// (spec.md §4.N).
pub fn render_row(font: &Font, ch: u8, row: u32, opaque: bool) -> Vec<Option<Paint>> {
    let mut out = Vec::with_capacity((font.char_width + font.gap) as usize);
    if row < font.char_height {
        let bits = font.rows(ch)[row as usize];
        for col in 0..font.char_width {
            let mask = 0x8000u16 >> col;
            let set = bits & mask != 0;
            out.push(Some(if set { Paint::Foreground } else if opaque { Paint::Background } else { continue }));
        }
    } else {
        for _ in 0..font.char_width {
            out.push(if opaque { Some(Paint::Background) } else { None });
        }
    }
    for _ in 0..font.gap {
        out.push(if opaque { Some(Paint::Background) } else { None });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transparent_background_pixels_are_skipped() {
        let mut font = Font::default_8x8();
        font.glyphs[b'A' as usize][0] = 0x8000; // single bit set, top-left
        let row = render_row(&font, b'A', 0, false);
        assert_eq!(row.iter().filter(|p| p.is_some()).count(), 1);
        assert_eq!(row[0], Some(Paint::Foreground));
    }

    #[test]
    fn opaque_background_paints_every_pixel() {
        let font = Font::default_8x8();
        let row = render_row(&font, b' ', 0, true);
        assert!(row.iter().all(|p| matches!(p, Some(Paint::Background))));
    }
}
