//! The structured grid document: four parallel cell planes.

use crate::codepage::{ByteEncoding, decode_byte};
use crate::color::{AttrFlags, ColorSlot};
use crate::palette::PaletteRef;
use crate::sauce::SauceRecord;

/// Widest column count any importer or exporter will honor.
pub const MAX_COLUMNS: u32 = 4096;

/// Clamp a requested column count into the supported range.
#[must_use]
pub fn clamp_columns(columns: u32) -> u32 {
    columns.clamp(1, MAX_COLUMNS)
}

/// One glyph token.
///
/// Art decoded from an 8-bit stream keeps the raw byte so a re-export is
/// byte-identical even for codepoints with ambiguous reverse mappings;
/// Unicode streams store the scalar directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Glyph {
    Byte(u8),
    Scalar(char),
}

impl Default for Glyph {
    fn default() -> Self {
        Glyph::Scalar(' ')
    }
}

impl Glyph {
    /// The Unicode fallback representative for this token.
    #[must_use]
    pub fn to_char(self, encoding: ByteEncoding) -> char {
        match self {
            Glyph::Byte(b) => decode_byte(b, encoding),
            Glyph::Scalar(c) => c,
        }
    }

    /// Whether this glyph renders as empty space.
    #[must_use]
    pub fn is_blank(self) -> bool {
        matches!(
            self,
            Glyph::Byte(0x00 | 0x20) | Glyph::Scalar(' ' | '\u{0}')
        )
    }
}

/// A text-mode art document: fixed column count, growable rows, and four
/// parallel row-major planes of equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtDocument {
    columns: u32,
    rows: u32,
    glyphs: Vec<Glyph>,
    fg: Vec<ColorSlot>,
    bg: Vec<ColorSlot>,
    attrs: Vec<AttrFlags>,
    /// The palette the fg/bg slots index into.
    pub palette: PaletteRef,
    pub sauce: Option<SauceRecord>,
}

impl ArtDocument {
    /// Create an empty document with the given (clamped) column count.
    #[must_use]
    pub fn new(columns: u32) -> Self {
        Self {
            columns: clamp_columns(columns),
            rows: 0,
            glyphs: Vec::new(),
            fg: Vec::new(),
            bg: Vec::new(),
            attrs: Vec::new(),
            palette: PaletteRef::Vga16,
            sauce: None,
        }
    }

    #[must_use]
    pub fn columns(&self) -> u32 {
        self.columns
    }

    #[must_use]
    pub fn rows(&self) -> u32 {
        self.rows
    }

    fn index(&self, row: u32, col: u32) -> usize {
        row as usize * self.columns as usize + col as usize
    }

    /// Grow the planes so `row` exists, filling new cells with defaults.
    pub fn ensure_row(&mut self, row: u32) {
        if row < self.rows {
            return;
        }
        let len = (row as usize + 1) * self.columns as usize;
        self.glyphs.resize(len, Glyph::default());
        self.fg.resize(len, ColorSlot::UNSET);
        self.bg.resize(len, ColorSlot::UNSET);
        self.attrs.resize(len, AttrFlags::empty());
        self.rows = row + 1;
    }

    /// Write one cell. Out-of-range columns are ignored.
    pub fn set_cell(
        &mut self,
        row: u32,
        col: u32,
        glyph: Glyph,
        fg: ColorSlot,
        bg: ColorSlot,
        attrs: AttrFlags,
    ) {
        if col >= self.columns {
            return;
        }
        self.ensure_row(row);
        let i = self.index(row, col);
        self.glyphs[i] = glyph;
        self.fg[i] = fg;
        self.bg[i] = bg;
        self.attrs[i] = attrs;
    }

    /// Read one cell; default values outside the written area.
    #[must_use]
    pub fn cell(&self, row: u32, col: u32) -> (Glyph, ColorSlot, ColorSlot, AttrFlags) {
        if row >= self.rows || col >= self.columns {
            return (
                Glyph::default(),
                ColorSlot::UNSET,
                ColorSlot::UNSET,
                AttrFlags::empty(),
            );
        }
        let i = self.index(row, col);
        (self.glyphs[i], self.fg[i], self.bg[i], self.attrs[i])
    }

    /// Drop all cell content (planes shrink to zero rows).
    pub fn clear(&mut self) {
        self.rows = 0;
        self.glyphs.clear();
        self.fg.clear();
        self.bg.clear();
        self.attrs.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }
}
