//! Color values, palette-index slots, and attribute flags.

use bitflags::bitflags;

bitflags! {
    /// Per-cell text attribute flags.
    ///
    /// Maps to the ECMA-48 SGR parameter values the art codecs understand.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AttrFlags: u16 {
        const BOLD          = 1 << 0;
        const DIM           = 1 << 1;
        const ITALIC        = 1 << 2;
        const UNDERLINE     = 1 << 3;
        const BLINK         = 1 << 4;
        const INVERSE       = 1 << 5;
        const STRIKETHROUGH = 1 << 6;
    }
}

/// A 24-bit color value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Squared Euclidean distance to another color.
    #[must_use]
    pub fn distance_sq(self, other: Rgb) -> u32 {
        let dr = i32::from(self.r) - i32::from(other.r);
        let dg = i32::from(self.g) - i32::from(other.g);
        let db = i32::from(self.b) - i32::from(other.b);
        (dr * dr + dg * dg + db * db) as u32
    }
}

/// A palette index with a reserved "unset" sentinel.
///
/// Unset means "no explicit color, use the consumer's default." The sentinel
/// keeps the cell planes flat `u16` arrays without an `Option` per cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorSlot(u16);

impl ColorSlot {
    pub const UNSET: ColorSlot = ColorSlot(u16::MAX);

    #[must_use]
    pub const fn from_index(index: u16) -> Self {
        ColorSlot(index)
    }

    /// The palette index, or `None` for the unset sentinel.
    #[must_use]
    pub const fn index(self) -> Option<u16> {
        if self.0 == u16::MAX { None } else { Some(self.0) }
    }

    #[must_use]
    pub const fn is_unset(self) -> bool {
        self.0 == u16::MAX
    }
}

impl Default for ColorSlot {
    fn default() -> Self {
        ColorSlot::UNSET
    }
}
