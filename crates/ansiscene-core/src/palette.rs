//! Palettes and the color/quantization service.
//!
//! The codecs never resolve or quantize colors on their own: they take a
//! [`ColorService`] reference and ask it for index→RGB lookups, nearest-index
//! quantization, and palette-to-palette remaps. [`BuiltinColors`] is the
//! standard implementation backed by the VGA-16 and xterm-256 tables.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::color::Rgb;

/// Identifies one of the built-in palettes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaletteRef {
    /// The 16 classic DOS/ANSI colors in SGR order.
    Vga16,
    /// The xterm 256-color table: 16 system + 6×6×6 cube + 24 grays.
    Xterm256,
    /// xterm indices 16..=255 only. Terminals let users reconfigure the low
    /// 16 entries, so quantizing into this slice gives stable colors.
    Xterm240Safe,
}

/// The 16 classic colors, indexed in SGR order (1 = red, 4 = blue).
pub const VGA16: [Rgb; 16] = [
    Rgb::new(0x00, 0x00, 0x00),
    Rgb::new(0xaa, 0x00, 0x00),
    Rgb::new(0x00, 0xaa, 0x00),
    Rgb::new(0xaa, 0x55, 0x00),
    Rgb::new(0x00, 0x00, 0xaa),
    Rgb::new(0xaa, 0x00, 0xaa),
    Rgb::new(0x00, 0xaa, 0xaa),
    Rgb::new(0xaa, 0xaa, 0xaa),
    Rgb::new(0x55, 0x55, 0x55),
    Rgb::new(0xff, 0x55, 0x55),
    Rgb::new(0x55, 0xff, 0x55),
    Rgb::new(0xff, 0xff, 0x55),
    Rgb::new(0x55, 0x55, 0xff),
    Rgb::new(0xff, 0x55, 0xff),
    Rgb::new(0x55, 0xff, 0xff),
    Rgb::new(0xff, 0xff, 0xff),
];

/// The xterm 256-color table, built once.
pub fn xterm256() -> &'static [Rgb; 256] {
    static TABLE: OnceLock<[Rgb; 256]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut t = [Rgb::default(); 256];
        // System colors: the xterm defaults, not the VGA ramp.
        const SYSTEM: [Rgb; 16] = [
            Rgb::new(0x00, 0x00, 0x00),
            Rgb::new(0x80, 0x00, 0x00),
            Rgb::new(0x00, 0x80, 0x00),
            Rgb::new(0x80, 0x80, 0x00),
            Rgb::new(0x00, 0x00, 0x80),
            Rgb::new(0x80, 0x00, 0x80),
            Rgb::new(0x00, 0x80, 0x80),
            Rgb::new(0xc0, 0xc0, 0xc0),
            Rgb::new(0x80, 0x80, 0x80),
            Rgb::new(0xff, 0x00, 0x00),
            Rgb::new(0x00, 0xff, 0x00),
            Rgb::new(0xff, 0xff, 0x00),
            Rgb::new(0x00, 0x00, 0xff),
            Rgb::new(0xff, 0x00, 0xff),
            Rgb::new(0x00, 0xff, 0xff),
            Rgb::new(0xff, 0xff, 0xff),
        ];
        t[..16].copy_from_slice(&SYSTEM);
        for i in 0..216 {
            let level = |c: usize| if c == 0 { 0 } else { (55 + 40 * c) as u8 };
            t[16 + i] = Rgb::new(level(i / 36), level(i / 6 % 6), level(i % 6));
        }
        for i in 0..24 {
            let v = (8 + 10 * i) as u8;
            t[232 + i] = Rgb::new(v, v, v);
        }
        t
    })
}

/// Index→RGB, RGB→nearest-index, and cached palette remapping.
///
/// Implementations may cache derived tables internally; they are read-only
/// from the codec's point of view and need not be `Sync` — concurrent use is
/// serialized by the caller.
pub trait ColorService {
    /// Resolve a palette index to its RGB value, if the index is in range.
    fn rgb_of(&self, palette: PaletteRef, index: u16) -> Option<Rgb>;

    /// Quantize an RGB value to the nearest index in `palette`.
    fn nearest(&self, palette: PaletteRef, rgb: Rgb) -> u16;

    /// Remap an index from one palette to the nearest index in another.
    fn remap(&self, from: PaletteRef, to: PaletteRef, index: u16) -> u16;
}

fn palette_slice(palette: PaletteRef) -> &'static [Rgb] {
    match palette {
        PaletteRef::Vga16 => &VGA16,
        PaletteRef::Xterm256 => xterm256(),
        PaletteRef::Xterm240Safe => &xterm256()[16..],
    }
}

/// Parent xterm-256 index for an index into the 240-safe slice.
#[must_use]
pub const fn safe240_parent(index: u16) -> u16 {
    index + 16
}

/// Built-in [`ColorService`] with per-instance remap caches.
#[derive(Debug, Default)]
pub struct BuiltinColors {
    remaps: RefCell<HashMap<(PaletteRef, PaletteRef), Vec<u16>>>,
}

impl BuiltinColors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ColorService for BuiltinColors {
    fn rgb_of(&self, palette: PaletteRef, index: u16) -> Option<Rgb> {
        palette_slice(palette).get(index as usize).copied()
    }

    fn nearest(&self, palette: PaletteRef, rgb: Rgb) -> u16 {
        let slice = palette_slice(palette);
        let mut best = 0u16;
        let mut best_d = u32::MAX;
        for (i, &c) in slice.iter().enumerate() {
            let d = rgb.distance_sq(c);
            if d < best_d {
                best_d = d;
                best = i as u16;
            }
        }
        best
    }

    fn remap(&self, from: PaletteRef, to: PaletteRef, index: u16) -> u16 {
        if from == to {
            return index;
        }
        let mut caches = self.remaps.borrow_mut();
        let table = caches.entry((from, to)).or_insert_with(|| {
            palette_slice(from)
                .iter()
                .map(|&rgb| self.nearest(to, rgb))
                .collect()
        });
        // Out-of-range source indices degrade to a safe low index.
        table.get(index as usize).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── tables ─────────────────────────────────────────────────────

    #[test]
    fn vga16_documented_triplets() {
        assert_eq!(VGA16[1], Rgb::new(0xaa, 0x00, 0x00)); // red
        assert_eq!(VGA16[3], Rgb::new(0xaa, 0x55, 0x00)); // brown
        assert_eq!(VGA16[4], Rgb::new(0x00, 0x00, 0xaa)); // blue
        assert_eq!(VGA16[11], Rgb::new(0xff, 0xff, 0x55)); // bright yellow
        assert_eq!(VGA16[15], Rgb::new(0xff, 0xff, 0xff));
    }

    #[test]
    fn xterm256_cube_and_grays() {
        let t = xterm256();
        assert_eq!(t[16], Rgb::new(0, 0, 0));
        assert_eq!(t[231], Rgb::new(0xff, 0xff, 0xff));
        assert_eq!(t[196], Rgb::new(0xff, 0, 0));
        assert_eq!(t[232], Rgb::new(8, 8, 8));
        assert_eq!(t[255], Rgb::new(238, 238, 238));
    }

    // ── service ────────────────────────────────────────────────────

    #[test]
    fn nearest_is_exact_for_palette_members() {
        let svc = BuiltinColors::new();
        for (i, &c) in VGA16.iter().enumerate() {
            assert_eq!(svc.nearest(PaletteRef::Vga16, c), i as u16);
        }
    }

    #[test]
    fn remap_identity_when_same_palette() {
        let svc = BuiltinColors::new();
        assert_eq!(svc.remap(PaletteRef::Vga16, PaletteRef::Vga16, 9), 9);
    }

    #[test]
    fn remap_240_safe_has_parent_in_full_range() {
        let svc = BuiltinColors::new();
        // Pure red from the VGA ramp lands somewhere in the cube; its parent
        // index must be past the configurable low 16.
        let safe = svc.remap(PaletteRef::Vga16, PaletteRef::Xterm240Safe, 9);
        assert!(safe240_parent(safe) >= 16);
        let rgb = svc.rgb_of(PaletteRef::Xterm240Safe, safe);
        assert_eq!(rgb, svc.rgb_of(PaletteRef::Xterm256, safe240_parent(safe)));
    }

    #[test]
    fn out_of_range_lookups_degrade() {
        let svc = BuiltinColors::new();
        assert_eq!(svc.rgb_of(PaletteRef::Vga16, 99), None);
        assert_eq!(svc.remap(PaletteRef::Vga16, PaletteRef::Xterm256, 99), 0);
    }
}
