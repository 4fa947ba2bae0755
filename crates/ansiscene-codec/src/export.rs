//! The export encoder: cell-plane document → escape-sequence byte stream.
//!
//! The emitter walks the grid keeping a "last emitted" pen state and writes
//! only the SGR parameters needed to reach each cell's desired state. The
//! classic 16-color strategy mirrors the import-side latch conventions in
//! reverse: bright foregrounds ride the bold attribute and bright
//! backgrounds ride blink, so attributes can only be *turned off* with a
//! full reset followed by a rebuild.

use std::fmt;
use std::path::Path;

use ansiscene_core::codepage::{ByteEncoding, encode_byte};
use ansiscene_core::color::{AttrFlags, ColorSlot, Rgb};
use ansiscene_core::document::{ArtDocument, Glyph};
use ansiscene_core::palette::{ColorService, PaletteRef, VGA16, safe240_parent};
use ansiscene_core::sauce::{self, DataType, SauceError, SauceWriteOptions};
use tracing::warn;

use crate::detect::UTF8_BOM;

/// Lowercase extensions used when exporting this format.
pub const EXPORT_EXTENSIONS: &[&str] = &["ans"];

const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

/// Output text encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    /// One byte per glyph through the configured byte encoding.
    #[default]
    EightBit,
    Utf8,
    /// UTF-8 with a leading byte-order mark.
    Utf8Bom,
}

/// Color emission strategy. Mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    #[default]
    Ansi16,
    Xterm256,
    /// SGR 38;2 / 48;2 truecolor.
    TrueColorSgr,
    /// 16-color baseline plus a positional `…t` RGB overlay where the true
    /// color differs from the baseline's approximation. Tools that strip
    /// the overlay still get a sensible 16-color picture.
    TrueColorTriplet,
}

/// How bright 16-color entries are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrightStyle {
    /// Bold carries bright foregrounds, blink carries bright backgrounds.
    #[default]
    BoldAndIceBlink,
    /// Direct SGR 90–97 / 100–107 codes.
    Direct90,
}

/// Which attributes are emitted at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttrMode {
    /// Only what classic DOS hardware could show; attribute turn-off is a
    /// full reset.
    #[default]
    ClassicDos,
    /// Full attribute set with paired off-codes (22/23/24/25/27/29).
    Modern,
}

/// Bytes emitted before any art.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScreenPrep {
    #[default]
    None,
    /// `ESC[2J`.
    Clear,
    /// `ESC[H`.
    Home,
    /// `ESC[2J ESC[H`.
    ClearHome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Newline {
    Lf,
    #[default]
    CrLf,
}

/// Exporter configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportOptions {
    pub text_encoding: TextEncoding,
    /// Byte table for `TextEncoding::EightBit`.
    pub byte_encoding: ByteEncoding,
    pub color_mode: ColorMode,
    pub bright_style: BrightStyle,
    pub attr_mode: AttrMode,
    /// Quantize into xterm 16..=255 only (stable against terminal themes).
    pub xterm_240_safe: bool,
    /// Emit the 16-color baseline under `TrueColorTriplet`.
    pub triplet_baseline: bool,
    /// Emit every row at full width instead of trimming trailing blanks.
    pub preserve_line_length: bool,
    /// Diff against the previously emitted state. When off, the full pen
    /// state is re-established before every cell.
    pub compress: bool,
    /// Collapse safe blank runs into `ESC[nC` when shorter.
    pub use_cursor_forward: bool,
    pub screen_prep: ScreenPrep,
    /// Trailing `ESC[0m`.
    pub final_reset: bool,
    pub newline: Newline,
    pub write_sauce: bool,
    pub sauce: SauceWriteOptions,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            text_encoding: TextEncoding::EightBit,
            byte_encoding: ByteEncoding::Cp437,
            color_mode: ColorMode::Ansi16,
            bright_style: BrightStyle::BoldAndIceBlink,
            attr_mode: AttrMode::ClassicDos,
            xterm_240_safe: false,
            triplet_baseline: true,
            preserve_line_length: false,
            compress: true,
            use_cursor_forward: false,
            screen_prep: ScreenPrep::None,
            final_reset: true,
            newline: Newline::CrLf,
            write_sauce: false,
            sauce: SauceWriteOptions { eof_byte: true, comments: true },
        }
    }
}

/// Export failures: metadata serialization or file I/O. Palette lookups
/// never fail an export; they fall back to safe indices.
#[derive(Debug)]
pub enum ExportError {
    Sauce(SauceError),
    Io(std::io::Error),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::Sauce(err) => write!(f, "metadata trailer: {err}"),
            ExportError::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Sauce(err) => Some(err),
            ExportError::Io(err) => Some(err),
        }
    }
}

impl From<SauceError> for ExportError {
    fn from(err: SauceError) -> Self {
        ExportError::Sauce(err)
    }
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        ExportError::Io(err)
    }
}

/// One sampled cell, resolved for the active strategy.
#[derive(Debug, Clone, Copy)]
struct ExportCell {
    glyph: Glyph,
    fg: ColorSlot,
    bg: ColorSlot,
    /// Bridged RGB, populated only when the color mode needs it.
    fg_rgb: Option<Rgb>,
    bg_rgb: Option<Rgb>,
    attrs: AttrFlags,
}

/// A color as last emitted on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum WireColor {
    #[default]
    Default,
    Idx(u16),
    Rgb(Rgb),
}

/// The emitter's tracked "last emitted" state.
#[derive(Debug, Clone, Copy, Default)]
struct EmitState {
    flags: AttrFlags,
    fg: WireColor,
    bg: WireColor,
    fg_overlay: Option<Rgb>,
    bg_overlay: Option<Rgb>,
}

struct Emitter<'a> {
    out: Vec<u8>,
    state: EmitState,
    options: &'a ExportOptions,
    colors: &'a dyn ColorService,
    palette: PaletteRef,
}

impl<'a> Emitter<'a> {
    fn new(options: &'a ExportOptions, colors: &'a dyn ColorService, palette: PaletteRef) -> Self {
        Self {
            out: Vec::new(),
            state: EmitState::default(),
            options,
            colors,
            palette,
        }
    }

    fn sgr(&mut self, params: &[u16]) {
        if params.is_empty() {
            return;
        }
        self.out.extend_from_slice(b"\x1b[");
        for (i, p) in params.iter().enumerate() {
            if i > 0 {
                self.out.push(b';');
            }
            self.out.extend_from_slice(p.to_string().as_bytes());
        }
        self.out.push(b'm');
    }

    /// RGB of a document-palette slot, with the documented safe fallbacks.
    fn bridge_rgb(&self, slot: ColorSlot, foreground: bool) -> Option<Rgb> {
        let index = slot.index()?;
        Some(self.colors.rgb_of(self.palette, index).unwrap_or_else(|| {
            warn!(index, "palette lookup out of range, using fallback");
            if foreground { VGA16[7] } else { VGA16[0] }
        }))
    }

    /// Baseline 16-color index for a slot.
    fn vga_index(&self, slot: ColorSlot) -> Option<u16> {
        slot.index()
            .map(|i| self.colors.remap(self.palette, PaletteRef::Vga16, i).min(15))
    }

    fn sample(&self, doc: &ArtDocument, row: u32, col: u32) -> ExportCell {
        let (glyph, fg, bg, attrs) = doc.cell(row, col);
        let needs_rgb = matches!(
            self.options.color_mode,
            ColorMode::TrueColorSgr | ColorMode::TrueColorTriplet
        );
        ExportCell {
            glyph,
            fg,
            bg,
            fg_rgb: if needs_rgb { self.bridge_rgb(fg, true) } else { None },
            bg_rgb: if needs_rgb { self.bridge_rgb(bg, false) } else { None },
            attrs,
        }
    }

    /// Whether a cell can be skipped over without visible difference.
    fn is_safe_blank(&self, cell: &ExportCell) -> bool {
        cell.glyph.is_blank()
            && (cell.attrs & self.attr_mask()).is_empty()
            && match cell.bg.index() {
                None => true,
                Some(i) => self.colors.rgb_of(self.palette, i) == Some(BLACK),
            }
    }

    fn attr_mask(&self) -> AttrFlags {
        match self.options.attr_mode {
            // DOS hardware shows blink and reverse video; bold arrives via
            // bright foreground indices, everything else is dropped.
            AttrMode::ClassicDos => AttrFlags::BLINK.union(AttrFlags::INVERSE),
            AttrMode::Modern => AttrFlags::all(),
        }
    }

    /// Desired wire colors and flags for a cell.
    fn desired(&self, cell: &ExportCell) -> (AttrFlags, WireColor, WireColor) {
        let o = self.options;
        let mut flags = cell.attrs & self.attr_mask();
        let (fg, bg) = match o.color_mode {
            ColorMode::Ansi16 | ColorMode::TrueColorTriplet => {
                let fg_idx = self.vga_index(cell.fg);
                let bg_idx = self.vga_index(cell.bg);
                if o.bright_style == BrightStyle::BoldAndIceBlink {
                    if fg_idx.is_some_and(|i| i >= 8) {
                        flags |= AttrFlags::BOLD;
                    }
                    if bg_idx.is_some_and(|i| i >= 8) {
                        flags |= AttrFlags::BLINK;
                    }
                }
                (
                    fg_idx.map_or(WireColor::Default, WireColor::Idx),
                    bg_idx.map_or(WireColor::Default, WireColor::Idx),
                )
            }
            ColorMode::Xterm256 => {
                let to_wire = |slot: ColorSlot| {
                    slot.index().map_or(WireColor::Default, |i| {
                        if o.xterm_240_safe {
                            let safe = self.colors.remap(self.palette, PaletteRef::Xterm240Safe, i);
                            WireColor::Idx(safe240_parent(safe))
                        } else {
                            WireColor::Idx(self.colors.remap(self.palette, PaletteRef::Xterm256, i))
                        }
                    })
                };
                (to_wire(cell.fg), to_wire(cell.bg))
            }
            ColorMode::TrueColorSgr => (
                cell.fg_rgb.map_or(WireColor::Default, WireColor::Rgb),
                cell.bg_rgb.map_or(WireColor::Default, WireColor::Rgb),
            ),
        };
        (flags, fg, bg)
    }

    /// Overlay colors for the triplet strategy.
    fn desired_overlays(&self, cell: &ExportCell) -> (Option<Rgb>, Option<Rgb>) {
        if self.options.color_mode != ColorMode::TrueColorTriplet {
            return (None, None);
        }
        let overlay = |rgb: Option<Rgb>, base: Option<u16>| {
            let rgb = rgb?;
            if self.options.triplet_baseline
                && base.is_some_and(|i| VGA16[i as usize] == rgb)
            {
                None
            } else {
                Some(rgb)
            }
        };
        (
            overlay(cell.fg_rgb, self.vga_index(cell.fg)),
            overlay(cell.bg_rgb, self.vga_index(cell.bg)),
        )
    }

    /// Emit the SGR/overlay transition for one cell.
    fn transition(&mut self, cell: &ExportCell) {
        if !self.options.compress {
            self.state = EmitState::default();
            // Re-establish from scratch: explicit reset before each cell.
            let mut params = vec![0u16];
            self.push_transition_params(cell, &mut params);
            self.sgr(&params);
        } else {
            let (want_flags, want_fg, want_bg) = self.desired(cell);
            let removal = self.state.flags - want_flags;
            let classic_default_turnoff = self.options.attr_mode == AttrMode::ClassicDos
                && ((self.state.fg != WireColor::Default && want_fg == WireColor::Default)
                    || (self.state.bg != WireColor::Default && want_bg == WireColor::Default));
            let need_reset = (!removal.is_empty()
                && self.options.attr_mode == AttrMode::ClassicDos)
                || classic_default_turnoff;

            let mut params = Vec::new();
            if need_reset {
                params.push(0);
                self.state = EmitState::default();
            }
            self.push_transition_params(cell, &mut params);
            self.sgr(&params);
        }
        self.push_overlays(cell);
    }

    /// Append the parameters taking `self.state` to the cell's state, and
    /// update `self.state` accordingly.
    fn push_transition_params(&mut self, cell: &ExportCell, params: &mut Vec<u16>) {
        let (want_flags, want_fg, want_bg) = self.desired(cell);
        let mut cur = self.state.flags;

        // Intensity off couples bold and dim.
        if (cur - want_flags).intersects(AttrFlags::BOLD | AttrFlags::DIM) {
            params.push(22);
            cur -= AttrFlags::BOLD | AttrFlags::DIM;
        }
        const OFF: [(AttrFlags, u16); 5] = [
            (AttrFlags::ITALIC, 23),
            (AttrFlags::UNDERLINE, 24),
            (AttrFlags::BLINK, 25),
            (AttrFlags::INVERSE, 27),
            (AttrFlags::STRIKETHROUGH, 29),
        ];
        for (flag, code) in OFF {
            if cur.contains(flag) && !want_flags.contains(flag) {
                params.push(code);
                cur -= flag;
            }
        }
        const ON: [(AttrFlags, u16); 7] = [
            (AttrFlags::BOLD, 1),
            (AttrFlags::DIM, 2),
            (AttrFlags::ITALIC, 3),
            (AttrFlags::UNDERLINE, 4),
            (AttrFlags::BLINK, 5),
            (AttrFlags::INVERSE, 7),
            (AttrFlags::STRIKETHROUGH, 9),
        ];
        for (flag, code) in ON {
            if want_flags.contains(flag) && !cur.contains(flag) {
                params.push(code);
                cur |= flag;
            }
        }
        self.state.flags = cur;

        let emit_baseline_colors = self.options.color_mode != ColorMode::TrueColorTriplet
            || self.options.triplet_baseline;
        if emit_baseline_colors {
            if want_fg != self.state.fg {
                self.push_color_params(params, want_fg, true);
                self.state.fg = want_fg;
            }
            if want_bg != self.state.bg {
                self.push_color_params(params, want_bg, false);
                self.state.bg = want_bg;
            }
        }
    }

    fn push_color_params(&self, params: &mut Vec<u16>, color: WireColor, foreground: bool) {
        match color {
            WireColor::Default => params.push(if foreground { 39 } else { 49 }),
            WireColor::Idx(i) => match self.options.color_mode {
                ColorMode::Ansi16 | ColorMode::TrueColorTriplet => {
                    let code = match (self.options.bright_style, foreground) {
                        (BrightStyle::BoldAndIceBlink, true) => 30 + (i & 7),
                        (BrightStyle::BoldAndIceBlink, false) => 40 + (i & 7),
                        (BrightStyle::Direct90, true) => {
                            if i >= 8 { 90 + (i - 8) } else { 30 + i }
                        }
                        (BrightStyle::Direct90, false) => {
                            if i >= 8 { 100 + (i - 8) } else { 40 + i }
                        }
                    };
                    params.push(code);
                }
                _ => {
                    params.push(if foreground { 38 } else { 48 });
                    params.push(5);
                    params.push(i);
                }
            },
            WireColor::Rgb(rgb) => {
                params.push(if foreground { 38 } else { 48 });
                params.push(2);
                params.push(u16::from(rgb.r));
                params.push(u16::from(rgb.g));
                params.push(u16::from(rgb.b));
            }
        }
    }

    fn push_overlays(&mut self, cell: &ExportCell) {
        let (want_fg, want_bg) = self.desired_overlays(cell);
        if want_fg != self.state.fg_overlay {
            match want_fg {
                Some(rgb) => self.push_triplet(rgb, true),
                // Leaving an overlay run: re-assert the baseline color so
                // the skipped overlay doesn't bleed forward.
                None => {
                    let baseline = self
                        .vga_index(cell.fg)
                        .map_or(WireColor::Default, WireColor::Idx);
                    let mut params = Vec::new();
                    self.push_color_params(&mut params, baseline, true);
                    self.sgr(&params);
                    self.state.fg = baseline;
                }
            }
            self.state.fg_overlay = want_fg;
        }
        if want_bg != self.state.bg_overlay {
            match want_bg {
                Some(rgb) => self.push_triplet(rgb, false),
                None => {
                    let baseline = self
                        .vga_index(cell.bg)
                        .map_or(WireColor::Default, WireColor::Idx);
                    let mut params = Vec::new();
                    self.push_color_params(&mut params, baseline, false);
                    self.sgr(&params);
                    self.state.bg = baseline;
                }
            }
            self.state.bg_overlay = want_bg;
        }
    }

    fn push_triplet(&mut self, rgb: Rgb, foreground: bool) {
        self.out.extend_from_slice(b"\x1b[");
        self.out
            .extend_from_slice(if foreground { b"1" } else { b"0" });
        for channel in [rgb.r, rgb.g, rgb.b] {
            self.out.push(b';');
            self.out.extend_from_slice(channel.to_string().as_bytes());
        }
        self.out.push(b't');
    }

    /// Re-establish default colors so a cursor-forward skip is visually
    /// equivalent to literal blanks.
    fn neutralize_for_skip(&mut self) {
        match self.options.color_mode {
            ColorMode::Ansi16 | ColorMode::TrueColorTriplet
                if self.options.attr_mode == AttrMode::ClassicDos =>
            {
                if self.state.bg != WireColor::Default || !self.state.flags.is_empty() {
                    self.sgr(&[0]);
                    self.state = EmitState::default();
                }
            }
            _ => {
                let mut params = Vec::new();
                if self.state.bg != WireColor::Default {
                    params.push(49);
                    self.state.bg = WireColor::Default;
                    self.state.bg_overlay = None;
                }
                self.sgr(&params);
            }
        }
    }

    fn emit_glyph(&mut self, cell: &ExportCell) {
        match self.options.text_encoding {
            TextEncoding::EightBit => {
                let byte = match cell.glyph {
                    Glyph::Byte(b) if b >= 0x20 => b,
                    Glyph::Byte(_) => b' ',
                    Glyph::Scalar(ch) => {
                        encode_byte(ch, self.options.byte_encoding).unwrap_or(b'?')
                    }
                };
                self.out.push(byte);
            }
            TextEncoding::Utf8 | TextEncoding::Utf8Bom => {
                let ch = cell.glyph.to_char(self.options.byte_encoding);
                let mut buf = [0u8; 4];
                self.out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            }
        }
    }

    fn newline(&mut self) {
        match self.options.newline {
            Newline::Lf => self.out.push(b'\n'),
            Newline::CrLf => self.out.extend_from_slice(b"\r\n"),
        }
    }
}

fn digits(mut n: u32) -> usize {
    let mut count = 1;
    while n >= 10 {
        n /= 10;
        count += 1;
    }
    count
}

/// Encode a document into a byte stream.
pub fn export_bytes(
    doc: &ArtDocument,
    options: &ExportOptions,
    colors: &dyn ColorService,
) -> Result<Vec<u8>, ExportError> {
    let mut em = Emitter::new(options, colors, doc.palette);

    if options.text_encoding == TextEncoding::Utf8Bom {
        em.out.extend_from_slice(&UTF8_BOM);
    }
    match options.screen_prep {
        ScreenPrep::None => {}
        ScreenPrep::Clear => em.out.extend_from_slice(b"\x1b[2J"),
        ScreenPrep::Home => em.out.extend_from_slice(b"\x1b[H"),
        ScreenPrep::ClearHome => em.out.extend_from_slice(b"\x1b[2J\x1b[H"),
    }

    for row in 0..doc.rows() {
        let last_col = if options.preserve_line_length {
            doc.columns()
        } else {
            rightmost_visible(&em, doc, row)
        };
        let mut col = 0;
        while col < last_col {
            if options.use_cursor_forward {
                let mut run = 0;
                while col + run < last_col {
                    let cell = em.sample(doc, row, col + run);
                    if !em.is_safe_blank(&cell) {
                        break;
                    }
                    run += 1;
                }
                // `ESC[{n}C` costs 3 + digits; use it only when strictly
                // shorter than the literal blanks.
                if run > 0 && 3 + digits(run) < run as usize {
                    em.neutralize_for_skip();
                    em.out.extend_from_slice(b"\x1b[");
                    em.out.extend_from_slice(run.to_string().as_bytes());
                    em.out.push(b'C');
                    col += run;
                    continue;
                }
            }
            let cell = em.sample(doc, row, col);
            em.transition(&cell);
            em.emit_glyph(&cell);
            col += 1;
        }
        em.newline();
    }

    if options.final_reset {
        em.out.extend_from_slice(b"\x1b[0m");
    }

    if options.write_sauce {
        let mut record = doc.sauce.clone().unwrap_or_default();
        record.data_type = DataType::Character;
        record.file_type = 1;
        record.tinfo1 = doc.columns().min(u32::from(u16::MAX)) as u16;
        record.tinfo2 = doc.rows().min(u32::from(u16::MAX)) as u16;
        record.file_size = em.out.len().min(u32::MAX as usize) as u32;
        sauce::append(&mut em.out, &record, &options.sauce)?;
    }

    Ok(em.out)
}

/// Export a document to a file.
pub fn export_file(
    path: impl AsRef<Path>,
    doc: &ArtDocument,
    options: &ExportOptions,
    colors: &dyn ColorService,
) -> Result<(), ExportError> {
    let bytes = export_bytes(doc, options, colors)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// One past the rightmost column on `row` that still needs emitting.
fn rightmost_visible(em: &Emitter<'_>, doc: &ArtDocument, row: u32) -> u32 {
    let mut col = doc.columns();
    while col > 0 {
        let cell = em.sample(doc, row, col - 1);
        if !em.is_safe_blank(&cell) {
            break;
        }
        col -= 1;
    }
    col
}
