//! The import decoder: escape-sequence byte stream → cell-plane document.

use std::fmt;
use std::path::Path;

use ansiscene_core::codepage::{ByteEncoding, decode_utf8};
use ansiscene_core::color::{AttrFlags, ColorSlot, Rgb};
use ansiscene_core::document::{ArtDocument, Glyph};
use ansiscene_core::font::FontId;
use ansiscene_core::palette::{ColorService, PaletteRef, VGA16};
use ansiscene_core::sauce::{self, DataType, SauceRecord};
use tracing::{debug, trace};

use crate::detect::{self, TextChoice, UTF8_BOM};
use crate::pen::{Pen, PenDefaults, SgrEvent};

const ESC: u8 = 0x1b;
const SUB: u8 = 0x1a;
const SEQ_MAX_LEN: usize = 64;

/// Deepest row the cursor can reach. Streams can move the cursor down
/// forever; the cap keeps row arithmetic and plane sizes bounded and
/// matches the metadata height field's range.
const MAX_ROWS: u32 = u16::MAX as u32;

/// Lowercase extensions identifying import candidates for this format.
pub const IMPORT_EXTENSIONS: &[&str] = &["ans", "nfo", "diz"];

/// When the cursor wraps to the next row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrapPolicy {
    /// Wrap as soon as the cursor sits past the last column, before the next
    /// byte is handled (unless it is a newline). Matches classic renderers.
    #[default]
    EagerEdge,
    /// Wrap only at the moment a glyph is written. Avoids double-advancing
    /// generated streams that carry explicit newlines at row boundaries.
    AtWrite,
}

/// Importer configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportOptions {
    /// Column override; `None` runs width inference.
    pub columns: Option<u32>,
    /// Interpret SGR 5 as bright background.
    pub ice_colors: bool,
    /// Default foreground; `None` is classic light gray.
    pub default_fg: Option<Rgb>,
    /// Default background; `None` is classic black (or unset, below).
    pub default_bg: Option<Rgb>,
    /// Leave the default background unset/transparent instead of black.
    pub default_bg_unset: bool,
    pub wrap: WrapPolicy,
    /// Prefer 8-bit decoding with UTF-8 auto-upgrade; `false` forces UTF-8.
    pub prefer_eight_bit: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            columns: None,
            ice_colors: true,
            default_fg: None,
            default_bg: None,
            default_bg_unset: false,
            wrap: WrapPolicy::EagerEdge,
            prefer_eight_bit: true,
        }
    }
}

impl ImportOptions {
    #[must_use]
    pub(crate) fn pen_defaults(&self) -> PenDefaults {
        PenDefaults {
            fg: self.default_fg.unwrap_or(VGA16[7]),
            bg: if self.default_bg_unset {
                None
            } else {
                Some(self.default_bg.unwrap_or(VGA16[0]))
            },
            ice_colors: self.ice_colors,
        }
    }
}

/// Import failures. Malformed stream content is never one of these; only
/// wrong-container signatures and I/O abort an import.
#[derive(Debug)]
pub enum ImportError {
    /// The stream opens with another container's magic bytes.
    ForeignFormat { container: &'static str },
    Io(std::io::Error),
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportError::ForeignFormat { container } => {
                write!(f, "stream is {container}, not ANSI text; use that format's importer")
            }
            ImportError::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Io(err) => Some(err),
            ImportError::ForeignFormat { .. } => None,
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::Io(err)
    }
}

/// One recognized control sequence, decoded from terminator + parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CsiOp {
    /// CUP/HVP: absolute position, already 0-based.
    Position { row: u32, col: u32 },
    Up(u32),
    Down(u32),
    Forward(u32),
    Back(u32),
    /// CHA: absolute column, 0-based.
    Column(u32),
    SaveCursor,
    RestoreCursor,
    EraseDisplay(u16),
    Sgr(Vec<u16>),
    /// Vendor positional truecolor: `ESC[1;r;g;bt` (fg) / `ESC[0;r;g;bt`.
    Truecolor { foreground: bool, rgb: Rgb },
    /// Recognized but deliberately without effect (modes, line erase, the
    /// vendor `!` terminator, and anything else in the final-byte range).
    Ignored,
}

impl CsiOp {
    fn decode(terminator: u8, params: Vec<u16>) -> CsiOp {
        fn nth(params: &[u16], i: usize) -> u32 {
            u32::from(params.get(i).copied().unwrap_or(0))
        }
        fn count_or_one(params: &[u16]) -> u32 {
            nth(params, 0).max(1)
        }
        match terminator {
            b'H' | b'f' => CsiOp::Position {
                row: nth(&params, 0).max(1) - 1,
                col: nth(&params, 1).max(1) - 1,
            },
            b'A' => CsiOp::Up(count_or_one(&params)),
            b'B' => CsiOp::Down(count_or_one(&params)),
            b'C' => CsiOp::Forward(count_or_one(&params)),
            b'D' => CsiOp::Back(count_or_one(&params)),
            b'G' => CsiOp::Column(count_or_one(&params) - 1),
            b's' => CsiOp::SaveCursor,
            b'u' => CsiOp::RestoreCursor,
            b'J' => CsiOp::EraseDisplay(params.first().copied().unwrap_or(0)),
            b'm' => CsiOp::Sgr(params),
            b't' => match params.as_slice() {
                [sel @ (0 | 1), r, g, b] => CsiOp::Truecolor {
                    foreground: *sel == 1,
                    rgb: Rgb::new(
                        (*r).min(255) as u8,
                        (*g).min(255) as u8,
                        (*b).min(255) as u8,
                    ),
                },
                _ => CsiOp::Ignored,
            },
            _ => CsiOp::Ignored,
        }
    }
}

/// Working state for one decode pass.
struct Decoder {
    columns: u32,
    rows: u32,
    glyphs: Vec<Glyph>,
    fg: Vec<Option<Rgb>>,
    bg: Vec<Option<Rgb>>,
    attrs: Vec<AttrFlags>,
    row: u32,
    col: u32,
    /// Highest row a cell was ever written on.
    row_max: u32,
    written: bool,
    saved: (u32, u32),
    pen: Pen,
    defaults: PenDefaults,
    wrap: WrapPolicy,
    extended_seen: bool,
}

impl Decoder {
    fn new(columns: u32, defaults: PenDefaults, wrap: WrapPolicy) -> Self {
        Self {
            columns,
            rows: 0,
            glyphs: Vec::new(),
            fg: Vec::new(),
            bg: Vec::new(),
            attrs: Vec::new(),
            row: 0,
            col: 0,
            row_max: 0,
            written: false,
            saved: (0, 0),
            pen: Pen::reset(&defaults),
            defaults,
            wrap,
            extended_seen: false,
        }
    }

    /// Move the cursor down, capped so arithmetic never wraps.
    fn advance_row(&mut self, n: u32) {
        self.row = self.row.saturating_add(n).min(MAX_ROWS);
    }

    fn ensure_row(&mut self, row: u32) {
        if row < self.rows {
            return;
        }
        let len = (row as usize + 1) * self.columns as usize;
        self.glyphs.resize(len, Glyph::default());
        self.fg.resize(len, None);
        self.bg.resize(len, None);
        self.attrs.resize(len, AttrFlags::empty());
        self.rows = row + 1;
    }

    fn put(&mut self, glyph: Glyph) {
        if self.col >= self.columns {
            self.advance_row(1);
            self.col = 0;
        }
        self.ensure_row(self.row);
        let i = self.row as usize * self.columns as usize + self.col as usize;
        self.glyphs[i] = glyph;
        self.fg[i] = Some(self.pen.fg);
        self.bg[i] = self.pen.bg;
        self.attrs[i] = self.pen.flags;
        self.row_max = self.row_max.max(self.row);
        self.written = true;
        self.col += 1;
    }

    fn clamp_col(&self, col: u32) -> u32 {
        col.min(self.columns.saturating_sub(1))
    }

    fn apply(&mut self, op: CsiOp) {
        match op {
            CsiOp::Position { row, col } => {
                self.row = row.min(MAX_ROWS);
                self.col = self.clamp_col(col);
            }
            CsiOp::Up(n) => self.row = self.row.saturating_sub(n),
            CsiOp::Down(n) => self.advance_row(n),
            CsiOp::Forward(n) => self.col = (self.col + n).min(self.columns),
            CsiOp::Back(n) => self.col = self.col.saturating_sub(n),
            CsiOp::Column(col) => self.col = self.clamp_col(col),
            CsiOp::SaveCursor => self.saved = (self.row, self.col),
            CsiOp::RestoreCursor => (self.row, self.col) = self.saved,
            CsiOp::EraseDisplay(2) => {
                self.glyphs.clear();
                self.fg.clear();
                self.bg.clear();
                self.attrs.clear();
                self.rows = 0;
                self.row = 0;
                self.col = 0;
                self.row_max = 0;
                self.written = false;
                self.saved = (0, 0);
                self.pen = Pen::reset(&self.defaults);
            }
            // Partial erases don't affect stored art.
            CsiOp::EraseDisplay(_) => {}
            CsiOp::Sgr(params) => {
                let (pen, extended) = self.pen.apply_params(&params, &self.defaults);
                self.pen = pen;
                self.extended_seen |= extended;
            }
            CsiOp::Truecolor { foreground, rgb } => {
                let event = if foreground {
                    SgrEvent::FgRgb(rgb)
                } else {
                    SgrEvent::BgRgb(rgb)
                };
                self.pen = self.pen.apply(event, &self.defaults);
                self.extended_seen = true;
            }
            CsiOp::Ignored => {}
        }
    }

    /// Quantize the working planes into a committed document.
    fn commit(
        self,
        colors: &dyn ColorService,
        sauce: Option<SauceRecord>,
        choice: TextChoice,
        ice_colors: bool,
    ) -> ArtDocument {
        let palette = if self.extended_seen {
            PaletteRef::Xterm256
        } else {
            PaletteRef::Vga16
        };
        let rows = if self.written || self.row_max > 0 {
            self.row_max + 1
        } else {
            0
        };
        let mut doc = ArtDocument::new(self.columns);
        doc.palette = palette;
        for row in 0..self.rows {
            for col in 0..self.columns {
                let i = row as usize * self.columns as usize + col as usize;
                let quantize = |rgb: Option<Rgb>| match rgb {
                    Some(rgb) => ColorSlot::from_index(colors.nearest(palette, rgb)),
                    None => ColorSlot::UNSET,
                };
                doc.set_cell(
                    row,
                    col,
                    self.glyphs[i],
                    quantize(self.fg[i]),
                    quantize(self.bg[i]),
                    self.attrs[i],
                );
            }
        }
        // Rows reached only by newlines have no plane storage; materialize
        // them as blanks so trailing empty rows survive.
        if rows > 0 {
            doc.ensure_row(rows - 1);
        }
        doc.sauce = Some(sauce.unwrap_or_else(|| synthesize_sauce(&doc, choice, ice_colors)));
        doc
    }
}

fn synthesize_sauce(doc: &ArtDocument, choice: TextChoice, ice_colors: bool) -> SauceRecord {
    let font = match choice {
        TextChoice::Utf8 => FontId::Unscii,
        TextChoice::EightBit(ByteEncoding::Cp437) => FontId::IbmVga,
        TextChoice::EightBit(ByteEncoding::Latin1) => FontId::AmigaTopaz,
    };
    SauceRecord {
        data_type: DataType::Character,
        file_type: 1,
        tinfo1: doc.columns().min(u32::from(u16::MAX)) as u16,
        tinfo2: doc.rows().min(u32::from(u16::MAX)) as u16,
        flags: u8::from(ice_colors),
        font_name: font.sauce_name().to_string(),
        ..SauceRecord::default()
    }
}

/// Import an escape-sequence byte stream into a new document.
pub fn import_bytes(
    bytes: &[u8],
    options: &ImportOptions,
    colors: &dyn ColorService,
) -> Result<ArtDocument, ImportError> {
    if bytes.starts_with(b"XBIN\x1a") {
        return Err(ImportError::ForeignFormat { container: "an XBIN container" });
    }

    let scan = sauce::parse(bytes);
    let payload = &bytes[..scan.payload_len];
    let columns = detect::infer_columns(payload, scan.record.as_ref(), options.columns);
    let choice = detect::choose_encoding(payload, scan.record.as_ref(), options.prefer_eight_bit);
    debug!(columns, ?choice, payload_len = payload.len(), "importing stream");

    let mut dec = Decoder::new(columns, options.pen_defaults(), options.wrap);

    let mut i = 0;
    if choice == TextChoice::Utf8 && payload.starts_with(&UTF8_BOM) {
        i = UTF8_BOM.len();
    }
    while i < payload.len() {
        let b = payload[i];
        if b == SUB {
            break;
        }
        // Classic renderers wrap the pending edge cursor before the next
        // byte — but not before a newline, which would double-advance.
        if dec.wrap == WrapPolicy::EagerEdge
            && dec.col >= dec.columns
            && b != b'\n'
            && b != b'\r'
        {
            dec.advance_row(1);
            dec.col = 0;
        }
        match b {
            b'\n' => {
                dec.advance_row(1);
                dec.col = 0;
                // The row a newline lands on exists even if nothing is
                // ever written there.
                dec.row_max = dec.row_max.max(dec.row);
                i += 1;
            }
            b'\r' => {
                dec.col = 0;
                i += 1;
            }
            b'\t' => {
                let stop = (dec.col / 8 + 1) * 8;
                while dec.col < stop && dec.col < dec.columns {
                    dec.put(Glyph::default());
                }
                i += 1;
            }
            ESC if payload.get(i + 1) == Some(&b'[') => match scan_sequence(payload, i) {
                Ok((op, next)) => {
                    dec.apply(op);
                    i = next;
                }
                Err(next) => {
                    trace!(at = i, "abandoning malformed escape sequence");
                    i = next;
                }
            },
            // A bare ESC (no CSI introducer) is dropped.
            ESC => i += 1,
            _ => match choice {
                TextChoice::EightBit(_) => {
                    let glyph = if b < 0x20 { Glyph::Byte(b' ') } else { Glyph::Byte(b) };
                    dec.put(glyph);
                    i += 1;
                }
                TextChoice::Utf8 => {
                    if b < 0x20 {
                        // Non-printing in Unicode streams; only 8-bit art
                        // renders control bytes as cells.
                        i += 1;
                    } else if let Some((ch, len)) = decode_utf8(payload, i) {
                        dec.put(Glyph::Scalar(ch));
                        i += len;
                    } else {
                        dec.put(Glyph::Scalar('\u{FFFD}'));
                        i += 1;
                    }
                }
            },
        }
    }

    Ok(dec.commit(colors, scan.record, choice, options.ice_colors))
}

/// Import a file. Extension checks are the caller's concern.
pub fn import_file(
    path: impl AsRef<Path>,
    options: &ImportOptions,
    colors: &dyn ColorService,
) -> Result<ArtDocument, ImportError> {
    let bytes = std::fs::read(path)?;
    import_bytes(&bytes, options, colors)
}

/// Scan one CSI sequence at `start` (indexing the ESC byte).
///
/// `Ok` carries the decoded op and the resume index. `Err` carries the
/// resume index for an abandoned sequence (overlong, truncated, or
/// interrupted by a stray ESC).
fn scan_sequence(payload: &[u8], start: usize) -> Result<(CsiOp, usize), usize> {
    let body_start = start + 2;
    let mut i = body_start;
    loop {
        let Some(&b) = payload.get(i) else {
            // Truncated at end of stream.
            return Err(payload.len());
        };
        if b == ESC {
            return Err(i);
        }
        if (0x40..=0x7e).contains(&b) || b == b'!' {
            let params = parse_params(&payload[body_start..i]);
            return Ok((CsiOp::decode(b, params), i + 1));
        }
        if i - body_start >= SEQ_MAX_LEN {
            return Err(i);
        }
        i += 1;
    }
}

fn parse_params(body: &[u8]) -> Vec<u16> {
    if body.is_empty() {
        return Vec::new();
    }
    body.split(|&b| b == b';')
        .map(|part| {
            part.iter()
                .filter(|b| b.is_ascii_digit())
                .fold(0u32, |acc, &b| {
                    acc.saturating_mul(10).saturating_add(u32::from(b - b'0'))
                })
                .min(u32::from(u16::MAX)) as u16
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ansiscene_core::palette::BuiltinColors;

    fn import(bytes: &[u8]) -> ArtDocument {
        import_bytes(bytes, &ImportOptions::default(), &BuiltinColors::new()).unwrap()
    }

    fn import_with(bytes: &[u8], options: &ImportOptions) -> ArtDocument {
        import_bytes(bytes, options, &BuiltinColors::new()).unwrap()
    }

    // ── text state ─────────────────────────────────────────────────

    #[test]
    fn plain_text_lays_out_rows() {
        let doc = import(b"AB\nC");
        assert_eq!(doc.rows(), 2);
        assert_eq!(doc.cell(0, 0).0, Glyph::Byte(b'A'));
        assert_eq!(doc.cell(0, 1).0, Glyph::Byte(b'B'));
        assert_eq!(doc.cell(1, 0).0, Glyph::Byte(b'C'));
    }

    #[test]
    fn carriage_return_resets_column_only() {
        let doc = import(b"AB\rC");
        assert_eq!(doc.cell(0, 0).0, Glyph::Byte(b'C'));
        assert_eq!(doc.cell(0, 1).0, Glyph::Byte(b'B'));
        assert_eq!(doc.rows(), 1);
    }

    #[test]
    fn tab_advances_to_eight_stop_with_blank_cells() {
        let doc = import(b"A\tB");
        assert_eq!(doc.cell(0, 8).0, Glyph::Byte(b'B'));
        // The cells between are materialized blanks, not holes.
        assert_eq!(doc.cell(0, 4).0, Glyph::default());
    }

    #[test]
    fn sub_byte_ends_the_stream() {
        let doc = import(b"A\x1aB");
        assert_eq!(doc.rows(), 1);
        assert_eq!(doc.cell(0, 1).0, Glyph::default());
    }

    #[test]
    fn control_bytes_become_spaces_in_eight_bit_mode() {
        let doc = import(&[b'A', 0x01, b'B']);
        assert_eq!(doc.cell(0, 1).0, Glyph::Byte(b' '));
        assert_eq!(doc.cell(0, 2).0, Glyph::Byte(b'B'));
    }

    #[test]
    fn control_bytes_are_nonprinting_in_utf8_mode() {
        let options = ImportOptions { prefer_eight_bit: false, ..ImportOptions::default() };
        let doc = import_with(&[b'A', 0x01, b'B'], &options);
        assert_eq!(doc.cell(0, 1).0, Glyph::Scalar('B'));
        assert_eq!(doc.cell(0, 2).0, Glyph::default());
    }

    #[test]
    fn trailing_newlines_keep_their_rows() {
        assert_eq!(import(b"A").rows(), 1);
        let doc = import(b"A\n\n");
        assert_eq!(doc.rows(), 3);
        assert_eq!(doc.cell(2, 0).0, Glyph::default());
        assert!(doc.cell(2, 0).1.is_unset());
    }

    #[test]
    fn newline_only_streams_still_have_rows() {
        assert_eq!(import(b"\n").rows(), 2);
    }

    // ── wrapping ───────────────────────────────────────────────────

    #[test]
    fn eager_wrap_does_not_double_advance_on_newline() {
        let mut bytes = "x".repeat(80).into_bytes();
        bytes.extend_from_slice(b"\ny");
        let doc = import(&bytes);
        assert_eq!(doc.cell(1, 0).0, Glyph::Byte(b'y'));
        assert_eq!(doc.rows(), 2);
    }

    #[test]
    fn eager_wrap_applies_before_a_glyph() {
        let mut bytes = "x".repeat(80).into_bytes();
        bytes.push(b'y');
        let doc = import(&bytes);
        assert_eq!(doc.cell(1, 0).0, Glyph::Byte(b'y'));
    }

    #[test]
    fn at_write_wrap_only_wraps_on_glyphs() {
        let options = ImportOptions { wrap: WrapPolicy::AtWrite, ..ImportOptions::default() };
        let mut bytes = "x".repeat(80).into_bytes();
        bytes.extend_from_slice(b"\ny");
        let doc = import_with(&bytes, &options);
        assert_eq!(doc.cell(1, 0).0, Glyph::Byte(b'y'));
    }

    // ── cursor sequences ───────────────────────────────────────────

    #[test]
    fn absolute_position_is_one_based() {
        let doc = import(b"\x1b[3;5HX");
        assert_eq!(doc.cell(2, 4).0, Glyph::Byte(b'X'));
    }

    #[test]
    fn zero_parameters_act_as_one() {
        let doc = import(b"\x1b[0;0HX");
        assert_eq!(doc.cell(0, 0).0, Glyph::Byte(b'X'));
    }

    #[test]
    fn relative_motion() {
        let doc = import(b"A\x1b[2B\x1b[3CX");
        assert_eq!(doc.cell(2, 4).0, Glyph::Byte(b'X'));
    }

    #[test]
    fn cursor_forward_clamps_to_width() {
        let doc = import_with(
            b"\x1b[500CX",
            &ImportOptions { columns: Some(10), ..ImportOptions::default() },
        );
        // Forward clamps to the edge; the write wraps to the next row.
        assert_eq!(doc.cell(1, 0).0, Glyph::Byte(b'X'));
    }

    #[test]
    fn save_and_restore_single_slot() {
        let doc = import(b"\x1b[2;2H\x1b[sZZ\x1b[uY");
        assert_eq!(doc.cell(1, 1).0, Glyph::Byte(b'Y'));
        assert_eq!(doc.cell(1, 2).0, Glyph::Byte(b'Z'));
    }

    #[test]
    fn restore_without_save_goes_home() {
        let doc = import(b"ABC\x1b[uX");
        assert_eq!(doc.cell(0, 0).0, Glyph::Byte(b'X'));
    }

    // ── erase ──────────────────────────────────────────────────────

    #[test]
    fn erase_display_2_clears_everything() {
        let doc = import(b"\x1b[31mA\x1b[2J");
        assert!(doc.is_empty());
    }

    #[test]
    fn erase_then_write_starts_fresh() {
        let doc = import(b"\x1b[31mA\x1b[2JB");
        assert_eq!(doc.rows(), 1);
        assert_eq!(doc.cell(0, 0).0, Glyph::Byte(b'B'));
        // Pen was reset by the erase: default light gray.
        assert_eq!(doc.cell(0, 0).1.index(), Some(7));
    }

    // ── colors ─────────────────────────────────────────────────────

    #[test]
    fn red_a() {
        let doc = import(b"\x1b[31mA");
        let (glyph, fg, _, _) = doc.cell(0, 0);
        assert_eq!(glyph, Glyph::Byte(b'A'));
        assert_eq!(doc.palette, PaletteRef::Vga16);
        assert_eq!(fg.index(), Some(1));
    }

    #[test]
    fn bold_red_is_bright_red() {
        let doc = import(b"\x1b[1;31mA");
        assert_eq!(doc.cell(0, 0).1.index(), Some(9));
        assert!(doc.cell(0, 0).3.contains(AttrFlags::BOLD));
    }

    #[test]
    fn ice_bright_background() {
        let doc = import(b"\x1b[5;44mA");
        assert_eq!(doc.cell(0, 0).2.index(), Some(12));
        assert!(!doc.cell(0, 0).3.contains(AttrFlags::BLINK));
    }

    #[test]
    fn literal_blink_when_ice_disabled() {
        let options = ImportOptions { ice_colors: false, ..ImportOptions::default() };
        let doc = import_with(b"\x1b[5;44mA", &options);
        assert_eq!(doc.cell(0, 0).2.index(), Some(4));
        assert!(doc.cell(0, 0).3.contains(AttrFlags::BLINK));
    }

    #[test]
    fn xterm256_switches_palette() {
        let doc = import(b"\x1b[38;5;196mA");
        assert_eq!(doc.palette, PaletteRef::Xterm256);
        assert_eq!(doc.cell(0, 0).1.index(), Some(196));
    }

    #[test]
    fn pablo_truecolor_terminator() {
        let doc = import(b"\x1b[1;255;0;0tA");
        assert_eq!(doc.palette, PaletteRef::Xterm256);
        // Pure red quantizes to xterm 196 (0xff0000) or the system red 9.
        let idx = doc.cell(0, 0).1.index().unwrap();
        let rgb = BuiltinColors::new().rgb_of(PaletteRef::Xterm256, idx).unwrap();
        assert_eq!(rgb, Rgb::new(0xff, 0, 0));
    }

    #[test]
    fn unwritten_cells_have_unset_colors() {
        let doc = import(b"\x1b[3CX");
        assert!(doc.cell(0, 0).1.is_unset());
        assert!(doc.cell(0, 0).2.is_unset());
    }

    // ── malformed input ────────────────────────────────────────────

    #[test]
    fn xbin_magic_is_a_directed_failure() {
        let err = import_bytes(b"XBIN\x1a\x00\x00", &ImportOptions::default(), &BuiltinColors::new());
        assert!(matches!(err, Err(ImportError::ForeignFormat { .. })));
    }

    #[test]
    fn overlong_sequence_is_abandoned() {
        let mut bytes = b"\x1b[".to_vec();
        bytes.extend_from_slice(&[b'1'; 100]);
        bytes.extend_from_slice(b"mA");
        let doc = import(&bytes);
        // Decoding resumed; the 'A' (and stray digits) still landed.
        assert!(doc.rows() >= 1);
    }

    #[test]
    fn truncated_sequence_at_eof() {
        let doc = import(b"A\x1b[31");
        assert_eq!(doc.rows(), 1);
        assert_eq!(doc.cell(0, 0).0, Glyph::Byte(b'A'));
    }

    #[test]
    fn stray_esc_inside_sequence_recovers() {
        let doc = import(b"\x1b[3\x1b[31mA");
        assert_eq!(doc.cell(0, 0).1.index(), Some(1));
    }

    #[test]
    fn deep_cursor_descent_saturates_instead_of_wrapping() {
        // Enough maximal cursor-down motion to overflow 32-bit row math if
        // it were unchecked.
        let mut bytes = Vec::new();
        for _ in 0..70_000 {
            bytes.extend_from_slice(b"\x1b[65535B");
        }
        bytes.push(b'X');
        let doc = import(&bytes);
        assert_eq!(doc.rows(), MAX_ROWS + 1);
        assert_eq!(doc.cell(MAX_ROWS, 0).0, Glyph::Byte(b'X'));
    }

    // ── metadata ───────────────────────────────────────────────────

    #[test]
    fn synthesized_record_for_bare_streams() {
        let doc = import(b"hi");
        let rec = doc.sauce.as_ref().unwrap();
        assert_eq!(rec.data_type, DataType::Character);
        assert_eq!(rec.tinfo1, 80);
        assert_eq!(rec.tinfo2, 1);
        assert_eq!(rec.font_name, "IBM VGA");
    }

    #[test]
    fn existing_record_is_carried_through() {
        let mut bytes = b"hi".to_vec();
        let rec = SauceRecord {
            title: "untitled".into(),
            data_type: DataType::Character,
            file_type: 1,
            tinfo1: 100,
            ..SauceRecord::default()
        };
        sauce::append(&mut bytes, &rec, &sauce::SauceWriteOptions::default()).unwrap();
        let doc = import(&bytes);
        assert_eq!(doc.columns(), 100);
        assert_eq!(doc.sauce.as_ref().unwrap().title, "untitled");
    }

    // ── utf-8 ──────────────────────────────────────────────────────

    #[test]
    fn utf8_stream_auto_upgrades() {
        let doc = import("══╬══ ░▒▓ art ▓▒░ ══╬══".as_bytes());
        assert_eq!(doc.cell(0, 0).0, Glyph::Scalar('═'));
    }

    #[test]
    fn bom_is_skipped_not_rendered() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice("héllo wörld façade née".as_bytes());
        let doc = import(&bytes);
        assert_eq!(doc.cell(0, 0).0, Glyph::Scalar('h'));
    }

    #[test]
    fn invalid_utf8_bytes_become_replacement_chars() {
        let options = ImportOptions { prefer_eight_bit: false, ..ImportOptions::default() };
        let doc = import_with(&[b'A', 0xff, b'B'], &options);
        assert_eq!(doc.cell(0, 1).0, Glyph::Scalar('\u{FFFD}'));
        assert_eq!(doc.cell(0, 2).0, Glyph::Scalar('B'));
    }
}
