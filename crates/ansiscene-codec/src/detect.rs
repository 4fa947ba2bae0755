//! Pre-decode heuristics: column-width inference and encoding sniffing.
//!
//! Both are read-only scans over the raw payload, run before the importer so
//! it can size its planes and pick a glyph decoder up front.

use ansiscene_core::codepage::{ByteEncoding, decode_utf8};
use ansiscene_core::document::clamp_columns;
use ansiscene_core::font::FontId;
use ansiscene_core::sauce::SauceRecord;
use tracing::debug;

/// The UTF-8 BOM, sometimes written by modern editors.
pub const UTF8_BOM: [u8; 3] = [0xef, 0xbb, 0xbf];

const ESC: u8 = 0x1b;
const SUB: u8 = 0x1a;

/// Conventional art widths; inferred widths snap upward onto these.
const CONVENTIONAL_WIDTHS: [u32; 4] = [80, 100, 132, 160];

/// Resolved text-decoding mode for a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextChoice {
    EightBit(ByteEncoding),
    Utf8,
}

/// Infer the column count for a payload.
///
/// Precedence: caller override, SAUCE-declared width, then the widest column
/// the stream itself demonstrably uses (explicit cursor addressing, or a
/// no-wrap replay of newline-separated lines), snapped up to a conventional
/// width. Falls back to 80.
#[must_use]
pub fn infer_columns(
    payload: &[u8],
    sauce: Option<&SauceRecord>,
    override_columns: Option<u32>,
) -> u32 {
    if let Some(cols) = override_columns {
        return clamp_columns(cols);
    }
    if let Some(cols) = sauce.and_then(SauceRecord::declared_columns) {
        debug!(cols, "width from metadata record");
        return clamp_columns(cols);
    }

    let explicit = max_explicit_column(payload);
    let simulated = if payload.contains(&b'\n') {
        simulate_no_wrap(payload)
    } else {
        0
    };
    let widest = explicit.max(simulated);
    if widest == 0 {
        return 80;
    }
    let cols = clamp_columns(normalize_width(widest));
    debug!(explicit, simulated, cols, "inferred width from stream");
    cols
}

/// Snap a measured width up to the next conventional size. Anything at or
/// under 80 is 80; widths beyond 160 are kept as measured.
fn normalize_width(width: u32) -> u32 {
    for &conventional in &CONVENTIONAL_WIDTHS {
        if width <= conventional {
            return conventional;
        }
    }
    width
}

/// The widest 1-based column referenced by absolute positioning (`H`/`f`)
/// or absolute column (`G`) sequences.
fn max_explicit_column(payload: &[u8]) -> u32 {
    let mut max = 0u32;
    let mut i = 0;
    while i < payload.len() {
        let Some((params, terminator, next)) = scan_csi(payload, i) else {
            i += 1;
            continue;
        };
        match terminator {
            b'H' | b'f' => max = max.max(params.get(1).copied().unwrap_or(1).max(1)),
            b'G' => max = max.max(params.first().copied().unwrap_or(1).max(1)),
            _ => {}
        }
        i = next;
    }
    max
}

/// Replay cursor motion with wrapping disabled and record the widest column
/// a non-blank glyph lands on. Trailing blank padding never counts, so
/// padded 80-column exports don't inflate the result.
fn simulate_no_wrap(payload: &[u8]) -> u32 {
    let mut col = 0u32;
    let mut max = 0u32;
    let mut i = 0;
    while i < payload.len() {
        let b = payload[i];
        match b {
            SUB => break,
            b'\n' | b'\r' => {
                col = 0;
                i += 1;
            }
            b'\t' => {
                col = (col / 8).saturating_add(1).saturating_mul(8);
                i += 1;
            }
            ESC => {
                if let Some((params, terminator, next)) = scan_csi(payload, i) {
                    let count = params.first().copied().unwrap_or(1).max(1);
                    match terminator {
                        b'C' => col = col.saturating_add(count),
                        b'D' => col = col.saturating_sub(count),
                        b'G' => col = count - 1,
                        b'H' | b'f' => col = params.get(1).copied().unwrap_or(1).max(1) - 1,
                        _ => {}
                    }
                    i = next;
                } else {
                    i += 1;
                }
            }
            // UTF-8 continuation bytes don't occupy a column of their own.
            0x80..=0xbf => i += 1,
            _ => {
                if b != b' ' {
                    max = max.max(col.saturating_add(1));
                }
                col = col.saturating_add(1);
                i += 1;
            }
        }
    }
    max
}

/// Scan one CSI sequence starting at `start` (which must index an ESC).
/// Returns parsed parameters, the terminator byte, and the index just past
/// the sequence. `None` when this is not a well-formed CSI.
fn scan_csi(payload: &[u8], start: usize) -> Option<(Vec<u32>, u8, usize)> {
    if payload.get(start) != Some(&ESC) || payload.get(start + 1) != Some(&b'[') {
        return None;
    }
    let mut i = start + 2;
    let body_start = i;
    while let Some(&b) = payload.get(i) {
        if (0x40..=0x7e).contains(&b) || b == b'!' {
            let params = parse_params(&payload[body_start..i]);
            return Some((params, b, i + 1));
        }
        if i - body_start > 64 {
            return None;
        }
        i += 1;
    }
    None
}

fn parse_params(body: &[u8]) -> Vec<u32> {
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
        })
        .collect()
}

/// Decide the text decoding for a payload.
///
/// `prefer_eight_bit = false` forces UTF-8. Otherwise the stream starts as
/// 8-bit but upgrades to UTF-8 when a BOM opens the payload, the metadata
/// record declares a Unicode-oriented font, or the validity sniff fires.
/// The BOM always wins; a declared 8-bit font only suppresses the sniff —
/// an explicit signal beats statistics, not other explicit signals.
#[must_use]
pub fn choose_encoding(
    payload: &[u8],
    sauce: Option<&SauceRecord>,
    prefer_eight_bit: bool,
) -> TextChoice {
    if !prefer_eight_bit {
        return TextChoice::Utf8;
    }
    if payload.starts_with(&UTF8_BOM) {
        debug!("BOM present, decoding as UTF-8");
        return TextChoice::Utf8;
    }
    if let Some(font) = sauce
        .map(|rec| rec.font_name.as_str())
        .and_then(FontId::from_sauce_name)
    {
        return match font.byte_encoding() {
            Some(encoding) => TextChoice::EightBit(encoding),
            None => TextChoice::Utf8,
        };
    }
    if looks_like_utf8(payload) {
        debug!("payload sniffed as UTF-8");
        return TextChoice::Utf8;
    }
    TextChoice::EightBit(ByteEncoding::Cp437)
}

// Empirically tuned sniff thresholds. These are load-bearing for existing
// art collections; changing them is a behavioral regression, not a cleanup.
const UTF8_SNIFF_MIN_RATIO: f64 = 0.95;
const UTF8_SNIFF_MIN_MATCHES: usize = 4;

/// Validity sniff: with escape sequences stripped, do the non-ASCII bytes
/// overwhelmingly form syntactically valid UTF-8 sequences?
fn looks_like_utf8(payload: &[u8]) -> bool {
    let mut attempts = 0usize;
    let mut valid = 0usize;
    let mut i = 0;
    while i < payload.len() {
        let b = payload[i];
        if b == ESC {
            if let Some((_, _, next)) = scan_csi(payload, i) {
                i = next;
                continue;
            }
            i += 1;
            continue;
        }
        if b.is_ascii() {
            i += 1;
            continue;
        }
        attempts += 1;
        match decode_utf8(payload, i) {
            Some((_, len)) => {
                valid += 1;
                i += len;
            }
            None => i += 1,
        }
    }
    valid >= UTF8_SNIFF_MIN_MATCHES
        && (valid as f64) / (attempts as f64) >= UTF8_SNIFF_MIN_RATIO
}

#[cfg(test)]
mod tests {
    use super::*;
    use ansiscene_core::sauce::DataType;

    // ── width inference ────────────────────────────────────────────

    #[test]
    fn override_wins_over_everything() {
        let rec = SauceRecord {
            data_type: DataType::Character,
            tinfo1: 132,
            ..SauceRecord::default()
        };
        assert_eq!(infer_columns(b"\x1b[1;200H", Some(&rec), Some(40)), 40);
    }

    #[test]
    fn sauce_width_wins_over_stream() {
        let rec = SauceRecord {
            data_type: DataType::Character,
            tinfo1: 100,
            ..SauceRecord::default()
        };
        assert_eq!(infer_columns(b"\x1b[1;200H", Some(&rec), None), 100);
    }

    #[test]
    fn column_121_normalizes_to_132() {
        assert_eq!(infer_columns(b"\x1b[121Gx", None, None), 132);
    }

    #[test]
    fn absolute_position_column_counts() {
        assert_eq!(infer_columns(b"\x1b[5;81Hx", None, None), 100);
    }

    #[test]
    fn long_lines_with_newlines_measure_without_wrap() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice("x".repeat(97).as_bytes());
        bytes.extend_from_slice(b"   \nshort\n");
        assert_eq!(infer_columns(&bytes, None, None), 100);
    }

    #[test]
    fn trailing_blanks_do_not_inflate_width() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"art here");
        bytes.extend_from_slice(" ".repeat(120).as_bytes());
        bytes.push(b'\n');
        assert_eq!(infer_columns(&bytes, None, None), 80);
    }

    #[test]
    fn bare_text_defaults_to_80() {
        assert_eq!(infer_columns(b"hello", None, None), 80);
    }

    #[test]
    fn widths_beyond_160_kept_as_measured() {
        assert_eq!(infer_columns(b"\x1b[300Gx", None, None), 300);
    }

    #[test]
    fn cursor_forward_floods_saturate_width_inference() {
        use ansiscene_core::document::MAX_COLUMNS;
        // Enough maximal forward motion to overflow 32-bit column math if
        // it were unchecked.
        let mut bytes = Vec::new();
        for _ in 0..70_000 {
            bytes.extend_from_slice(b"\x1b[65535C");
        }
        bytes.extend_from_slice(b"x\n");
        assert_eq!(infer_columns(&bytes, None, None), MAX_COLUMNS);
    }

    // ── encoding choice ────────────────────────────────────────────

    #[test]
    fn forced_utf8() {
        assert_eq!(choose_encoding(b"abc", None, false), TextChoice::Utf8);
    }

    #[test]
    fn bom_upgrades_to_utf8() {
        let bytes = [0xef, 0xbb, 0xbf, b'h', b'i'];
        assert_eq!(choose_encoding(&bytes, None, true), TextChoice::Utf8);
    }

    #[test]
    fn mostly_valid_multibyte_upgrades() {
        let text = "═══ box drawing ═══ ░░▒▒▓▓".as_bytes();
        assert_eq!(choose_encoding(text, None, true), TextChoice::Utf8);
    }

    #[test]
    fn cp437_noise_stays_eight_bit() {
        // Classic block-character line: dense high bytes, invalid as UTF-8.
        let bytes = [0xdb, 0xdb, 0xb0, 0xb1, 0xb2, 0xdb, 0xdc, 0xdf, b' ', 0xb0];
        assert_eq!(
            choose_encoding(&bytes, None, true),
            TextChoice::EightBit(ByteEncoding::Cp437)
        );
    }

    #[test]
    fn fewer_than_four_matches_stays_eight_bit() {
        let text = "one é two è".as_bytes();
        assert_eq!(
            choose_encoding(text, None, true),
            TextChoice::EightBit(ByteEncoding::Cp437)
        );
    }

    #[test]
    fn declared_eight_bit_font_suppresses_sniff() {
        let rec = SauceRecord {
            font_name: "IBM VGA".into(),
            ..SauceRecord::default()
        };
        let text = "═══ very unicode ═══ ▓▓▓▓".as_bytes();
        assert_eq!(
            choose_encoding(text, Some(&rec), true),
            TextChoice::EightBit(ByteEncoding::Cp437)
        );
    }

    #[test]
    fn bom_overrides_declared_eight_bit_font() {
        let rec = SauceRecord {
            font_name: "IBM VGA".into(),
            ..SauceRecord::default()
        };
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"hello");
        assert_eq!(choose_encoding(&bytes, Some(&rec), true), TextChoice::Utf8);
    }

    #[test]
    fn declared_unicode_font_forces_utf8() {
        let rec = SauceRecord {
            font_name: "Unscii 16".into(),
            ..SauceRecord::default()
        };
        assert_eq!(choose_encoding(b"plain", Some(&rec), true), TextChoice::Utf8);
    }
}
