//! Legacy byte↔Unicode codepoint tables and a raw UTF-8 decoder.
//!
//! Classic scene art stores one glyph per byte under CP437 (or Latin-1 for
//! Amiga-oriented fonts). The tables here are the fixed bridge between those
//! bytes and Unicode scalars; the UTF-8 decoder is the strict incremental
//! form used both for decoding modern art and for the encoding sniffer.

use std::collections::HashMap;
use std::sync::OnceLock;

/// How a raw glyph byte maps to a Unicode scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ByteEncoding {
    /// IBM PC code page 437, the classic DOS art encoding.
    #[default]
    Cp437,
    /// ISO 8859-1, used by Amiga-oriented fonts.
    Latin1,
}

/// CP437 → Unicode, all 256 entries.
///
/// The control range 0x00–0x1F maps to the classic pictographs (☺, ♥, …)
/// rather than C0 controls; whether a byte is *treated* as a control is the
/// stream decoder's decision, not the table's. 0xFF is a non-breaking space.
pub const CP437_TO_UNICODE: [char; 256] = [
    ' ', '☺', '☻', '♥', '♦', '♣', '♠', '•', '◘', '○', '◙', '♂', '♀', '♪', '♫', '☼',
    '►', '◄', '↕', '‼', '¶', '§', '▬', '↨', '↑', '↓', '→', '←', '∟', '↔', '▲', '▼',
    ' ', '!', '"', '#', '$', '%', '&', '\'', '(', ')', '*', '+', ',', '-', '.', '/',
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', ':', ';', '<', '=', '>', '?',
    '@', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O',
    'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', '[', '\\', ']', '^', '_',
    '`', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o',
    'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', '{', '|', '}', '~', '⌂',
    'Ç', 'ü', 'é', 'â', 'ä', 'à', 'å', 'ç', 'ê', 'ë', 'è', 'ï', 'î', 'ì', 'Ä', 'Å',
    'É', 'æ', 'Æ', 'ô', 'ö', 'ò', 'û', 'ù', 'ÿ', 'Ö', 'Ü', '¢', '£', '¥', '₧', 'ƒ',
    'á', 'í', 'ó', 'ú', 'ñ', 'Ñ', 'ª', 'º', '¿', '⌐', '¬', '½', '¼', '¡', '«', '»',
    '░', '▒', '▓', '│', '┤', '╡', '╢', '╖', '╕', '╣', '║', '╗', '╝', '╜', '╛', '┐',
    '└', '┴', '┬', '├', '─', '┼', '╞', '╟', '╚', '╔', '╩', '╦', '╠', '═', '╬', '╧',
    '╨', '╤', '╥', '╙', '╘', '╒', '╓', '╫', '╪', '┘', '┌', '█', '▄', '▌', '▐', '▀',
    'α', 'ß', 'Γ', 'π', 'Σ', 'σ', 'µ', 'τ', 'Φ', 'Θ', 'Ω', 'δ', '∞', 'φ', 'ε', '∩',
    '≡', '±', '≥', '≤', '⌠', '⌡', '÷', '≈', '°', '∙', '·', '√', 'ⁿ', '²', '■', '\u{a0}',
];

/// Decode one glyph byte under the given encoding.
#[must_use]
pub fn decode_byte(b: u8, encoding: ByteEncoding) -> char {
    match encoding {
        ByteEncoding::Cp437 => CP437_TO_UNICODE[b as usize],
        // Latin-1 bytes are the first 256 Unicode scalars; C1 controls show
        // as blanks so art never paints raw control pictures.
        ByteEncoding::Latin1 => match b {
            0x00..=0x1f | 0x7f..=0x9f => ' ',
            _ => b as char,
        },
    }
}

/// Encode a Unicode scalar back to a glyph byte, if the encoding has one.
#[must_use]
pub fn encode_byte(ch: char, encoding: ByteEncoding) -> Option<u8> {
    match encoding {
        ByteEncoding::Cp437 => {
            if ch.is_ascii() {
                return Some(ch as u8);
            }
            Some(*unicode_to_cp437().get(&ch)?)
        }
        ByteEncoding::Latin1 => {
            let cp = ch as u32;
            if cp <= 0xff { Some(cp as u8) } else { None }
        }
    }
}

fn unicode_to_cp437() -> &'static HashMap<char, u8> {
    static MAP: OnceLock<HashMap<char, u8>> = OnceLock::new();
    MAP.get_or_init(|| {
        let mut map = HashMap::with_capacity(256);
        // Later (higher) bytes win nothing here: the table has one duplicate,
        // the space at 0x00 and 0x20. Insert low-to-high and keep the first
        // printable mapping for it.
        for (i, &ch) in CP437_TO_UNICODE.iter().enumerate() {
            map.entry(ch).or_insert(i as u8);
        }
        map.insert(' ', 0x20);
        map
    })
}

/// Decode one UTF-8 scalar starting at `offset`.
///
/// Returns the scalar and the number of bytes consumed, or `None` when the
/// bytes at `offset` are not a valid UTF-8 sequence (overlong forms,
/// surrogates, and truncations all reject). Strictness matters: the encoding
/// sniffer counts these rejections.
#[must_use]
pub fn decode_utf8(bytes: &[u8], offset: usize) -> Option<(char, usize)> {
    let lead = *bytes.get(offset)?;
    let len = match lead {
        0x00..=0x7f => return Some((lead as char, 1)),
        0xc2..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf4 => 4,
        // 0x80..=0xBF are bare continuations, 0xC0/0xC1 overlong leads,
        // 0xF5..=0xFF outside Unicode.
        _ => return None,
    };
    let seq = bytes.get(offset..offset + len)?;
    let s = core::str::from_utf8(seq).ok()?;
    let ch = s.chars().next()?;
    Some((ch, len))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── CP437 table ────────────────────────────────────────────────

    #[test]
    fn cp437_block_and_shade_glyphs() {
        assert_eq!(decode_byte(0xb0, ByteEncoding::Cp437), '░');
        assert_eq!(decode_byte(0xb1, ByteEncoding::Cp437), '▒');
        assert_eq!(decode_byte(0xdb, ByteEncoding::Cp437), '█');
        assert_eq!(decode_byte(0xdf, ByteEncoding::Cp437), '▀');
    }

    #[test]
    fn cp437_control_range_is_pictographic() {
        assert_eq!(decode_byte(0x01, ByteEncoding::Cp437), '☺');
        assert_eq!(decode_byte(0x0e, ByteEncoding::Cp437), '♫');
        assert_eq!(decode_byte(0x1f, ByteEncoding::Cp437), '▼');
    }

    #[test]
    fn cp437_ascii_is_identity() {
        for b in 0x20..0x7f_u8 {
            assert_eq!(decode_byte(b, ByteEncoding::Cp437), b as char);
        }
    }

    #[test]
    fn cp437_encode_reverses_decode() {
        for b in 0x21..=0xfe_u8 {
            let ch = decode_byte(b, ByteEncoding::Cp437);
            assert_eq!(encode_byte(ch, ByteEncoding::Cp437), Some(b), "byte {b:#04x}");
        }
    }

    #[test]
    fn cp437_encode_space_prefers_0x20() {
        assert_eq!(encode_byte(' ', ByteEncoding::Cp437), Some(0x20));
    }

    #[test]
    fn cp437_encode_unmappable_is_none() {
        assert_eq!(encode_byte('中', ByteEncoding::Cp437), None);
    }

    // ── Latin-1 ────────────────────────────────────────────────────

    #[test]
    fn latin1_high_half() {
        assert_eq!(decode_byte(0xe9, ByteEncoding::Latin1), 'é');
        assert_eq!(encode_byte('é', ByteEncoding::Latin1), Some(0xe9));
        assert_eq!(decode_byte(0x9b, ByteEncoding::Latin1), ' ');
    }

    // ── UTF-8 decoder ──────────────────────────────────────────────

    #[test]
    fn utf8_decodes_all_lengths() {
        assert_eq!(decode_utf8(b"a", 0), Some(('a', 1)));
        assert_eq!(decode_utf8("é".as_bytes(), 0), Some(('é', 2)));
        assert_eq!(decode_utf8("中".as_bytes(), 0), Some(('中', 3)));
        assert_eq!(decode_utf8("🎉".as_bytes(), 0), Some(('🎉', 4)));
    }

    #[test]
    fn utf8_rejects_overlong_and_truncated() {
        assert_eq!(decode_utf8(&[0xc0, 0xaf], 0), None);
        assert_eq!(decode_utf8(&[0xc3], 0), None);
        assert_eq!(decode_utf8(&[0xe4, 0xb8], 0), None);
        assert_eq!(decode_utf8(&[0x80], 0), None);
    }

    #[test]
    fn utf8_rejects_surrogate_encodings() {
        // U+D800 encoded as 0xED 0xA0 0x80.
        assert_eq!(decode_utf8(&[0xed, 0xa0, 0x80], 0), None);
    }
}
