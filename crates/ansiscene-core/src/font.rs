//! SAUCE font-name registry.
//!
//! The TInfoS field of a SAUCE record names the font the artist targeted.
//! The codec only cares about what that name implies for text decoding:
//! which 8-bit table applies, or whether the art is Unicode-oriented.

use crate::codepage::ByteEncoding;

/// Fonts the codec distinguishes, collapsed from the SAUCE name space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FontId {
    /// The "IBM VGA" family (any size/codepage variant). CP437 bytes.
    #[default]
    IbmVga,
    /// "IBM VGA50" — the 80×50 half-height variant. CP437 bytes.
    IbmVga50,
    /// The "Amiga Topaz" family. Latin-1 bytes.
    AmigaTopaz,
    /// "Unscii" — Unicode-native bitmap font, UTF-8 text.
    Unscii,
}

impl FontId {
    /// Resolve a SAUCE TInfoS string to a known font.
    ///
    /// Matching is by family prefix: "IBM VGA 437" and "IBM VGA" are the
    /// same family, "Amiga Topaz 1+" matches Topaz. Unknown names yield
    /// `None` and callers fall back to stream heuristics.
    #[must_use]
    pub fn from_sauce_name(name: &str) -> Option<FontId> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        if name.starts_with("IBM VGA50") {
            Some(FontId::IbmVga50)
        } else if name.starts_with("IBM VGA") || name.starts_with("IBM EGA") {
            Some(FontId::IbmVga)
        } else if name.starts_with("Amiga Topaz") || name.starts_with("Amiga MicroKnight")
            || name.starts_with("Amiga P0T-NOoDLE") || name.starts_with("Amiga mOsOul")
        {
            Some(FontId::AmigaTopaz)
        } else if name.starts_with("Unscii") {
            Some(FontId::Unscii)
        } else {
            None
        }
    }

    /// The canonical SAUCE TInfoS value for this font.
    #[must_use]
    pub fn sauce_name(self) -> &'static str {
        match self {
            FontId::IbmVga => "IBM VGA",
            FontId::IbmVga50 => "IBM VGA50",
            FontId::AmigaTopaz => "Amiga Topaz 1",
            FontId::Unscii => "Unscii 16",
        }
    }

    /// Whether text under this font is inherently Unicode-oriented.
    #[must_use]
    pub fn is_unicode_oriented(self) -> bool {
        matches!(self, FontId::Unscii)
    }

    /// The 8-bit decode table for this font, when it is byte-oriented.
    #[must_use]
    pub fn byte_encoding(self) -> Option<ByteEncoding> {
        match self {
            FontId::IbmVga | FontId::IbmVga50 => Some(ByteEncoding::Cp437),
            FontId::AmigaTopaz => Some(ByteEncoding::Latin1),
            FontId::Unscii => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_prefix_matching() {
        assert_eq!(FontId::from_sauce_name("IBM VGA"), Some(FontId::IbmVga));
        assert_eq!(FontId::from_sauce_name("IBM VGA 437"), Some(FontId::IbmVga));
        assert_eq!(FontId::from_sauce_name("IBM VGA50"), Some(FontId::IbmVga50));
        assert_eq!(FontId::from_sauce_name("Amiga Topaz 1+"), Some(FontId::AmigaTopaz));
        assert_eq!(FontId::from_sauce_name("Unscii 8"), Some(FontId::Unscii));
        assert_eq!(FontId::from_sauce_name("Commodore PETSCII"), None);
        assert_eq!(FontId::from_sauce_name("  "), None);
    }

    #[test]
    fn encoding_implications() {
        assert!(FontId::Unscii.is_unicode_oriented());
        assert_eq!(FontId::Unscii.byte_encoding(), None);
        assert_eq!(FontId::IbmVga.byte_encoding(), Some(ByteEncoding::Cp437));
        assert_eq!(FontId::AmigaTopaz.byte_encoding(), Some(ByteEncoding::Latin1));
    }
}
