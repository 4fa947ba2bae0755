#![forbid(unsafe_code)]

//! Document model for text-mode art.
//!
//! `ansiscene-core` owns the structured state shared by the stream codecs:
//! the flat cell-plane document, color palettes and quantization, the legacy
//! byte↔Unicode codepoint tables, the SAUCE font registry, and the SAUCE
//! metadata record itself.
//!
//! # Primary responsibilities
//!
//! - **Document**: columns × rows cell planes (glyph, fg, bg, attributes).
//! - **Color**: RGB values, palette-index slots, attribute bitflags.
//! - **Palette**: VGA-16 and xterm-256 tables behind a quantization service.
//! - **Codepage**: CP437/Latin-1 decode tables and a raw UTF-8 decoder.
//! - **Font**: SAUCE font-name registry mapping names to byte encodings.
//! - **Sauce**: the fixed-layout metadata trailer parse/serialize bridge.
//!
//! # Design principles
//!
//! - **No I/O**: all types are pure data + logic; callers supply bytes.
//! - **Deterministic**: identical inputs always produce identical state.
//! - **`#![forbid(unsafe_code)]`**: safety enforced at compile time.

pub mod codepage;
pub mod color;
pub mod document;
pub mod font;
pub mod palette;
pub mod sauce;

pub use codepage::{ByteEncoding, decode_byte, decode_utf8, encode_byte};
pub use color::{AttrFlags, ColorSlot, Rgb};
pub use document::{ArtDocument, Glyph, MAX_COLUMNS, clamp_columns};
pub use font::FontId;
pub use palette::{BuiltinColors, ColorService, PaletteRef};
pub use sauce::{DataType, SauceError, SauceRecord, SauceScan, SauceWriteOptions};
