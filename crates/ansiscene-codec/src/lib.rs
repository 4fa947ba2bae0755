//! Bidirectional codec between ANSI-art escape-sequence streams and the
//! cell-plane document model in `ansiscene-core`.
//!
//! Primary responsibilities:
//! - Decode `.ans`-style byte streams into [`ArtDocument`]s, tolerating the
//!   malformed sequences real art collections contain ([`import`]).
//! - Encode documents back into streams under a configurable strategy
//!   surface: color modes, attribute conventions, trimming, compression,
//!   and metadata trailers ([`export`]).
//! - Track SGR pen state with the classic bold-bright and iCE-blink
//!   conventions ([`pen`]).
//! - Infer column width and text encoding before decoding ([`detect`]).
//! - Ship named profiles for common tools ([`preset`]).
//!
//! Design principles:
//! - Imports never fail on content. Unknown or malformed sequences are
//!   skipped; only foreign container signatures and I/O error out.
//! - The pen is a pure value: every SGR application is a function from one
//!   pen state to the next, so both directions share one semantics.
//! - Color math lives behind `ansiscene_core`'s `ColorService`; the codec
//!   asks, it never computes.
//!
//! [`ArtDocument`]: ansiscene_core::document::ArtDocument

#![forbid(unsafe_code)]

pub mod detect;
pub mod export;
pub mod import;
pub mod pen;
pub mod preset;

pub use detect::{TextChoice, UTF8_BOM, choose_encoding, infer_columns};
pub use export::{
    AttrMode, BrightStyle, ColorMode, EXPORT_EXTENSIONS, ExportError, ExportOptions, Newline,
    ScreenPrep, TextEncoding, export_bytes, export_file,
};
pub use import::{
    IMPORT_EXTENSIONS, ImportError, ImportOptions, WrapPolicy, import_bytes, import_file,
};
pub use pen::{Pen, PenColorMode, PenDefaults, SgrEvent};
pub use preset::{PRESETS, Preset, PresetId, preset, preset_by_name};
