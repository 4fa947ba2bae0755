//! Named configuration profiles for common tools and workflows.
//!
//! A preset pairs importer and exporter options tuned for one target: the
//! classic scene pipeline, specific editors, or modern UTF-8 terminals.
//! Presets are plain data; callers can start from one and override fields.

use ansiscene_core::codepage::ByteEncoding;
use ansiscene_core::sauce::SauceWriteOptions;

use crate::export::{
    AttrMode, BrightStyle, ColorMode, ExportOptions, Newline, ScreenPrep, TextEncoding,
};
use crate::import::{ImportOptions, WrapPolicy};

/// Identifies a built-in profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetId {
    /// CP437, 16 colors, bold/blink bright, CRLF, full-width rows, SAUCE.
    SceneClassic,
    /// UTF-8 for modern terminals, quantized away from the themable low 16.
    ModernUtf8_240Safe,
    /// UTF-8 with the full xterm-256 range.
    ModernUtf8_256,
    /// UTF-8 with SGR 38;2/48;2 truecolor.
    TruecolorSgrUtf8,
    /// CP437 with a 16-color baseline and positional RGB overlays.
    TruecolorTripletCp437,
    DurdrawUtf8_256,
    MoebiusClassic,
    PablodrawClassic,
    IcydrawModern,
}

/// One named import/export pairing.
#[derive(Debug, Clone, Copy)]
pub struct Preset {
    pub id: PresetId,
    pub name: &'static str,
    pub description: &'static str,
    pub import: ImportOptions,
    pub export: ExportOptions,
}

const CLASSIC_IMPORT: ImportOptions = ImportOptions {
    columns: None,
    ice_colors: true,
    default_fg: None,
    default_bg: None,
    default_bg_unset: false,
    wrap: WrapPolicy::EagerEdge,
    prefer_eight_bit: true,
};

const MODERN_IMPORT: ImportOptions = ImportOptions {
    wrap: WrapPolicy::AtWrite,
    ..CLASSIC_IMPORT
};

const CLASSIC_EXPORT: ExportOptions = ExportOptions {
    text_encoding: TextEncoding::EightBit,
    byte_encoding: ByteEncoding::Cp437,
    color_mode: ColorMode::Ansi16,
    bright_style: BrightStyle::BoldAndIceBlink,
    attr_mode: AttrMode::ClassicDos,
    xterm_240_safe: false,
    triplet_baseline: true,
    preserve_line_length: true,
    compress: true,
    use_cursor_forward: false,
    screen_prep: ScreenPrep::None,
    final_reset: true,
    newline: Newline::CrLf,
    write_sauce: true,
    sauce: SauceWriteOptions { eof_byte: true, comments: true },
};

const MODERN_EXPORT: ExportOptions = ExportOptions {
    text_encoding: TextEncoding::Utf8,
    color_mode: ColorMode::Xterm256,
    bright_style: BrightStyle::Direct90,
    attr_mode: AttrMode::Modern,
    preserve_line_length: false,
    newline: Newline::Lf,
    write_sauce: false,
    ..CLASSIC_EXPORT
};

/// The built-in profile table.
pub const PRESETS: &[Preset] = &[
    Preset {
        id: PresetId::SceneClassic,
        name: "scene-classic",
        description: "16-color CP437 with SAUCE, the traditional release pipeline",
        import: CLASSIC_IMPORT,
        export: CLASSIC_EXPORT,
    },
    Preset {
        id: PresetId::ModernUtf8_240Safe,
        name: "modern-utf8-240",
        description: "UTF-8 terminals, colors kept out of the themable low 16",
        import: MODERN_IMPORT,
        export: ExportOptions {
            xterm_240_safe: true,
            ..MODERN_EXPORT
        },
    },
    Preset {
        id: PresetId::ModernUtf8_256,
        name: "modern-utf8-256",
        description: "UTF-8 terminals with the full indexed-256 range",
        import: MODERN_IMPORT,
        export: MODERN_EXPORT,
    },
    Preset {
        id: PresetId::TruecolorSgrUtf8,
        name: "truecolor-sgr-utf8",
        description: "UTF-8 with 24-bit SGR color",
        import: MODERN_IMPORT,
        export: ExportOptions {
            color_mode: ColorMode::TrueColorSgr,
            ..MODERN_EXPORT
        },
    },
    Preset {
        id: PresetId::TruecolorTripletCp437,
        name: "truecolor-triplet-cp437",
        description: "16-color baseline with RGB overlays; degrades to plain ANSI",
        import: CLASSIC_IMPORT,
        export: ExportOptions {
            color_mode: ColorMode::TrueColorTriplet,
            ..CLASSIC_EXPORT
        },
    },
    Preset {
        id: PresetId::DurdrawUtf8_256,
        name: "durdraw",
        description: "durdraw-style verbose UTF-8, state re-established per cell",
        import: MODERN_IMPORT,
        export: ExportOptions {
            compress: false,
            preserve_line_length: true,
            ..MODERN_EXPORT
        },
    },
    Preset {
        id: PresetId::MoebiusClassic,
        name: "moebius",
        description: "Moebius-compatible classic CP437 output",
        import: CLASSIC_IMPORT,
        export: ExportOptions {
            preserve_line_length: false,
            ..CLASSIC_EXPORT
        },
    },
    Preset {
        id: PresetId::PablodrawClassic,
        name: "pablodraw",
        description: "PabloDraw-compatible CP437 with cursor-forward runs",
        import: CLASSIC_IMPORT,
        export: ExportOptions {
            preserve_line_length: false,
            use_cursor_forward: true,
            ..CLASSIC_EXPORT
        },
    },
    Preset {
        id: PresetId::IcydrawModern,
        name: "icydraw",
        description: "IcyDraw-style UTF-8 with BOM and SAUCE",
        import: MODERN_IMPORT,
        export: ExportOptions {
            text_encoding: TextEncoding::Utf8Bom,
            newline: Newline::CrLf,
            write_sauce: true,
            ..MODERN_EXPORT
        },
    },
];

/// Look up a profile by id.
#[must_use]
pub fn preset(id: PresetId) -> &'static Preset {
    // The table covers every variant; the scan cannot miss.
    PRESETS
        .iter()
        .find(|p| p.id == id)
        .unwrap_or(&PRESETS[0])
}

/// Look up a profile by its CLI-facing name.
#[must_use]
pub fn preset_by_name(name: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_id_resolves_to_itself() {
        for p in PRESETS {
            assert_eq!(preset(p.id).id, p.id);
        }
    }

    #[test]
    fn names_are_unique() {
        for (i, a) in PRESETS.iter().enumerate() {
            for b in &PRESETS[i + 1..] {
                assert_ne!(a.name, b.name);
            }
        }
    }

    #[test]
    fn lookup_by_name_is_case_insensitive() {
        let p = preset_by_name("PabloDraw").expect("known name");
        assert_eq!(p.id, PresetId::PablodrawClassic);
        assert!(p.export.use_cursor_forward);
    }

    #[test]
    fn classic_preset_round_trips_the_scene_pipeline() {
        let p = preset(PresetId::SceneClassic);
        assert!(p.import.ice_colors);
        assert_eq!(p.export.newline, Newline::CrLf);
        assert!(p.export.write_sauce);
        assert!(p.export.preserve_line_length);
    }

    #[test]
    fn modern_presets_prefer_lf_and_no_trailer() {
        for id in [PresetId::ModernUtf8_240Safe, PresetId::ModernUtf8_256] {
            let p = preset(id);
            assert_eq!(p.export.newline, Newline::Lf);
            assert!(!p.export.write_sauce);
        }
        assert!(preset(PresetId::ModernUtf8_240Safe).export.xterm_240_safe);
    }

    #[test]
    fn durdraw_disables_state_diffing() {
        let p = preset(PresetId::DurdrawUtf8_256);
        assert!(!p.export.compress);
        assert!(p.export.preserve_line_length);
    }
}
