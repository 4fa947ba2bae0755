//! The pen: SGR attribute/color state shared by import and export.
//!
//! Scene art leans on two historical conventions that make this more than a
//! plain SGR tracker: "bold" promotes a low foreground index into the bright
//! range, and under iCE colors "blink" promotes the background instead of
//! blinking. Both promotions are recorded in latches so that turning the
//! source attribute off reverses exactly that shift and never clobbers a
//! bright color the stream selected directly.
//!
//! Transitions are pure: [`Pen::apply`] consumes a pen and returns the next
//! one, so every convention is independently testable.

use ansiscene_core::color::{AttrFlags, Rgb};
use ansiscene_core::palette::{VGA16, xterm256};

/// Which color space a pen channel currently selects from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PenColorMode {
    #[default]
    Palette16,
    Indexed256,
    TrueColor,
}

/// Defaults the pen returns to on reset / SGR 39 / SGR 49.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PenDefaults {
    pub fg: Rgb,
    /// `None` leaves the background unset (transparent) on reset.
    pub bg: Option<Rgb>,
    /// Interpret SGR 5 as bright-background (iCE colors) instead of blink.
    pub ice_colors: bool,
}

impl Default for PenDefaults {
    fn default() -> Self {
        Self {
            fg: VGA16[7],
            bg: Some(VGA16[0]),
            ice_colors: true,
        }
    }
}

/// One recognized SGR parameter event.
///
/// Parsing a raw parameter list yields a sequence of these; unknown codes
/// are dropped at parse time, which is the tolerant-skip contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SgrEvent {
    Reset,
    Bold,
    Dim,
    Italic,
    Underline,
    Blink,
    Inverse,
    Strike,
    NormalIntensity,
    ItalicOff,
    UnderlineOff,
    BlinkOff,
    InverseOff,
    StrikeOff,
    DefaultFg,
    DefaultBg,
    /// SGR 30–37: index 0–7.
    FgLow(u8),
    /// SGR 90–97: index 8–15, selected directly.
    FgHigh(u8),
    /// SGR 40–47: index 0–7.
    BgLow(u8),
    /// SGR 100–107: index 8–15, selected directly.
    BgHigh(u8),
    /// SGR 38;5;n.
    Fg256(u8),
    /// SGR 48;5;n.
    Bg256(u8),
    /// SGR 38;2;r;g;b.
    FgRgb(Rgb),
    /// SGR 48;2;r;g;b.
    BgRgb(Rgb),
}

impl SgrEvent {
    /// Whether this event selects outside the classic 16-color space.
    #[must_use]
    pub fn is_extended_color(self) -> bool {
        matches!(
            self,
            SgrEvent::Fg256(_) | SgrEvent::Bg256(_) | SgrEvent::FgRgb(_) | SgrEvent::BgRgb(_)
        )
    }

    /// Parse a raw SGR parameter list into events.
    ///
    /// An empty list is a reset (`ESC[m`). The 38/48 extended selectors
    /// consume their sub-parameters; malformed extended forms are skipped.
    #[must_use]
    pub fn parse_list(params: &[u16]) -> Vec<SgrEvent> {
        if params.is_empty() {
            return vec![SgrEvent::Reset];
        }
        let mut out = Vec::with_capacity(params.len());
        let mut k = 0;
        while k < params.len() {
            let p = params[k];
            let event = match p {
                0 => Some(SgrEvent::Reset),
                1 => Some(SgrEvent::Bold),
                2 => Some(SgrEvent::Dim),
                3 => Some(SgrEvent::Italic),
                4 => Some(SgrEvent::Underline),
                5 | 6 => Some(SgrEvent::Blink),
                7 => Some(SgrEvent::Inverse),
                9 => Some(SgrEvent::Strike),
                22 => Some(SgrEvent::NormalIntensity),
                23 => Some(SgrEvent::ItalicOff),
                24 => Some(SgrEvent::UnderlineOff),
                25 => Some(SgrEvent::BlinkOff),
                27 => Some(SgrEvent::InverseOff),
                29 => Some(SgrEvent::StrikeOff),
                30..=37 => Some(SgrEvent::FgLow((p - 30) as u8)),
                39 => Some(SgrEvent::DefaultFg),
                40..=47 => Some(SgrEvent::BgLow((p - 40) as u8)),
                49 => Some(SgrEvent::DefaultBg),
                90..=97 => Some(SgrEvent::FgHigh((p - 90 + 8) as u8)),
                100..=107 => Some(SgrEvent::BgHigh((p - 100 + 8) as u8)),
                38 | 48 => {
                    let fg = p == 38;
                    match params.get(k + 1) {
                        Some(5) => {
                            let ev = params.get(k + 2).map(|&n| {
                                let n = n.min(255) as u8;
                                if fg { SgrEvent::Fg256(n) } else { SgrEvent::Bg256(n) }
                            });
                            k += 2;
                            ev
                        }
                        Some(2) => {
                            let ev = match (params.get(k + 2), params.get(k + 3), params.get(k + 4)) {
                                (Some(&r), Some(&g), Some(&b)) => {
                                    let rgb = Rgb::new(
                                        r.min(255) as u8,
                                        g.min(255) as u8,
                                        b.min(255) as u8,
                                    );
                                    Some(if fg { SgrEvent::FgRgb(rgb) } else { SgrEvent::BgRgb(rgb) })
                                }
                                _ => None,
                            };
                            k += 4;
                            ev
                        }
                        _ => {
                            k += 1;
                            None
                        }
                    }
                }
                _ => None,
            };
            if let Some(event) = event {
                out.push(event);
            }
            k += 1;
        }
        out
    }
}

/// The attribute/color tracker. One instance per decode or encode pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pen {
    pub fg_mode: PenColorMode,
    pub bg_mode: PenColorMode,
    /// Palette index when the channel mode is palette-based.
    pub fg_index: u16,
    pub bg_index: u16,
    /// Resolved colors. The background may be unset (transparent).
    pub fg: Rgb,
    pub bg: Option<Rgb>,
    pub flags: AttrFlags,
    /// True while the foreground index sits +8 because of SGR 1.
    pub fg_bright_from_bold: bool,
    /// True while SGR 5 (under iCE colors) is armed for background selects.
    pub ice_armed: bool,
    /// True while the background index sits +8 because of the iCE latch.
    pub bg_bright_from_ice: bool,
}

impl Pen {
    /// A pen at the reset state for the given defaults.
    #[must_use]
    pub fn reset(defaults: &PenDefaults) -> Self {
        Self {
            fg_mode: PenColorMode::Palette16,
            bg_mode: PenColorMode::Palette16,
            fg_index: 7,
            bg_index: 0,
            fg: defaults.fg,
            bg: defaults.bg,
            flags: AttrFlags::empty(),
            fg_bright_from_bold: false,
            ice_armed: false,
            bg_bright_from_ice: false,
        }
    }

    /// Apply one SGR event, producing the next pen state.
    #[must_use]
    pub fn apply(self, event: SgrEvent, defaults: &PenDefaults) -> Pen {
        let mut pen = self;
        match event {
            SgrEvent::Reset => pen = Pen::reset(defaults),
            SgrEvent::Bold => {
                pen.flags |= AttrFlags::BOLD;
                if pen.fg_mode == PenColorMode::Palette16 && pen.fg_index <= 7 {
                    pen.fg_index += 8;
                    pen.fg = VGA16[pen.fg_index as usize];
                    pen.fg_bright_from_bold = true;
                }
            }
            SgrEvent::NormalIntensity => {
                if pen.fg_bright_from_bold
                    && pen.fg_mode == PenColorMode::Palette16
                    && (8..=15).contains(&pen.fg_index)
                {
                    pen.fg_index -= 8;
                    pen.fg = VGA16[pen.fg_index as usize];
                }
                pen.fg_bright_from_bold = false;
                pen.flags -= AttrFlags::BOLD | AttrFlags::DIM;
            }
            SgrEvent::Dim => pen.flags |= AttrFlags::DIM,
            SgrEvent::Italic => pen.flags |= AttrFlags::ITALIC,
            SgrEvent::ItalicOff => pen.flags -= AttrFlags::ITALIC,
            SgrEvent::Underline => pen.flags |= AttrFlags::UNDERLINE,
            SgrEvent::UnderlineOff => pen.flags -= AttrFlags::UNDERLINE,
            SgrEvent::Blink => {
                if defaults.ice_colors {
                    pen.ice_armed = true;
                    if pen.bg_mode == PenColorMode::Palette16 && pen.bg_index <= 7 {
                        pen.bg_index += 8;
                        pen.bg = Some(VGA16[pen.bg_index as usize]);
                        pen.bg_bright_from_ice = true;
                    }
                } else {
                    pen.flags |= AttrFlags::BLINK;
                }
            }
            SgrEvent::BlinkOff => {
                if pen.ice_armed {
                    pen.ice_armed = false;
                    if pen.bg_bright_from_ice
                        && pen.bg_mode == PenColorMode::Palette16
                        && (8..=15).contains(&pen.bg_index)
                    {
                        pen.bg_index -= 8;
                        pen.bg = Some(VGA16[pen.bg_index as usize]);
                    }
                    pen.bg_bright_from_ice = false;
                }
                pen.flags -= AttrFlags::BLINK;
            }
            SgrEvent::Inverse => pen.flags |= AttrFlags::INVERSE,
            SgrEvent::InverseOff => pen.flags -= AttrFlags::INVERSE,
            SgrEvent::Strike => pen.flags |= AttrFlags::STRIKETHROUGH,
            SgrEvent::StrikeOff => pen.flags -= AttrFlags::STRIKETHROUGH,
            SgrEvent::DefaultFg => {
                pen.fg_mode = PenColorMode::Palette16;
                pen.fg_index = 7;
                pen.fg = defaults.fg;
                pen.fg_bright_from_bold = false;
            }
            SgrEvent::DefaultBg => {
                pen.bg_mode = PenColorMode::Palette16;
                pen.bg_index = 0;
                pen.bg = defaults.bg;
                pen.bg_bright_from_ice = false;
            }
            SgrEvent::FgLow(n) => {
                let bright = pen.flags.contains(AttrFlags::BOLD);
                pen.fg_mode = PenColorMode::Palette16;
                pen.fg_index = u16::from(n) + if bright { 8 } else { 0 };
                pen.fg = VGA16[pen.fg_index as usize];
                pen.fg_bright_from_bold = bright;
            }
            SgrEvent::FgHigh(n) => {
                pen.fg_mode = PenColorMode::Palette16;
                pen.fg_index = u16::from(n);
                pen.fg = VGA16[pen.fg_index as usize];
                pen.fg_bright_from_bold = false;
            }
            SgrEvent::BgLow(n) => {
                let bright = pen.ice_armed;
                pen.bg_mode = PenColorMode::Palette16;
                pen.bg_index = u16::from(n) + if bright { 8 } else { 0 };
                pen.bg = Some(VGA16[pen.bg_index as usize]);
                pen.bg_bright_from_ice = bright;
            }
            SgrEvent::BgHigh(n) => {
                pen.bg_mode = PenColorMode::Palette16;
                pen.bg_index = u16::from(n);
                pen.bg = Some(VGA16[pen.bg_index as usize]);
                pen.bg_bright_from_ice = false;
            }
            SgrEvent::Fg256(n) => {
                pen.fg_mode = PenColorMode::Indexed256;
                pen.fg_index = u16::from(n);
                pen.fg = xterm256()[n as usize];
                pen.fg_bright_from_bold = false;
            }
            SgrEvent::Bg256(n) => {
                pen.bg_mode = PenColorMode::Indexed256;
                pen.bg_index = u16::from(n);
                pen.bg = Some(xterm256()[n as usize]);
                pen.bg_bright_from_ice = false;
            }
            SgrEvent::FgRgb(rgb) => {
                pen.fg_mode = PenColorMode::TrueColor;
                pen.fg = rgb;
                pen.fg_bright_from_bold = false;
            }
            SgrEvent::BgRgb(rgb) => {
                pen.bg_mode = PenColorMode::TrueColor;
                pen.bg = Some(rgb);
                pen.bg_bright_from_ice = false;
            }
        }
        pen
    }

    /// Fold a raw SGR parameter list. Returns the next pen and whether any
    /// event selected extended (256/truecolor) color.
    #[must_use]
    pub fn apply_params(self, params: &[u16], defaults: &PenDefaults) -> (Pen, bool) {
        let mut pen = self;
        let mut extended = false;
        for event in SgrEvent::parse_list(params) {
            extended |= event.is_extended_color();
            pen = pen.apply(event, defaults);
        }
        (pen, extended)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d() -> PenDefaults {
        PenDefaults::default()
    }

    // ── parse ──────────────────────────────────────────────────────

    #[test]
    fn empty_param_list_is_reset() {
        assert_eq!(SgrEvent::parse_list(&[]), vec![SgrEvent::Reset]);
    }

    #[test]
    fn extended_selectors_consume_subparams() {
        assert_eq!(
            SgrEvent::parse_list(&[38, 5, 196, 1]),
            vec![SgrEvent::Fg256(196), SgrEvent::Bold]
        );
        assert_eq!(
            SgrEvent::parse_list(&[48, 2, 10, 20, 30]),
            vec![SgrEvent::BgRgb(Rgb::new(10, 20, 30))]
        );
    }

    #[test]
    fn malformed_extended_selector_is_skipped() {
        assert_eq!(SgrEvent::parse_list(&[38, 2, 10]), vec![]);
        // An unknown sub-selector drops the 38 pair; parsing resumes after.
        assert_eq!(SgrEvent::parse_list(&[38, 9, 31]), vec![SgrEvent::FgLow(1)]);
    }

    #[test]
    fn unknown_codes_are_dropped() {
        assert_eq!(SgrEvent::parse_list(&[31, 51, 42]), vec![
            SgrEvent::FgLow(1),
            SgrEvent::BgLow(2),
        ]);
    }

    // ── bold / bright latch ────────────────────────────────────────

    #[test]
    fn bold_promotes_low_fg_and_22_reverses() {
        let pen = Pen::reset(&d()).apply(SgrEvent::Bold, &d());
        assert_eq!(pen.fg_index, 15);
        assert!(pen.fg_bright_from_bold);
        assert!(pen.flags.contains(AttrFlags::BOLD));

        let pen = pen.apply(SgrEvent::NormalIntensity, &d());
        assert_eq!(pen.fg_index, 7);
        assert!(!pen.fg_bright_from_bold);
        assert!(!pen.flags.contains(AttrFlags::BOLD));
    }

    #[test]
    fn bold_then_color_select_stays_bright() {
        let pen = Pen::reset(&d())
            .apply(SgrEvent::Bold, &d())
            .apply(SgrEvent::FgLow(1), &d());
        assert_eq!(pen.fg_index, 9);
        assert_eq!(pen.fg, VGA16[9]);
        assert!(pen.fg_bright_from_bold);
    }

    #[test]
    fn direct_high_select_is_not_latched() {
        let pen = Pen::reset(&d()).apply(SgrEvent::FgHigh(12), &d());
        assert!(!pen.fg_bright_from_bold);
        // 22 must not darken a directly selected bright color.
        let pen = pen.apply(SgrEvent::NormalIntensity, &d());
        assert_eq!(pen.fg_index, 12);
    }

    // ── iCE colors ─────────────────────────────────────────────────

    #[test]
    fn ice_blink_bumps_bg_and_25_restores() {
        let pen = Pen::reset(&d())
            .apply(SgrEvent::BgLow(3), &d())
            .apply(SgrEvent::Blink, &d());
        assert_eq!(pen.bg_index, 11);
        assert!(pen.ice_armed);
        assert!(pen.bg_bright_from_ice);
        assert!(!pen.flags.contains(AttrFlags::BLINK));

        let pen = pen.apply(SgrEvent::BlinkOff, &d());
        assert_eq!(pen.bg_index, 3);
        assert!(!pen.ice_armed);
        assert!(!pen.bg_bright_from_ice);
    }

    #[test]
    fn armed_ice_latch_brightens_later_bg_selects() {
        let pen = Pen::reset(&d())
            .apply(SgrEvent::Blink, &d())
            .apply(SgrEvent::BgLow(4), &d());
        assert_eq!(pen.bg_index, 12);
        assert!(pen.bg_bright_from_ice);
    }

    #[test]
    fn blink_off_keeps_direct_bright_bg() {
        let pen = Pen::reset(&d())
            .apply(SgrEvent::BgHigh(12), &d())
            .apply(SgrEvent::BlinkOff, &d());
        assert_eq!(pen.bg_index, 12);
    }

    #[test]
    fn literal_blink_without_ice_convention() {
        let no_ice = PenDefaults { ice_colors: false, ..d() };
        let pen = Pen::reset(&no_ice).apply(SgrEvent::Blink, &no_ice);
        assert!(pen.flags.contains(AttrFlags::BLINK));
        assert_eq!(pen.bg_index, 0);
    }

    // ── defaults and channels ──────────────────────────────────────

    #[test]
    fn default_fg_does_not_touch_bg() {
        let pen = Pen::reset(&d())
            .apply(SgrEvent::BgLow(2), &d())
            .apply(SgrEvent::FgLow(1), &d())
            .apply(SgrEvent::DefaultFg, &d());
        assert_eq!(pen.fg_index, 7);
        assert_eq!(pen.bg_index, 2);
    }

    #[test]
    fn unset_default_bg() {
        let unset = PenDefaults { bg: None, ..d() };
        let pen = Pen::reset(&unset);
        assert_eq!(pen.bg, None);
        let pen = pen.apply(SgrEvent::BgLow(1), &unset).apply(SgrEvent::DefaultBg, &unset);
        assert_eq!(pen.bg, None);
    }

    #[test]
    fn classic_16_rgb_resolution() {
        for n in 0..8u8 {
            let pen = Pen::reset(&d()).apply(SgrEvent::FgLow(n), &d());
            assert_eq!(pen.fg, VGA16[n as usize]);
            let pen = Pen::reset(&d()).apply(SgrEvent::FgHigh(n + 8), &d());
            assert_eq!(pen.fg, VGA16[(n + 8) as usize]);
        }
    }

    // ── extended color ─────────────────────────────────────────────

    #[test]
    fn extended_color_flag_reported() {
        let (pen, extended) = Pen::reset(&d()).apply_params(&[38, 5, 208], &d());
        assert!(extended);
        assert_eq!(pen.fg_mode, PenColorMode::Indexed256);
        assert_eq!(pen.fg_index, 208);

        let (_, extended) = Pen::reset(&d()).apply_params(&[1, 33], &d());
        assert!(!extended);
    }

    #[test]
    fn truecolor_sets_mode_and_rgb() {
        let (pen, _) = Pen::reset(&d()).apply_params(&[48, 2, 1, 2, 3], &d());
        assert_eq!(pen.bg_mode, PenColorMode::TrueColor);
        assert_eq!(pen.bg, Some(Rgb::new(1, 2, 3)));
    }
}
