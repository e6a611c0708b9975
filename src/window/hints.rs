//! ICCCM/MWM hint parsing and normalisation (§4.5 step 2, "Normalise size
//! hints").
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The largest coordinate/size ICCCM size hints are clamped to, matching
/// the historical `65535` cap callers of `XGetWMNormalHints` have always
/// had to defend against.
pub const SIZE_HINT_CAP: i32 = 65535;

/// Window gravity, used when the frame is resized to decide which corner
/// of the client stays fixed. `Static` keeps the client's root-relative
/// position fixed regardless of frame growth.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gravity {
    #[default]
    NorthWest,
    North,
    NorthEast,
    West,
    Center,
    East,
    SouthWest,
    South,
    SouthEast,
    Static,
}

/// Normalised `WM_NORMAL_HINTS`. Every field here has already had the
/// fix-ups of §4.5 applied: `min <= base <= max`, increments `>= 1`,
/// aspect-ratio terms `>= 1`, gravity defaulted, values capped at
/// [SIZE_HINT_CAP].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeHints {
    pub min_w: i32,
    pub min_h: i32,
    pub max_w: i32,
    pub max_h: i32,
    pub base_w: i32,
    pub base_h: i32,
    pub inc_w: i32,
    pub inc_h: i32,
    pub min_aspect: Option<(i32, i32)>,
    pub max_aspect: Option<(i32, i32)>,
    pub gravity: Gravity,
}

impl Default for SizeHints {
    fn default() -> Self {
        Self {
            min_w: 1,
            min_h: 1,
            max_w: SIZE_HINT_CAP,
            max_h: SIZE_HINT_CAP,
            base_w: 1,
            base_h: 1,
            inc_w: 1,
            inc_h: 1,
            min_aspect: None,
            max_aspect: None,
            gravity: Gravity::NorthWest,
        }
    }
}

/// Raw values as read straight off the wire, before normalisation. Any
/// field left `None` means the corresponding hint flag was unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawSizeHints {
    pub min_size: Option<(i32, i32)>,
    pub max_size: Option<(i32, i32)>,
    pub base_size: Option<(i32, i32)>,
    pub resize_inc: Option<(i32, i32)>,
    pub min_aspect: Option<(i32, i32)>,
    pub max_aspect: Option<(i32, i32)>,
    pub gravity: Option<Gravity>,
}

impl SizeHints {
    /// Apply the §4.5 step-2 normalisation rules to a raw wire reading.
    pub fn normalize(raw: RawSizeHints) -> Self {
        let cap = |v: i32| v.clamp(1, SIZE_HINT_CAP);

        let (mut min_w, mut min_h) = raw.min_size.map(|(w, h)| (cap(w), cap(h))).unwrap_or((1, 1));
        let (base_w, base_h) = raw
            .base_size
            .map(|(w, h)| (cap(w), cap(h)))
            .unwrap_or((min_w, min_h));
        // min <= base: a base smaller than the declared minimum is raised
        // to it rather than the other way around, since the minimum is the
        // harder constraint a client actually relies on.
        min_w = min_w.min(base_w);
        min_h = min_h.min(base_h);

        let (mut max_w, mut max_h) = raw
            .max_size
            .map(|(w, h)| (cap(w), cap(h)))
            .unwrap_or((SIZE_HINT_CAP, SIZE_HINT_CAP));
        max_w = max_w.max(min_w);
        max_h = max_h.max(min_h);

        let (inc_w, inc_h) = raw
            .resize_inc
            .map(|(w, h)| (w.max(1), h.max(1)))
            .unwrap_or((1, 1));

        let clamp_aspect = |a: Option<(i32, i32)>| a.map(|(n, d)| (n.max(1), d.max(1)));

        Self {
            min_w,
            min_h,
            max_w,
            max_h,
            base_w,
            base_h,
            inc_w,
            inc_h,
            min_aspect: clamp_aspect(raw.min_aspect),
            max_aspect: clamp_aspect(raw.max_aspect),
            gravity: raw.gravity.unwrap_or_default(),
        }
    }

    /// True when the client's min and max size are pinned equal on both
    /// axes (§4.5.1: such windows lose Resize/Maximize/Fullscreen).
    pub fn is_fixed_size(&self) -> bool {
        self.min_w == self.max_w && self.min_h == self.max_h
    }

    /// Apply `constrainNewWindowSize` (§4.8 step 5): clamp to min/max, snap
    /// to the nearest lower `base + k*inc` point, and if an aspect ratio is
    /// declared, nudge the result back inside `[min_aspect, max_aspect]`
    /// using 64-bit intermediate arithmetic to avoid overflow on large
    /// dimensions.
    pub fn constrain(&self, w: i32, h: i32) -> (i32, i32) {
        let mut w = w.clamp(self.min_w, self.max_w);
        let mut h = h.clamp(self.min_h, self.max_h);

        if self.inc_w > 1 {
            let steps = (w - self.base_w).max(0) / self.inc_w;
            w = (self.base_w + steps * self.inc_w).clamp(self.min_w, self.max_w);
        }
        if self.inc_h > 1 {
            let steps = (h - self.base_h).max(0) / self.inc_h;
            h = (self.base_h + steps * self.inc_h).clamp(self.min_h, self.max_h);
        }

        if let Some((min_n, min_d)) = self.min_aspect {
            let lhs = w as i64 * min_d as i64;
            let rhs = h as i64 * min_n as i64;
            if lhs < rhs {
                h = ((w as i64 * min_d as i64) / min_n as i64) as i32;
            }
        }
        if let Some((max_n, max_d)) = self.max_aspect {
            let lhs = w as i64 * max_d as i64;
            let rhs = h as i64 * max_n as i64;
            if lhs > rhs {
                w = ((h as i64 * max_n as i64) / max_d as i64) as i32;
            }
        }

        (w.max(1), h.max(1))
    }
}

/// The subset of `_MOTIF_WM_HINTS` the core interprets: which
/// decorations/functions the client asked for.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MwmHints {
    pub functions: MwmFunc,
    pub decorations: MwmDecor,
}

impl Default for MwmHints {
    fn default() -> Self {
        Self {
            functions: MwmFunc::ALL,
            decorations: MwmDecor::ALL,
        }
    }
}

bitflags::bitflags! {
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MwmFunc: u32 {
        const ALL      = 0b0000_0001;
        const RESIZE   = 0b0000_0010;
        const MOVE     = 0b0000_0100;
        const MINIMIZE = 0b0000_1000;
        const MAXIMIZE = 0b0001_0000;
        const CLOSE    = 0b0010_0000;
    }
}

bitflags::bitflags! {
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MwmDecor: u32 {
        const ALL    = 0b0000_0001;
        const BORDER = 0b0000_0010;
        const TITLE  = 0b0001_0000;
    }
}

/// ICCCM `WM_PROTOCOLS` the client declared support for.
bitflags::bitflags! {
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Protocols: u8 {
        const DELETE       = 0b0001;
        const TAKE_FOCUS   = 0b0010;
        const PING         = 0b0100;
        const SYNC_REQUEST = 0b1000;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_raises_min_to_base_and_caps_increments() {
        let raw = RawSizeHints {
            min_size: Some((200, 10)),
            base_size: Some((50, 50)),
            resize_inc: Some((0, 0)),
            ..Default::default()
        };
        let hints = SizeHints::normalize(raw);
        // base (50) < requested min (200) on w, so min is lowered to base on
        // that axis but raised to it (10 -> 50) on h.
        assert_eq!(hints.min_w, 50);
        assert_eq!(hints.min_h, 10);
        assert_eq!(hints.inc_w, 1);
        assert_eq!(hints.inc_h, 1);
    }

    #[test]
    fn fixed_size_detection() {
        let mut hints = SizeHints::default();
        hints.min_w = 300;
        hints.max_w = 300;
        hints.min_h = 200;
        hints.max_h = 200;
        assert!(hints.is_fixed_size());
    }

    #[test]
    fn constrain_snaps_to_increment_grid() {
        let hints = SizeHints {
            base_w: 10,
            base_h: 10,
            inc_w: 8,
            inc_h: 8,
            min_w: 10,
            min_h: 10,
            max_w: 1000,
            max_h: 1000,
            ..SizeHints::default()
        };
        let (w, h) = hints.constrain(55, 55);
        assert_eq!((w - hints.base_w) % hints.inc_w, 0);
        assert_eq!((h - hints.base_h) % hints.inc_h, 0);
    }
}
