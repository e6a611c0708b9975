//! Strut parsing and work-area derivation (§4.5.3, invariant I4).
use crate::geometry::{Rect, Region};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Opposing struts are capped so at least this many pixels of the output
/// stay usable, matching the original's `MIN_EMPTY` constant.
pub const MIN_EMPTY: i32 = 76;

/// A window's reserved screen-edge space, one rectangle per side, already
/// clipped to the outputs it partially intersects.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Struts {
    pub left: Option<Rect>,
    pub right: Option<Rect>,
    pub top: Option<Rect>,
    pub bottom: Option<Rect>,
}

/// Raw `_NET_WM_STRUT_PARTIAL` fields (left, right, top, bottom widths plus
/// each edge's start/end extent) or the 4-field `_NET_WM_STRUT` fallback
/// (widths only, spanning the whole edge).
#[derive(Debug, Clone, Copy, Default)]
pub struct RawStrut {
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
    pub left_start_y: u32,
    pub left_end_y: u32,
    pub right_start_y: u32,
    pub right_end_y: u32,
    pub top_start_x: u32,
    pub top_end_x: u32,
    pub bottom_start_x: u32,
    pub bottom_end_x: u32,
}

impl RawStrut {
    /// Build from the legacy 4-field `_NET_WM_STRUT`, which has no
    /// start/end pair and so spans the full edge of `screen`.
    pub fn from_legacy(left: u32, right: u32, top: u32, bottom: u32, screen: Rect) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
            left_start_y: screen.y as u32,
            left_end_y: (screen.y + screen.h as i32) as u32,
            right_start_y: screen.y as u32,
            right_end_y: (screen.y + screen.h as i32) as u32,
            top_start_x: screen.x as u32,
            top_end_x: (screen.x + screen.w as i32) as u32,
            bottom_start_x: screen.x as u32,
            bottom_end_x: (screen.x + screen.w as i32) as u32,
        }
    }
}

/// Cap a pair of opposing struts (e.g. left + right) so they never eat
/// into more than `screen_extent - MIN_EMPTY` pixels combined.
fn cap_pair(a: u32, b: u32, screen_extent: i32) -> (u32, u32) {
    let budget = (screen_extent - MIN_EMPTY).max(0) as u32;
    if a + b <= budget {
        (a, b)
    } else if budget == 0 {
        (0, 0)
    } else {
        // Scale both down proportionally so neither strut is favoured.
        let total = (a + b).max(1);
        (
            ((a as u64 * budget as u64) / total as u64) as u32,
            ((b as u64 * budget as u64) / total as u64) as u32,
        )
    }
}

impl Struts {
    /// `updateStruts()`: compute the four clipped rectangles for a window
    /// whose raw strut fields are `raw`, given the screen's bounding
    /// rectangle (for capping) and its Xinerama outputs (for clipping).
    pub fn compute(raw: RawStrut, screen: Rect, outputs: &[Rect]) -> Self {
        let (left, right) = cap_pair(raw.left, raw.right, screen.w as i32);
        let (top, bottom) = cap_pair(raw.top, raw.bottom, screen.h as i32);

        let left = (left > 0).then(|| {
            clip_to_outputs(
                Rect::new(screen.x, raw.left_start_y as i32, left, raw.left_end_y - raw.left_start_y),
                outputs,
            )
        });
        let right = (right > 0).then(|| {
            clip_to_outputs(
                Rect::new(
                    screen.x + screen.w as i32 - right as i32,
                    raw.right_start_y as i32,
                    right,
                    raw.right_end_y - raw.right_start_y,
                ),
                outputs,
            )
        });
        let top = (top > 0).then(|| {
            clip_to_outputs(
                Rect::new(raw.top_start_x as i32, screen.y, raw.top_end_x - raw.top_start_x, top),
                outputs,
            )
        });
        let bottom = (bottom > 0).then(|| {
            clip_to_outputs(
                Rect::new(
                    raw.bottom_start_x as i32,
                    screen.y + screen.h as i32 - bottom as i32,
                    raw.bottom_end_x - raw.bottom_start_x,
                    bottom,
                ),
                outputs,
            )
        });

        Self {
            left,
            right,
            top,
            bottom,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_none() && self.right.is_none() && self.top.is_none() && self.bottom.is_none()
    }

    fn rects(&self) -> impl Iterator<Item = Rect> {
        [self.left, self.right, self.top, self.bottom].into_iter().flatten()
    }
}

/// Snap `r`'s edges to the bounds of every output it partially intersects,
/// per §4.5.3 ("clips each rectangle to every Xinerama output it partially
/// intersects, snapping its edge to the output edge").
fn clip_to_outputs(r: Rect, outputs: &[Rect]) -> Rect {
    for output in outputs {
        if r.intersects(output) {
            return r.intersection(output).unwrap_or(r);
        }
    }
    r
}

/// I4: the screen's usable work-area is the per-output geometry minus
/// every visible window's struts clipped to that output.
pub fn work_area(outputs: &[Rect], struts: impl Iterator<Item = Struts>) -> Region {
    let mut region = Region::empty();
    for output in outputs {
        region.union(&Region::single(*output));
    }
    for s in struts {
        for r in s.rects() {
            region = region.subtract(&Region::single(r));
        }
    }
    region
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposing_struts_are_capped_to_leave_min_empty() {
        let screen = Rect::new(0, 0, 200, 100);
        let raw = RawStrut::from_legacy(150, 150, 0, 0, screen);
        let struts = Struts::compute(raw, screen, &[screen]);
        let l = struts.left.unwrap().w;
        let r = struts.right.unwrap().w;
        assert!(l + r <= (200 - MIN_EMPTY) as u32);
    }

    #[test]
    fn work_area_excludes_strut_rects() {
        let screen = Rect::new(0, 0, 800, 600);
        let raw = RawStrut::from_legacy(0, 0, 40, 0, screen);
        let struts = Struts::compute(raw, screen, &[screen]);
        let area = work_area(&[screen], std::iter::once(struts));
        assert!(!area.contains_point(crate::geometry::Point::new(10, 5)));
        assert!(area.contains_point(crate::geometry::Point::new(10, 500)));
    }
}
