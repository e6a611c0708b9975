//! Stacking & geometry (C8): layer compatibility, restack, the configure
//! pipeline, and transient promotion.
//!
//! Grounded on the teacher's `pure::stack_set`/`x::XConnExt::refresh`
//! layout-then-apply shape; layer/transient semantics follow §4.8 directly
//! since the teacher is a tiling WM with no EWMH layer model.
use crate::geometry::Rect;
use crate::screen::StackingList;
use crate::window::{ActionFlags, Window, WindowType};
use crate::Xid;
use std::collections::HashMap;

/// The coarse stacking class §4.8 defines for layer decisions.
/// `FullscreenWithBelow` is demoted to `Normal` before classification, so
/// it never appears here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StackClass {
    Desktop,
    Normal,
    Dock,
    Fullscreen,
}

/// §4.8: classify a window for stacking purposes. A `Fullscreen` window
/// with the `Below` state bit set is demoted to `Normal`.
pub fn stack_class(w: &Window) -> StackClass {
    match w.derived_type {
        WindowType::Desktop => StackClass::Desktop,
        WindowType::Dock => StackClass::Dock,
        WindowType::Fullscreen if w.state.contains(crate::window::StateFlags::BELOW) => {
            StackClass::Normal
        }
        WindowType::Fullscreen => StackClass::Fullscreen,
        _ => StackClass::Normal,
    }
}

/// §4.8.1 `stackLayerCheck(w, below)`: true if `w` may sit above `below`.
pub fn stack_layer_check(
    w: Xid,
    below: Xid,
    ancestors: impl Fn(Xid) -> Vec<Xid>,
    group_leader: impl Fn(Xid) -> Option<Xid>,
    above_bit: impl Fn(Xid) -> bool,
    below_bit: impl Fn(Xid) -> bool,
) -> bool {
    if ancestors(w).contains(&below) {
        return true;
    }
    if ancestors(below).contains(&w) {
        return false;
    }
    if let (Some(a), Some(b)) = (group_leader(w), group_leader(below)) {
        if a == b {
            // group-transients to the same leader never invert relative
            // order once established; treat as already-correct (false ==
            // "no, do not move w above below").
            return false;
        }
    }
    if above_bit(w) && !above_bit(below) {
        return true;
    }
    if below_bit(w) && !below_bit(below) {
        return false;
    }
    // unmarked vs unmarked: no opinion, caller keeps current relative order.
    above_bit(w) == above_bit(below)
}

/// `findSiblingBelow`/`findLowestSiblingBelow` direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Walk top to bottom looking for where `w` should sit (raise).
    Top,
    /// Walk bottom to top (lower).
    Bottom,
}

/// Find the window `w` should be restacked directly below/above, scanning
/// the stacking list in `direction`. `class_of`/`layer_ok` let callers
/// plug in their own window lookups without this module depending on
/// [crate::screen::Screen]'s concrete storage.
pub fn find_sibling(
    list: &StackingList,
    w: Xid,
    class_of: impl Fn(Xid) -> StackClass,
    layer_ok: impl Fn(Xid, Xid) -> bool,
    direction: Direction,
) -> Option<Xid> {
    let w_class = class_of(w);
    let order: Vec<Xid> = match direction {
        Direction::Top => list.iter_top_to_bottom().collect(),
        Direction::Bottom => list.iter_bottom_to_top().collect(),
    };

    for candidate in order {
        if candidate == w {
            continue;
        }
        let c_class = class_of(candidate);

        let always_above_desktop = c_class == StackClass::Desktop;
        let same_class_ok = c_class == w_class && layer_ok(w, candidate);
        let higher_class = c_class < w_class;

        if always_above_desktop || same_class_ok || higher_class {
            return Some(candidate);
        }
    }
    None
}

/// §4.8 "Configure pipeline" steps 2-6, minus the X round trip: given a
/// requested geometry, the window's current state, and the work-area,
/// produce the geometry that should actually be committed.
pub fn compose_configure(
    w: &Window,
    requested: Rect,
    fullscreen_output: Rect,
    workarea: Rect,
    ignore_hints_when_maximized: bool,
) -> Rect {
    if w.state.contains(crate::window::StateFlags::FULLSCREEN) {
        return fullscreen_output;
    }

    let maximized_h = w.state.contains(crate::window::StateFlags::MAXIMIZED_H);
    let maximized_v = w.state.contains(crate::window::StateFlags::MAXIMIZED_V);

    let mut x = requested.x;
    let mut y = requested.y;
    let mut width = requested.w;
    let mut height = requested.h;

    if maximized_h {
        x = workarea.x;
        width = workarea.w;
    }
    if maximized_v {
        y = workarea.y;
        height = workarea.h;
    }

    if !ignore_hints_when_maximized || (!maximized_h && !maximized_v) {
        let (cw, ch) = w.size_hints.constrain(width as i32, height as i32);
        width = cw as u32;
        height = ch as u32;
    }

    // Clamp reachability into the workarea for everything except
    // Dock/Fullscreen/Unknown, which may legitimately sit outside it.
    let exempt = matches!(
        w.derived_type,
        WindowType::Dock | WindowType::Fullscreen | WindowType::Unknown
    );
    let mut r = Rect::new(x, y, width, height);
    if !exempt {
        r = r.clamped_within(&workarea);
    }
    r
}

/// Transient promotion: every transient descendant of `w` (direct
/// `transient_for == w.id`, or group-transient to `w`'s group) must end up
/// above `w` in the stacking list after a restack (§4.8 "Transient
/// promotion during stack").
pub fn promote_transients(
    list: &mut StackingList,
    w: Xid,
    transient_children: &HashMap<Xid, Vec<Xid>>,
) {
    if let Some(children) = transient_children.get(&w) {
        for &child in children {
            list.restack_below(child, None);
            promote_transients(list, child, transient_children);
        }
    }
}

/// §4.8 "Docks track fullscreen windows": raising a normal window above a
/// fullscreen window also raises every dock that was previously above that
/// fullscreen window, preserving I6.
pub fn raise_docks_above(
    list: &mut StackingList,
    fullscreen: Xid,
    is_dock: impl Fn(Xid) -> bool,
) {
    let docks_above: Vec<Xid> = list
        .iter_bottom_to_top()
        .skip_while(|&id| id != fullscreen)
        .skip(1)
        .filter(|&id| is_dock(id))
        .collect();

    for dock in docks_above {
        list.restack_below(dock, None);
    }
}

/// Check whether `desired_allowed` actions (e.g. from a plugin's
/// `validateWindowResizeRequest`) narrow what §4.8 step 3 lets through,
/// returning the action-gated subset of CW bits that may proceed.
pub fn gate_by_actions(requested_resize: bool, requested_move: bool, actions: ActionFlags) -> (bool, bool) {
    (
        requested_resize && actions.contains(ActionFlags::RESIZE),
        requested_move && actions.contains(ActionFlags::MOVE),
    )
}

/// Recompute the whole screen's active-window stacking list against a set
/// of known stacking classes, used by property-based tests for P2 (layer
/// ordering: Desktop < Normal < Dock < Fullscreen).
pub fn layers_in_order(list: &StackingList, class_of: impl Fn(Xid) -> StackClass) -> bool {
    let mut last: Option<StackClass> = None;
    for id in list.iter_bottom_to_top() {
        let class = class_of(id);
        if let Some(prev) = last {
            if class < prev {
                return false;
            }
        }
        last = Some(class);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectTree;
    use crate::window::WindowAttributes;

    fn window_of_type(id: Xid, wtype: WindowType) -> Window {
        let object = ObjectTree::new().root();
        let mut w = Window::new(id, object, WindowAttributes::default());
        w.derived_type = wtype;
        w
    }

    #[test]
    fn stack_class_demotes_fullscreen_with_below() {
        let mut w = window_of_type(Xid(1), WindowType::Fullscreen);
        assert_eq!(stack_class(&w), StackClass::Fullscreen);
        w.state.insert(crate::window::StateFlags::BELOW);
        assert_eq!(stack_class(&w), StackClass::Normal);
    }

    #[test]
    fn find_sibling_always_sits_above_desktop() {
        let mut list = StackingList::new();
        list.push_top(Xid(1)); // desktop
        list.push_top(Xid(2)); // normal

        let classes: HashMap<Xid, StackClass> =
            HashMap::from([(Xid(1), StackClass::Desktop), (Xid(2), StackClass::Normal)]);

        let sib = find_sibling(
            &list,
            Xid(3),
            |id| classes[&id],
            |_, _| true,
            Direction::Top,
        );
        assert_eq!(sib, Some(Xid(2)));
    }

    #[test]
    fn layers_in_order_detects_violation() {
        let mut list = StackingList::new();
        list.push_top(Xid(1)); // normal
        list.push_top(Xid(2)); // desktop -- out of order, should be below normal

        let classes: HashMap<Xid, StackClass> =
            HashMap::from([(Xid(1), StackClass::Normal), (Xid(2), StackClass::Desktop)]);
        assert!(!layers_in_order(&list, |id| classes[&id]));
    }

    #[test]
    fn compose_configure_fullscreen_fills_output() {
        let w = window_of_type(Xid(1), WindowType::Fullscreen);
        let out = Rect::new(0, 0, 1920, 1080);
        let workarea = Rect::new(0, 24, 1920, 1056);
        let r = compose_configure(&w, Rect::new(10, 10, 200, 200), out, workarea, false);
        assert_eq!(r, out);
    }

    #[test]
    fn compose_configure_maximized_uses_workarea_bounds() {
        let mut w = window_of_type(Xid(1), WindowType::Normal);
        w.state.insert(crate::window::StateFlags::MAXIMIZED_H);
        w.state.insert(crate::window::StateFlags::MAXIMIZED_V);
        w.size_hints = crate::window::SizeHints::default();

        let out = Rect::new(0, 0, 1920, 1080);
        let workarea = Rect::new(0, 24, 1920, 1056);
        let r = compose_configure(&w, Rect::new(10, 10, 200, 200), out, workarea, false);
        assert_eq!(r.x, workarea.x);
        assert_eq!(r.y, workarea.y);
        assert_eq!(r.w, workarea.w);
        assert_eq!(r.h, workarea.h);
    }
}
