//! The window state engine (C5): per-window attributes, type/state/action
//! derivation, MWM hints, transient graph, struts, and reparenting.
//!
//! Grounded on the teacher's `pure::state::Client` (the fields a managed
//! window tracks) and `x::XConnExt::{manage, unmanage, hide, reveal}` for
//! the lifecycle shape; state/action/type derivation itself follows §3 and
//! §4.5 directly since the teacher (a tiling WM with no EWMH state machine)
//! has no equivalent.
pub mod hints;
pub mod struts;
pub mod sync;

pub use hints::{Gravity, MwmDecor, MwmFunc, MwmHints, Protocols, SizeHints};
pub use struts::Struts;
pub use sync::SyncState;

use crate::geometry::Rect;
use crate::object::ObjectId;
use crate::Xid;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The window's server-reported attributes as of the last
/// `GetWindowAttributes`/`CreateNotify` (§3 Window "Attributes").
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowAttributes {
    pub override_redirect: bool,
    pub mapped: bool,
    pub depth: u8,
    pub visual: Xid,
    pub colormap: Xid,
}

impl Default for WindowAttributes {
    fn default() -> Self {
        Self {
            override_redirect: false,
            mapped: false,
            depth: 24,
            visual: Xid(0),
            colormap: Xid(0),
        }
    }
}

/// EWMH window type, in the precedence order invariant I3 derives from
/// (`derive_type` returns the *last* matching arm, i.e. the most specific).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WindowType {
    Desktop,
    Dock,
    Toolbar,
    Menu,
    Utility,
    Splash,
    Dialog,
    Normal,
    Dropdown,
    Popup,
    Tooltip,
    Notification,
    Combo,
    Dnd,
    ModalDialog,
    Fullscreen,
    Unknown,
}

bitflags::bitflags! {
    /// `_NET_WM_STATE` bits (§3 Window "Derived state").
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StateFlags: u16 {
        const STICKY             = 1 << 0;
        const MAXIMIZED_H        = 1 << 1;
        const MAXIMIZED_V        = 1 << 2;
        const SHADED              = 1 << 3;
        const HIDDEN              = 1 << 4;
        const FULLSCREEN          = 1 << 5;
        const ABOVE               = 1 << 6;
        const BELOW               = 1 << 7;
        const MODAL                = 1 << 8;
        const DEMANDS_ATTENTION = 1 << 9;
        const SKIP_PAGER         = 1 << 10;
        const SKIP_TASKBAR       = 1 << 11;
        const MINIMIZED          = 1 << 12;
    }
}

bitflags::bitflags! {
    /// `_NET_WM_ALLOWED_ACTIONS` bits (§3 Window "Derived state").
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ActionFlags: u16 {
        const MOVE             = 1 << 0;
        const RESIZE           = 1 << 1;
        const STICK            = 1 << 2;
        const MINIMIZE         = 1 << 3;
        const MAXIMIZE_H       = 1 << 4;
        const MAXIMIZE_V       = 1 << 5;
        const FULLSCREEN       = 1 << 6;
        const CLOSE            = 1 << 7;
        const SHADE            = 1 << 8;
        const CHANGE_DESKTOP  = 1 << 9;
        const ABOVE            = 1 << 10;
        const BELOW            = 1 << 11;
    }
}

/// Everything `_NET_WM_ACTION_*` offers before a window's own type, MWM
/// hints, and fixed-size status narrow it (§4.5.1).
fn base_actions_for_type(wtype: WindowType) -> ActionFlags {
    use WindowType::*;
    match wtype {
        Desktop | Dock => ActionFlags::empty(),
        Splash => ActionFlags::CLOSE,
        Dropdown | Popup | Tooltip | Combo | Dnd => ActionFlags::empty(),
        Notification => ActionFlags::CLOSE,
        Menu | Toolbar | Utility => {
            ActionFlags::MOVE | ActionFlags::CLOSE | ActionFlags::CHANGE_DESKTOP
        }
        Dialog | ModalDialog => {
            ActionFlags::MOVE | ActionFlags::CLOSE | ActionFlags::CHANGE_DESKTOP
        }
        Normal | Fullscreen | Unknown => {
            ActionFlags::MOVE
                | ActionFlags::RESIZE
                | ActionFlags::STICK
                | ActionFlags::MINIMIZE
                | ActionFlags::MAXIMIZE_H
                | ActionFlags::MAXIMIZE_V
                | ActionFlags::FULLSCREEN
                | ActionFlags::CLOSE
                | ActionFlags::SHADE
                | ActionFlags::CHANGE_DESKTOP
                | ActionFlags::ABOVE
                | ActionFlags::BELOW
        }
    }
}

/// §3 invariant I3: derive `type` from `wmType`, transient-for, and a
/// handful of state bits, without needing the rest of the window.
pub fn derive_type(
    wm_type: Option<WindowType>,
    is_transient: bool,
    fullscreen: bool,
    modal: bool,
    below: bool,
    override_redirect: bool,
) -> WindowType {
    if override_redirect {
        return wm_type.unwrap_or(WindowType::Unknown);
    }
    if fullscreen && !below {
        return WindowType::Fullscreen;
    }
    if modal && is_transient {
        return WindowType::ModalDialog;
    }
    match wm_type {
        Some(t) => t,
        None if is_transient => WindowType::Dialog,
        None => WindowType::Normal,
    }
}

/// §4.5.1 action derivation: type-specific base, plus the shading/fixed-size
/// corrections, MWM masking, then a plugin narrowing pass.
pub fn derive_actions(
    wtype: WindowType,
    input_top_extent: u32,
    fixed_size: bool,
    mwm: MwmHints,
    plugin_set: ActionFlags,
    plugin_clear: ActionFlags,
) -> ActionFlags {
    let mut actions = base_actions_for_type(wtype);

    if input_top_extent > 0 {
        actions |= ActionFlags::SHADE;
    }
    actions |= ActionFlags::ABOVE | ActionFlags::BELOW;

    if fixed_size {
        actions &= !(ActionFlags::RESIZE
            | ActionFlags::MAXIMIZE_H
            | ActionFlags::MAXIMIZE_V
            | ActionFlags::FULLSCREEN);
    }

    if !mwm.functions.contains(MwmFunc::ALL) {
        if !mwm.functions.contains(MwmFunc::RESIZE) {
            actions.remove(ActionFlags::RESIZE);
        }
        if !mwm.functions.contains(MwmFunc::MOVE) {
            actions.remove(ActionFlags::MOVE);
        }
        if !mwm.functions.contains(MwmFunc::MINIMIZE) {
            actions.remove(ActionFlags::MINIMIZE);
        }
        if !mwm.functions.contains(MwmFunc::MAXIMIZE) {
            actions.remove(ActionFlags::MAXIMIZE_H);
            actions.remove(ActionFlags::MAXIMIZE_V);
        }
        if !mwm.functions.contains(MwmFunc::CLOSE) {
            actions.remove(ActionFlags::CLOSE);
        }
    }

    (actions | plugin_set) & !plugin_clear
}

/// The four strut-derived input/output margins a reparented window's frame
/// adds around the client (§3 Window "input extents, output extents").
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameExtents {
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
}

/// A triplet of geometries tracked through the configure pipeline: the
/// geometry this crate believes is current, the one last acknowledged by
/// the server, and (while `sync.waiting`) the one queued behind a sync
/// round-trip (§3 Window "Geometry").
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GeometryState {
    pub current: Rect,
    pub server: Rect,
    pub pending: Option<Rect>,
}

/// A fully managed window (§3 Window). Holds identity, geometry, derived
/// EWMH state, and the lifecycle flags the state engine mutates through
/// `changeState`/`hide`/`show`/`minimize`/`maximize`.
#[derive(Debug, Clone)]
pub struct Window {
    pub id: Xid,
    pub frame: Option<Xid>,
    pub wrapper: Option<Xid>,
    pub object: ObjectId,

    pub geometry: GeometryState,
    pub border_width: u32,
    pub attrs: WindowAttributes,

    pub wm_type: Option<WindowType>,
    pub derived_type: WindowType,
    pub state: StateFlags,
    pub actions: ActionFlags,
    pub mwm: MwmHints,
    pub protocols: Protocols,
    pub struts: Struts,

    pub transient_for: Option<Xid>,
    pub client_leader: Option<Xid>,
    pub group_leader: Option<Xid>,
    pub desktop: Option<u32>,
    pub size_hints: SizeHints,
    pub input_extents: FrameExtents,
    pub output_extents: FrameExtents,
    pub input_hint: bool,

    pub sync: Option<SyncState>,

    /// The geometry to restore to when `MAXIMIZED_H`/`MAXIMIZED_V` is
    /// cleared, captured the moment either bit is first set (§4.8
    /// "Configure pipeline"). `None` once fully unmaximized again.
    pub pre_maximize_geometry: Option<Rect>,

    pub managed: bool,
    pub placed: bool,
    pub minimized: bool,
    pub shaded: bool,
    pub in_show_desktop: bool,
    pub grabbed: bool,
    pub destroyed: bool,
    pub destroy_refcnt: u32,
    pub unmap_refcnt: u32,

    pub last_ping: u32,
    pub last_pong: u32,
    pub alive: bool,
}

impl Window {
    /// `addWindow(id, above)` steps 1-5, minus the X round trips (callers
    /// supply already-fetched attributes/hints; see [crate::dispatch] for
    /// the side-effecting version).
    pub fn new(id: Xid, object: ObjectId, attrs: WindowAttributes) -> Self {
        Self {
            id,
            frame: None,
            wrapper: None,
            object,
            geometry: GeometryState::default(),
            border_width: 0,
            attrs,
            wm_type: None,
            derived_type: WindowType::Normal,
            state: StateFlags::empty(),
            actions: ActionFlags::empty(),
            mwm: MwmHints::default(),
            protocols: Protocols::empty(),
            struts: Struts::default(),
            transient_for: None,
            client_leader: None,
            group_leader: None,
            desktop: None,
            size_hints: SizeHints::default(),
            input_extents: FrameExtents::default(),
            output_extents: FrameExtents::default(),
            input_hint: true,
            sync: None,
            pre_maximize_geometry: None,
            managed: false,
            placed: false,
            minimized: false,
            shaded: false,
            in_show_desktop: false,
            grabbed: false,
            destroyed: false,
            destroy_refcnt: 0,
            unmap_refcnt: 0,
            last_ping: 0,
            last_pong: 0,
            alive: true,
        }
    }

    fn is_transient(&self) -> bool {
        self.transient_for.is_some()
    }

    /// Re-derive `derived_type` and `actions` in the §4.5.1/§4.5.2 order:
    /// state feeds type feeds actions.
    pub fn recompute_derived(&mut self, plugin_set: ActionFlags, plugin_clear: ActionFlags) {
        self.derived_type = derive_type(
            self.wm_type,
            self.is_transient(),
            self.state.contains(StateFlags::FULLSCREEN),
            self.state.contains(StateFlags::MODAL),
            self.state.contains(StateFlags::BELOW),
            self.attrs.override_redirect,
        );

        self.actions = derive_actions(
            self.derived_type,
            self.input_extents.top,
            self.size_hints.is_fixed_size(),
            self.mwm,
            plugin_set,
            plugin_clear,
        );
    }

    /// `changeState(new)`: swap in `new`, recompute derived state, and
    /// report whether `hide()`/`show()` must follow (§4.5.2).
    pub fn change_state(&mut self, new: StateFlags) -> StateTransition {
        let old = self.state;
        self.state = new;
        self.recompute_derived(ActionFlags::empty(), ActionFlags::empty());

        let hide_bits = StateFlags::HIDDEN | StateFlags::SHADED | StateFlags::MINIMIZED;
        let was_hidden = !(old & hide_bits).is_empty();
        let now_hidden = !(new & hide_bits).is_empty();

        StateTransition {
            old,
            should_hide: !was_hidden && now_hidden,
            should_show: was_hidden && !now_hidden,
        }
    }

    /// `hide()`: set Hidden and request the unmap side effects the
    /// dispatcher must carry out (issuing `XUnmapWindow`, incrementing
    /// `unmap_refcnt`, re-routing focus, is the caller's job per §4.5.2).
    pub fn hide(&mut self) {
        self.state.insert(StateFlags::HIDDEN);
        self.unmap_refcnt += 1;
    }

    /// `show()`: the mirror of [Window::hide]. A Minimized window coming
    /// out of Shaded only maps the frame; content stays conceptually alive
    /// but unmapped, which callers implement by checking `minimized`
    /// before deciding whether to also map `id` itself.
    pub fn show(&mut self) {
        self.state.remove(StateFlags::HIDDEN);
    }

    /// `minimize()`: returns the set of windows (by id) that must also be
    /// minimized because they are direct or group transients of `self`
    /// (the caller supplies that set since the graph lives on [crate::
    /// screen::Screen]).
    pub fn minimize(&mut self) {
        self.minimized = true;
        self.state.insert(StateFlags::MINIMIZED);
        self.hide();
    }

    pub fn unminimize(&mut self) {
        self.minimized = false;
        self.state.remove(StateFlags::MINIMIZED);
        self.show();
    }

    /// `maximize(newMax)`: clamp the requested bits against `actions`,
    /// replace the two maximize state bits. Geometry re-application
    /// (`updateAttributes`) is the caller's job.
    pub fn maximize(&mut self, want_h: bool, want_v: bool) {
        let h = want_h && self.actions.contains(ActionFlags::MAXIMIZE_H);
        let v = want_v && self.actions.contains(ActionFlags::MAXIMIZE_V);

        self.state.set(StateFlags::MAXIMIZED_H, h);
        self.state.set(StateFlags::MAXIMIZED_V, v);
        self.recompute_derived(ActionFlags::empty(), ActionFlags::empty());
    }

    /// Whether this window currently occupies a position in the stacking
    /// list that a plugin's `modal`-reachability walk (I5) should traverse.
    pub fn is_modal(&self) -> bool {
        self.state.contains(StateFlags::MODAL)
    }
}

/// The result of a [Window::change_state] call: whether the dispatcher must
/// follow up with `hide()`/`show()` side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    pub old: StateFlags,
    pub should_hide: bool,
    pub should_show: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs() -> WindowAttributes {
        WindowAttributes::default()
    }

    #[test]
    fn derive_type_prefers_fullscreen_over_wm_type() {
        let t = derive_type(Some(WindowType::Normal), false, true, false, false, false);
        assert_eq!(t, WindowType::Fullscreen);
    }

    #[test]
    fn derive_type_fullscreen_below_yields_wm_type_not_fullscreen() {
        let t = derive_type(Some(WindowType::Normal), false, true, false, true, false);
        assert_eq!(t, WindowType::Normal);
    }

    #[test]
    fn derive_type_transient_without_wm_type_is_dialog() {
        let t = derive_type(None, true, false, false, false, false);
        assert_eq!(t, WindowType::Dialog);
    }

    #[test]
    fn fixed_size_window_loses_resize_and_maximize_actions() {
        let actions = derive_actions(
            WindowType::Normal,
            0,
            true,
            MwmHints::default(),
            ActionFlags::empty(),
            ActionFlags::empty(),
        );
        assert!(!actions.contains(ActionFlags::RESIZE));
        assert!(!actions.contains(ActionFlags::MAXIMIZE_H));
        assert!(!actions.contains(ActionFlags::FULLSCREEN));
        assert!(actions.contains(ActionFlags::MOVE));
    }

    #[test]
    fn mwm_function_mask_strips_matching_actions() {
        let mwm = MwmHints {
            functions: MwmFunc::RESIZE, // ALL bit clear -> masked individually
            decorations: MwmDecor::ALL,
        };
        let actions = derive_actions(
            WindowType::Normal,
            0,
            false,
            mwm,
            ActionFlags::empty(),
            ActionFlags::empty(),
        );
        assert!(actions.contains(ActionFlags::RESIZE));
        assert!(!actions.contains(ActionFlags::MOVE));
        assert!(!actions.contains(ActionFlags::CLOSE));
    }

    #[test]
    fn change_state_reports_hide_and_show_transitions() {
        let mut w = Window::new(Xid(1), ObjectId_stub(), attrs());
        let t = w.change_state(StateFlags::HIDDEN);
        assert!(t.should_hide);
        assert!(!t.should_show);

        let t2 = w.change_state(StateFlags::empty());
        assert!(t2.should_show);
    }

    #[test]
    fn maximize_is_clamped_by_actions() {
        let mut w = Window::new(Xid(1), ObjectId_stub(), attrs());
        w.actions = ActionFlags::MAXIMIZE_H; // vertical not allowed
        w.maximize(true, true);
        assert!(w.state.contains(StateFlags::MAXIMIZED_H));
        assert!(!w.state.contains(StateFlags::MAXIMIZED_V));
    }

    // Test-only helper: a throwaway ObjectId via a scratch tree, since
    // ObjectId has no public constructor (generational ids are only ever
    // handed out by ObjectTree).
    #[allow(non_snake_case)]
    fn ObjectId_stub() -> ObjectId {
        crate::object::ObjectTree::new().root()
    }
}
