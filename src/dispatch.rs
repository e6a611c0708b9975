//! The X event dispatcher (C6): a single function table translating every
//! handled event into state-engine operations (§4.6).
//!
//! Grounded on the teacher's `core::handle_xevent` (one free function per
//! `XEvent` variant, all taking `&mut State<X>, &Config<X>, &X`) — this
//! module keeps that shape, generalised to compiz's much larger event
//! surface and plugin hook points.
use crate::display::Display;
use crate::focus;
use crate::object::ObjectId;
use crate::screen::Screen;
use crate::window::{ActionFlags, Protocols, StateFlags, Window, WindowType};
use crate::x::atom::Atom;
use crate::x::event::{ClientMessage, ConfigureMask, ConfigureRequestEvent, StateAction, XEvent};
use crate::x::{read_strings, ClientConfig, Prop, WmState, XConn};
use crate::{Result, Xid};
use std::collections::HashMap;
use tracing::{debug, info, trace, warn};

/// Everything the dispatcher mutates: the bootstrapped [Display] (which
/// owns its [Screen]s) plus the flat window table. Kept separate from
/// [crate::object::ObjectSubstrate] so this module can be exercised without
/// constructing a full object tree in every test.
#[derive(Debug)]
pub struct State {
    pub display: Display,
    pub windows: HashMap<Xid, Window>,
    /// Which window a given sync alarm id belongs to.
    pub alarms: HashMap<Xid, Xid>,
}

impl State {
    pub fn screen_mut(&mut self, n: usize) -> Option<&mut Screen> {
        self.display.screens.get_mut(n)
    }

    fn screen_of(&self, id: Xid) -> Option<usize> {
        self.display
            .screens
            .iter()
            .position(|s| s.stacking.position(id).is_some() || s.root == id)
    }
}

/// The window actually targeted by map/unmap/focus requests: the frame if
/// one has been created, the client window itself otherwise.
fn target_window(w: &Window) -> Xid {
    w.frame.unwrap_or(w.id)
}

/// Top level entry point mirrored one-to-one on [XEvent]'s variants.
pub fn handle_event<X: XConn>(state: &mut State, x: &X, event: XEvent) -> Result<()> {
    trace!(%event, "dispatching event");
    match event {
        XEvent::MapRequest(id) => handle_map_request(state, x, id),
        XEvent::UnmapNotify { id, synthetic } => handle_unmap_notify(state, x, id, synthetic),
        XEvent::DestroyNotify(id) => handle_destroy_notify(state, x, id),
        XEvent::ConfigureRequest(req) => handle_configure_request(state, x, req),
        XEvent::PropertyNotify(p) => handle_property_notify(state, x, p.id, &p.atom),
        XEvent::ClientMessage(msg) => handle_client_message(state, x, msg),
        XEvent::XkbStateNotify { mod_state, time } => {
            state.display.on_xkb_state_notify(mod_state, time);
            Ok(())
        }
        XEvent::SyncAlarmNotify { alarm, value } => handle_sync_alarm(state, x, alarm, value),
        XEvent::Enter(p) => {
            debug!(id = %p.id, "pointer entered window");
            Ok(())
        }
        _ => Ok(()),
    }
}

/// `MapRequest` (§4.6): unminimise, leave show-desktop, map, then focus iff
/// allowed. Placement and stacking-mode selection happen before this point
/// (the window must already carry a placed geometry by the time it maps).
fn handle_map_request<X: XConn>(state: &mut State, x: &X, id: Xid) -> Result<()> {
    let Some(w) = state.windows.get_mut(&id) else {
        warn!(%id, "MapRequest for unmanaged window");
        return Ok(());
    };

    w.unminimize();
    w.in_show_desktop = false;

    x.map(target_window(w))?;
    x.set_wm_state(id, WmState::Normal)?;

    let allowed = focus::allow_window_focus(w);
    info!(%id, allowed, "window mapped");

    if allowed {
        move_input_focus_to(state, x, id)?;
    }
    Ok(())
}

/// `UnmapNotify`: decrement the refcount the WM itself incremented via
/// `hide()`; a real (non-synthetic) unmap the WM did not request means the
/// client withdrew itself.
fn handle_unmap_notify<X: XConn>(state: &mut State, x: &X, id: Xid, synthetic: bool) -> Result<()> {
    let Some(w) = state.windows.get_mut(&id) else {
        return Ok(());
    };

    if !synthetic && w.unmap_refcnt > 0 {
        w.unmap_refcnt = w.unmap_refcnt.saturating_sub(1);
        return Ok(());
    }

    // A real, un-requested unmap (or a synthetic one per ICCCM 4.1.4) is a
    // client withdrawal: the window stops being managed outright, the same
    // teardown `handle_destroy_notify` performs for a destroyed window,
    // minus destroying the frame (the client's window is still alive, just
    // unmapped).
    debug!(%id, "window withdrawn");
    x.set_wm_state(id, WmState::Withdrawn)?;
    let mut refocus = None;
    if let Some(n) = state.screen_of(id) {
        if let Some(screen) = state.screen_mut(n) {
            screen.stacking.remove(id);
            screen.active_history.remove(id);
            if screen.active_window == Some(id) {
                let fallback = screen.active_history.most_recent();
                screen.set_active(fallback);
                refocus = fallback;
            }
        }
    }
    state.windows.remove(&id);
    if let Some(next) = refocus {
        move_input_focus_to(state, x, next)?;
    }
    Ok(())
}

fn handle_destroy_notify<X: XConn>(state: &mut State, x: &X, id: Xid) -> Result<()> {
    let Some(w) = state.windows.remove(&id) else {
        return Ok(());
    };

    let mut refocus = None;
    if let Some(n) = state.screen_of(id) {
        if let Some(screen) = state.screen_mut(n) {
            screen.stacking.remove(id);
            screen.active_history.remove(id);
            if screen.active_window == Some(id) {
                let fallback = screen.active_history.most_recent();
                screen.set_active(fallback);
                refocus = fallback;
            }
        }
    }
    if let Some(next) = refocus {
        move_input_focus_to(state, x, next)?;
    }

    if let Some(frame) = w.frame {
        x.destroy(frame)?;
    }
    Ok(())
}

/// `ConfigureRequest` (§4.6): if a sync round trip is outstanding, just
/// stash the geometry; otherwise resize and restack per the requested
/// sibling.
fn handle_configure_request<X: XConn>(
    state: &mut State,
    x: &X,
    req: ConfigureRequestEvent,
) -> Result<()> {
    let Some(w) = state.windows.get_mut(&req.id) else {
        return Ok(());
    };

    if let Some(sync) = w.sync.as_mut() {
        if sync.waiting {
            sync.pending_geometry = Some(req.r);
            return Ok(());
        }
    }

    // §4.5.5/§4.6 step 7: a size change on a window that declared
    // `_NET_WM_SYNC_REQUEST` is held behind a sync round trip rather than
    // applied immediately; the alarm firing (or the watchdog) is what
    // actually commits it (see `handle_sync_alarm`).
    let resizing = req.r.w != w.geometry.current.w || req.r.h != w.geometry.current.h;
    if resizing && w.protocols.contains(Protocols::SYNC_REQUEST) && w.sync.is_some() {
        let sync = w.sync.as_mut().expect("checked is_some above");
        let value = sync.begin_resize(req.r);
        x.send_client_message(ClientMessage::NetWmSyncRequest { id: req.id, value })?;
        return Ok(());
    }

    w.geometry.current = req.r;
    x.configure_window(
        req.id,
        ClientConfig {
            mask: req.mask,
            r: req.r,
            border_width: req.border_width,
            sibling: req.sibling,
            stack_mode: req.stack_mode,
        },
    )?;

    if let Some(n) = state.screen_of(req.id) {
        if let Some(screen) = state.screen_mut(n) {
            screen.stacking.restack_below(req.id, req.sibling);
        }
    }
    Ok(())
}

/// `PropertyNotify` on tracked atoms: re-derive affected fields. The actual
/// re-fetch of the new property value (an X round trip) is left to the
/// caller's [XConn] implementation; this only reacts to the notification.
fn handle_property_notify<X: XConn>(state: &mut State, _x: &X, id: Xid, atom: &str) -> Result<()> {
    if atom == Atom::NetWmStrut.as_ref() || atom == Atom::NetWmStrutPartial.as_ref() {
        if let Some(n) = state.screen_of(id) {
            if let Some(screen) = state.screen_mut(n) {
                let out = screen.outputs.first().copied().unwrap_or_default();
                screen.damage_rect(out);
            }
        }
        return Ok(());
    }

    let Some(w) = state.windows.get_mut(&id) else {
        return Ok(());
    };

    if atom == Atom::WmNormalHints.as_ref() || atom == Atom::NetWmWindowType.as_ref() {
        w.recompute_derived(ActionFlags::empty(), ActionFlags::empty());
    }
    Ok(())
}

/// `ClientMessage` (§4.6): one arm per decoded protocol.
fn handle_client_message<X: XConn>(state: &mut State, x: &X, msg: ClientMessage) -> Result<()> {
    match msg {
        ClientMessage::NetWmState {
            id,
            action,
            first,
            second,
        } => handle_net_wm_state(state, x, id, action, &first, second.as_deref()),
        ClientMessage::NetActiveWindow {
            id,
            source_is_application,
            timestamp,
        } => handle_net_active_window(state, x, id, source_is_application, timestamp),
        ClientMessage::NetWmMoveresize { id, .. } => {
            debug!(%id, "move/resize grab requested (delegated to plugin)");
            Ok(())
        }
        ClientMessage::NetCloseWindow { id, .. } => {
            if let Some(w) = state.windows.get(&id) {
                if w.protocols.contains(crate::window::Protocols::DELETE) {
                    x.send_client_message(ClientMessage::Other {
                        id,
                        dtype: "WM_PROTOCOLS".to_string(),
                        data: [0, 0, 0, 0, 0],
                    })?;
                } else {
                    x.destroy(id)?;
                }
            }
            Ok(())
        }
        ClientMessage::WmProtocolsPing { id, timestamp } => {
            if let Some(w) = state.windows.get_mut(&id) {
                w.last_pong = timestamp;
                w.alive = true;
            }
            Ok(())
        }
        ClientMessage::NetWmSyncRequest { id, value: _ } => {
            if let Some(w) = state.windows.get_mut(&id) {
                if let Some(sync) = w.sync.as_mut() {
                    if let Some(r) = sync.commit() {
                        w.geometry.current = r;
                    }
                }
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// The reverse of [state_to_atom_names]: map one `_NET_WM_STATE_*` wire
/// name back to its bit, or `None` for anything not in the enumerable set.
fn state_bit_for_atom(atom: &str) -> Option<StateFlags> {
    if atom == Atom::NetWmStateModal.as_ref() {
        Some(StateFlags::MODAL)
    } else if atom == Atom::NetWmStateSticky.as_ref() {
        Some(StateFlags::STICKY)
    } else if atom == Atom::NetWmStateMaximizedHorz.as_ref() {
        Some(StateFlags::MAXIMIZED_H)
    } else if atom == Atom::NetWmStateMaximizedVert.as_ref() {
        Some(StateFlags::MAXIMIZED_V)
    } else if atom == Atom::NetWmStateShaded.as_ref() {
        Some(StateFlags::SHADED)
    } else if atom == Atom::NetWmStateSkipTaskbar.as_ref() {
        Some(StateFlags::SKIP_TASKBAR)
    } else if atom == Atom::NetWmStateSkipPager.as_ref() {
        Some(StateFlags::SKIP_PAGER)
    } else if atom == Atom::NetWmStateHidden.as_ref() {
        Some(StateFlags::HIDDEN)
    } else if atom == Atom::NetWmStateFullscreen.as_ref() {
        Some(StateFlags::FULLSCREEN)
    } else if atom == Atom::NetWmStateAbove.as_ref() {
        Some(StateFlags::ABOVE)
    } else if atom == Atom::NetWmStateBelow.as_ref() {
        Some(StateFlags::BELOW)
    } else if atom == Atom::NetWmStateDemandsAttention.as_ref() {
        Some(StateFlags::DEMANDS_ATTENTION)
    } else {
        None
    }
}

/// One `_NET_WM_WINDOW_TYPE_*` wire name back to its [WindowType].
fn window_type_for_atom(atom: &str) -> Option<WindowType> {
    if atom == Atom::NetWmWindowTypeDesktop.as_ref() {
        Some(WindowType::Desktop)
    } else if atom == Atom::NetWmWindowTypeDock.as_ref() {
        Some(WindowType::Dock)
    } else if atom == Atom::NetWmWindowTypeToolbar.as_ref() {
        Some(WindowType::Toolbar)
    } else if atom == Atom::NetWmWindowTypeMenu.as_ref() {
        Some(WindowType::Menu)
    } else if atom == Atom::NetWmWindowTypeUtility.as_ref() {
        Some(WindowType::Utility)
    } else if atom == Atom::NetWmWindowTypeSplash.as_ref() {
        Some(WindowType::Splash)
    } else if atom == Atom::NetWmWindowTypeDialog.as_ref() {
        Some(WindowType::Dialog)
    } else if atom == Atom::NetWmWindowTypeNormal.as_ref() {
        Some(WindowType::Normal)
    } else if atom == Atom::NetWmWindowTypeDropdownMenu.as_ref() {
        Some(WindowType::Dropdown)
    } else if atom == Atom::NetWmWindowTypePopupMenu.as_ref() {
        Some(WindowType::Popup)
    } else if atom == Atom::NetWmWindowTypeTooltip.as_ref() {
        Some(WindowType::Tooltip)
    } else if atom == Atom::NetWmWindowTypeNotification.as_ref() {
        Some(WindowType::Notification)
    } else if atom == Atom::NetWmWindowTypeCombo.as_ref() {
        Some(WindowType::Combo)
    } else if atom == Atom::NetWmWindowTypeDnd.as_ref() {
        Some(WindowType::Dnd)
    } else {
        None
    }
}

/// One `WM_PROTOCOLS` wire name back to its [Protocols] bit.
fn protocol_for_atom(atom: &str) -> Option<Protocols> {
    if atom == Atom::WmDeleteWindow.as_ref() {
        Some(Protocols::DELETE)
    } else if atom == Atom::WmTakeFocus.as_ref() {
        Some(Protocols::TAKE_FOCUS)
    } else if atom == Atom::NetWmPing.as_ref() {
        Some(Protocols::PING)
    } else if atom == Atom::NetWmSyncRequest.as_ref() {
        Some(Protocols::SYNC_REQUEST)
    } else {
        None
    }
}

/// `addWindow(id, above)` (§4.5 steps 1-6): the side-effecting counterpart
/// [Window::new] defers to this module for. Fetches attributes, geometry,
/// and the handful of ICCCM/EWMH properties that matter at adoption time,
/// derives `type`/`actions`, and stacks the window topmost on screen 0.
/// The caller supplies `object` (the tree entry a bootstrap layer has
/// already inserted for this window) since this module stays decoupled
/// from [crate::object::ObjectSubstrate] (see [State]'s doc comment).
///
/// A no-op if `id` is already managed.
pub fn manage_window<X: XConn>(state: &mut State, x: &X, id: Xid, object: ObjectId) -> Result<()> {
    if state.windows.contains_key(&id) {
        return Ok(());
    }

    let attrs = x.get_window_attributes(id)?;
    let r = x.get_geometry(id)?;

    let mut w = Window::new(id, object, attrs);
    w.geometry.current = r;
    w.geometry.server = r;

    if let Some(prop) = x.get_property(id, Atom::NetWmWindowType.as_ref())? {
        w.wm_type = read_strings(&prop).iter().find_map(|n| window_type_for_atom(n));
    }

    if let Some(prop) = x.get_property(id, Atom::WmProtocols.as_ref())? {
        for name in read_strings(&prop) {
            if let Some(p) = protocol_for_atom(&name) {
                w.protocols.insert(p);
            }
        }
    }

    if let Some(prop) = x.get_property(id, Atom::NetWmState.as_ref())? {
        for name in read_strings(&prop) {
            if let Some(bit) = state_bit_for_atom(&name) {
                w.state.insert(bit);
            }
        }
    }

    if let Some(Prop::Cardinal(raw)) = x.get_property(id, Atom::WmTransientFor.as_ref())? {
        if raw != 0 {
            w.transient_for = Some(Xid(raw));
        }
    }

    if let Some(Prop::Cardinal(raw)) = x.get_property(id, Atom::WmClientLeader.as_ref())? {
        w.client_leader = Some(Xid(raw));
    }

    if let Some(Prop::Cardinal(raw)) = x.get_property(id, Atom::NetWmDesktop.as_ref())? {
        w.desktop = Some(raw);
    }

    w.recompute_derived(ActionFlags::empty(), ActionFlags::empty());
    w.managed = true;

    info!(%id, wtype = ?w.derived_type, "window managed");

    if let Some(screen) = state.screen_mut(0) {
        screen.stacking.push_top(id);
    }

    // A window already viewable at adoption time must see the same
    // MapRequest transition a freshly-mapped one does (§4.5 step 6).
    let viewable = w.attrs.mapped;
    state.windows.insert(id, w);
    if viewable {
        handle_map_request(state, x, id)?;
    }
    Ok(())
}

/// Render a [StateFlags] set back out as the `_NET_WM_STATE` atom list a
/// client would read back via `get_property`.
fn state_to_atom_names(state: StateFlags) -> Vec<String> {
    let pairs = [
        (StateFlags::MODAL, Atom::NetWmStateModal),
        (StateFlags::STICKY, Atom::NetWmStateSticky),
        (StateFlags::MAXIMIZED_V, Atom::NetWmStateMaximizedVert),
        (StateFlags::MAXIMIZED_H, Atom::NetWmStateMaximizedHorz),
        (StateFlags::SHADED, Atom::NetWmStateShaded),
        (StateFlags::SKIP_TASKBAR, Atom::NetWmStateSkipTaskbar),
        (StateFlags::SKIP_PAGER, Atom::NetWmStateSkipPager),
        (StateFlags::HIDDEN, Atom::NetWmStateHidden),
        (StateFlags::FULLSCREEN, Atom::NetWmStateFullscreen),
        (StateFlags::ABOVE, Atom::NetWmStateAbove),
        (StateFlags::BELOW, Atom::NetWmStateBelow),
        (StateFlags::DEMANDS_ATTENTION, Atom::NetWmStateDemandsAttention),
    ];
    pairs
        .into_iter()
        .filter(|(bit, _)| state.contains(*bit))
        .map(|(_, atom)| atom.as_ref().to_string())
        .collect()
}

/// `_NET_WM_STATE`: interpret add/remove/toggle against the two proposed
/// atoms and run the result through `changeState`.
fn handle_net_wm_state<X: XConn>(
    state: &mut State,
    x: &X,
    id: Xid,
    action: StateAction,
    first: &str,
    second: Option<&str>,
) -> Result<()> {
    let Some(w) = state.windows.get_mut(&id) else {
        return Ok(());
    };

    let was_maximized_h = w.state.contains(StateFlags::MAXIMIZED_H);
    let was_maximized_v = w.state.contains(StateFlags::MAXIMIZED_V);

    let mut new_state = w.state;
    for atom in [Some(first), second].into_iter().flatten() {
        let Some(bit) = state_bit_for_atom(atom) else { continue };
        match action {
            StateAction::Add => new_state.insert(bit),
            StateAction::Remove => new_state.remove(bit),
            StateAction::Toggle => new_state.toggle(bit),
        }
    }

    // constrainWindowState: a state bit only sticks if the matching action
    // is currently allowed (P1, invariant I2).
    new_state = constrain_window_state(new_state, w.actions);

    let transition = w.change_state(new_state);
    x.set_property(
        id,
        Atom::NetWmState.as_ref(),
        Prop::Atoms(state_to_atom_names(w.state)),
    )?;

    if transition.should_hide {
        w.hide();
        x.unmap(target_window(w))?;
    } else if transition.should_show {
        w.show();
        x.map(target_window(w))?;
    }

    let now_maximized_h = w.state.contains(StateFlags::MAXIMIZED_H);
    let now_maximized_v = w.state.contains(StateFlags::MAXIMIZED_V);
    if (now_maximized_h != was_maximized_h) || (now_maximized_v != was_maximized_v) {
        recompute_maximize_geometry(state, x, id, was_maximized_h || was_maximized_v)?;
    }

    Ok(())
}

/// §4.8 "Configure pipeline": (un)maximizing changes which geometry is
/// authoritative, so re-derive it through [crate::stacking::compose_configure]
/// and push the result to the server. `was_maximized` tells us whether we
/// are restoring a saved pre-maximize geometry or capturing one.
fn recompute_maximize_geometry<X: XConn>(
    state: &mut State,
    x: &X,
    id: Xid,
    was_maximized: bool,
) -> Result<()> {
    let Some(n) = state.screen_of(id) else {
        return Ok(());
    };
    let (workarea, fullscreen_output) = {
        let Some(screen) = state.display.screens.get(n) else {
            return Ok(());
        };
        let workarea = screen
            .work_area(state.windows.values().map(|w| w.struts))
            .extents();
        let fullscreen_output = screen.outputs.first().copied().unwrap_or_default();
        (workarea, fullscreen_output)
    };

    let Some(w) = state.windows.get_mut(&id) else {
        return Ok(());
    };

    let is_maximized =
        w.state.contains(StateFlags::MAXIMIZED_H) || w.state.contains(StateFlags::MAXIMIZED_V);

    let requested = if is_maximized {
        if !was_maximized {
            w.pre_maximize_geometry = Some(w.geometry.current);
        }
        w.pre_maximize_geometry.unwrap_or(w.geometry.current)
    } else {
        w.pre_maximize_geometry.take().unwrap_or(w.geometry.current)
    };

    let new_rect = crate::stacking::compose_configure(w, requested, fullscreen_output, workarea, true);
    w.geometry.current = new_rect;
    w.geometry.server = new_rect;

    x.configure_window(
        target_window(w),
        ClientConfig {
            mask: ConfigureMask::X
                | ConfigureMask::Y
                | ConfigureMask::WIDTH
                | ConfigureMask::HEIGHT,
            r: new_rect,
            border_width: w.border_width,
            sibling: None,
            stack_mode: None,
        },
    )?;
    Ok(())
}

/// §8 P1: a state bit only survives if its matching action bit is set
/// (MODAL and SKIP_* are policy bits with no corresponding action and are
/// always allowed through).
pub fn constrain_window_state(requested: StateFlags, actions: ActionFlags) -> StateFlags {
    let mut allowed = requested;
    if requested.contains(StateFlags::MAXIMIZED_H) && !actions.contains(ActionFlags::MAXIMIZE_H) {
        allowed.remove(StateFlags::MAXIMIZED_H);
    }
    if requested.contains(StateFlags::MAXIMIZED_V) && !actions.contains(ActionFlags::MAXIMIZE_V) {
        allowed.remove(StateFlags::MAXIMIZED_V);
    }
    if requested.contains(StateFlags::FULLSCREEN) && !actions.contains(ActionFlags::FULLSCREEN) {
        allowed.remove(StateFlags::FULLSCREEN);
    }
    if requested.contains(StateFlags::SHADED) && !actions.contains(ActionFlags::SHADE) {
        allowed.remove(StateFlags::SHADED);
    }
    if requested.contains(StateFlags::STICKY) && !actions.contains(ActionFlags::STICK) {
        allowed.remove(StateFlags::STICKY);
    }
    allowed
}

/// `_NET_ACTIVE_WINDOW`.
fn handle_net_active_window<X: XConn>(
    state: &mut State,
    x: &X,
    id: Xid,
    source_is_application: bool,
    timestamp: u32,
) -> Result<()> {
    if source_is_application {
        return activate(state, x, id);
    }

    // Pager/task-list-sourced requests are judged with no prior active
    // timestamp to compare against; per-window user-time tracking narrows
    // this further once the property is actually read back (§4.6).
    match focus::is_window_focus_allowed(
        state.display.focus_prevention,
        Some(timestamp),
        None,
        false,
        true,
        None,
    ) {
        Ok(()) => activate(state, x, id),
        Err(reason) => {
            debug!(%id, ?reason, "activation denied by focus prevention");
            Ok(())
        }
    }
}

/// `activate(w)` (§4.7): switch desktop, unfold ancestors, clear shade,
/// then focus.
pub fn activate<X: XConn>(state: &mut State, x: &X, id: Xid) -> Result<()> {
    let desktop = state.windows.get(&id).and_then(|w| w.desktop);
    if let Some(desktop) = desktop {
        if let Some(n) = state.screen_of(id) {
            if let Some(screen) = state.screen_mut(n) {
                screen.current_desktop = desktop;
            }
        }
    }

    let Some(w) = state.windows.get_mut(&id) else {
        return Ok(());
    };
    w.in_show_desktop = false;
    w.unminimize();
    if w.state.contains(StateFlags::SHADED) {
        w.state.remove(StateFlags::SHADED);
        w.show();
    }

    move_input_focus_to(state, x, id)
}

/// `moveInputFocusTo(w)` (§4.7): resolve the deepest reachable modal
/// transient, then focus per ICCCM (`XSetInputFocus` if `inputHint`,
/// `WM_TAKE_FOCUS` if declared).
pub fn move_input_focus_to<X: XConn>(state: &mut State, x: &X, id: Xid) -> Result<()> {
    let modal_map: HashMap<Xid, Xid> = state
        .windows
        .values()
        .filter(|w| w.is_modal())
        .filter_map(|w| w.transient_for.map(|parent| (parent, w.id)))
        .collect();

    let target = focus::resolve_modal_target(id, |cur| modal_map.get(&cur).copied());

    let Some(w) = state.windows.get(&target) else {
        return Ok(());
    };

    if w.state.contains(StateFlags::HIDDEN) {
        if let Some(frame) = w.frame {
            x.set_input_focus(frame)?;
        }
        return Ok(());
    }

    let mut focused = false;
    if w.input_hint {
        x.set_input_focus(w.id)?;
        focused = true;
    }
    if w.protocols.contains(crate::window::Protocols::TAKE_FOCUS) {
        x.send_client_message(ClientMessage::WmTakeFocus {
            id: w.id,
            timestamp: state.display.last_key_event_time,
        })?;
        focused = true;
    }

    if focused {
        if let Some(n) = state.screen_of(target) {
            if let Some(screen) = state.screen_mut(n) {
                screen.set_active(Some(target));
            }
        }
        state.display.active_window = Some(target);
    }
    Ok(())
}

/// Sync alarm notify: matches `alarmId → window` and commits
/// `syncGeometry`.
fn handle_sync_alarm<X: XConn>(state: &mut State, x: &X, alarm: Xid, _value: i64) -> Result<()> {
    let Some(&window_id) = state.alarms.get(&alarm) else {
        return Ok(());
    };
    force_commit_sync_geometry(state, x, window_id)
}

/// P6 the watchdog path: a resize that armed `begin_resize` but whose
/// alarm never fires (client hung, or doesn't actually honour the
/// protocol) commits `syncGeometry` anyway after
/// [crate::window::sync::SYNC_WATCHDOG_MS]. Called both from the alarm path
/// above and from [crate::mainloop::MainLoop]'s per-iteration watchdog
/// sweep once a window's deadline passes with the alarm still unfired;
/// invoking it after the alarm already fired is a no-op since `commit`
/// will find nothing pending.
pub fn force_commit_sync_geometry<X: XConn>(state: &mut State, x: &X, window_id: Xid) -> Result<()> {
    let Some(w) = state.windows.get_mut(&window_id) else {
        return Ok(());
    };
    let Some(sync) = w.sync.as_mut() else {
        return Ok(());
    };

    if let Some(r) = sync.commit() {
        w.geometry.current = r;
        x.configure_window(
            window_id,
            ClientConfig {
                mask: ConfigureMask::X | ConfigureMask::Y | ConfigureMask::WIDTH | ConfigureMask::HEIGHT,
                r,
                border_width: w.border_width,
                sibling: None,
                stack_mode: None,
            },
        )?;
    }
    Ok(())
}

/// The ping timer (`pingDelay` interval): walk every normal, viewable,
/// non-transient window and bump `lastPing`. Windows whose `lastPong` is
/// still behind the *previous* ping are marked not-alive (§4.6, P7).
pub fn run_ping_sweep<X: XConn>(state: &mut State, x: &X, now: u32) -> Result<()> {
    for w in state.windows.values_mut() {
        if w.derived_type != WindowType::Normal || w.transient_for.is_some() {
            continue;
        }
        if !w.protocols.contains(crate::window::Protocols::PING) {
            continue;
        }

        if w.last_pong < w.last_ping {
            w.alive = false;
            warn!(id = %w.id, "window failed to pong, marking not alive");
        }

        w.last_ping = now;
        x.send_client_message(ClientMessage::WmProtocolsPing {
            id: w.id,
            timestamp: now,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{ExtensionVersions, ModMap};
    use crate::geometry::Rect;
    use crate::object::ObjectTree;
    use crate::window::WindowAttributes;
    use crate::x::mock::StubXConn;
    use std::time::Duration;

    fn fresh_state(x: &StubXConn) -> State {
        let object = ObjectTree::new().root();
        let extensions = ExtensionVersions {
            composite: Some((0, 2)),
            damage: true,
            sync: true,
            fixes: true,
            xkb: true,
            ..Default::default()
        };
        let display = Display::open(x, object, extensions, ModMap::default(), Duration::from_secs(1)).unwrap();
        State {
            display,
            windows: HashMap::new(),
            alarms: HashMap::new(),
        }
    }

    #[test]
    fn map_request_focuses_normal_window() {
        let x = StubXConn::new();
        let mut state = fresh_state(&x);
        let object = ObjectTree::new().root();
        let id = Xid(100);
        let mut w = Window::new(id, object, WindowAttributes::default());
        w.derived_type = WindowType::Normal;
        w.input_hint = true;
        state.windows.insert(id, w);

        handle_map_request(&mut state, &x, id).unwrap();
        assert!(x.calls().contains(&crate::x::mock::Call::SetInputFocus(id)));
    }

    #[test]
    fn manage_window_derives_dock_type_and_stacks_topmost() {
        let x = StubXConn::new();
        let mut state = fresh_state(&x);
        let screen = Screen::acquire(&x, 0, ObjectTree::new().root(), false, 1).unwrap();
        state.display.screens.push(screen);

        let attrs = WindowAttributes {
            mapped: false,
            ..WindowAttributes::default()
        };
        let id = x.seed_window(Rect::new(0, 0, 1280, 24), attrs);
        x.set_property(
            id,
            Atom::NetWmWindowType.as_ref(),
            Prop::Atoms(vec![Atom::NetWmWindowTypeDock.as_ref().to_string()]),
        )
        .unwrap();

        let object = ObjectTree::new().root();
        manage_window(&mut state, &x, id, object).unwrap();

        let w = &state.windows[&id];
        assert_eq!(w.derived_type, WindowType::Dock);
        assert_eq!(state.display.screens[0].stacking.position(id), Some(0));
        assert!(!x.calls().contains(&crate::x::mock::Call::Map(id)));
    }

    #[test]
    fn manage_window_is_idempotent() {
        let x = StubXConn::new();
        let mut state = fresh_state(&x);
        let object = ObjectTree::new().root();
        let id = x.seed_window(Rect::new(0, 0, 100, 100), WindowAttributes::default());

        manage_window(&mut state, &x, id, object).unwrap();
        manage_window(&mut state, &x, id, object).unwrap();
        assert_eq!(state.windows.len(), 1);
    }

    #[test]
    fn manage_window_already_viewable_triggers_map_request_transition() {
        let x = StubXConn::new();
        let mut state = fresh_state(&x);
        let screen = Screen::acquire(&x, 0, ObjectTree::new().root(), false, 1).unwrap();
        state.display.screens.push(screen);

        let attrs = WindowAttributes {
            mapped: true,
            ..WindowAttributes::default()
        };
        let id = x.seed_window(Rect::new(10, 10, 300, 200), attrs);
        let object = ObjectTree::new().root();

        manage_window(&mut state, &x, id, object).unwrap();
        assert!(x.calls().contains(&crate::x::mock::Call::Map(id)));
    }

    #[test]
    fn net_wm_state_add_maximized_sets_both_bits_when_allowed() {
        let x = StubXConn::new();
        let mut state = fresh_state(&x);
        let object = ObjectTree::new().root();
        let id = Xid(100);
        let mut w = Window::new(id, object, WindowAttributes::default());
        w.derived_type = WindowType::Normal;
        w.actions = ActionFlags::MAXIMIZE_H | ActionFlags::MAXIMIZE_V;
        state.windows.insert(id, w);

        handle_net_wm_state(
            &mut state,
            &x,
            id,
            StateAction::Add,
            Atom::NetWmStateMaximizedHorz.as_ref(),
            Some(Atom::NetWmStateMaximizedVert.as_ref()),
        )
        .unwrap();

        let w = &state.windows[&id];
        assert!(w.state.contains(StateFlags::MAXIMIZED_H));
        assert!(w.state.contains(StateFlags::MAXIMIZED_V));
    }

    #[test]
    fn net_wm_state_maximize_then_restore_round_trips_geometry() {
        let x = StubXConn::new();
        let mut state = fresh_state(&x);
        let screen = Screen::acquire(&x, 0, ObjectTree::new().root(), false, 1).unwrap();
        state.display.screens.push(screen);

        let object = ObjectTree::new().root();
        let id = Xid(100);
        let mut w = Window::new(id, object, WindowAttributes::default());
        w.derived_type = WindowType::Normal;
        w.actions = ActionFlags::MAXIMIZE_H | ActionFlags::MAXIMIZE_V;
        let original = Rect::new(100, 80, 400, 300);
        w.geometry.current = original;
        state.windows.insert(id, w);
        state.display.screens[0].stacking.push_top(id);

        handle_net_wm_state(
            &mut state,
            &x,
            id,
            StateAction::Add,
            Atom::NetWmStateMaximizedHorz.as_ref(),
            Some(Atom::NetWmStateMaximizedVert.as_ref()),
        )
        .unwrap();

        let w = &state.windows[&id];
        assert_eq!(w.geometry.current, Rect::new(0, 0, 1920, 1080));
        assert_eq!(w.pre_maximize_geometry, Some(original));

        handle_net_wm_state(
            &mut state,
            &x,
            id,
            StateAction::Remove,
            Atom::NetWmStateMaximizedHorz.as_ref(),
            Some(Atom::NetWmStateMaximizedVert.as_ref()),
        )
        .unwrap();

        let w = &state.windows[&id];
        assert_eq!(w.geometry.current, original);
        assert_eq!(w.pre_maximize_geometry, None);
    }

    #[test]
    fn net_wm_state_is_constrained_by_actions() {
        let x = StubXConn::new();
        let mut state = fresh_state(&x);
        let object = ObjectTree::new().root();
        let id = Xid(100);
        let mut w = Window::new(id, object, WindowAttributes::default());
        w.actions = ActionFlags::empty(); // maximize not allowed
        state.windows.insert(id, w);

        handle_net_wm_state(
            &mut state,
            &x,
            id,
            StateAction::Add,
            Atom::NetWmStateMaximizedHorz.as_ref(),
            None,
        )
        .unwrap();

        assert!(!state.windows[&id].state.contains(StateFlags::MAXIMIZED_H));
    }

    #[test]
    fn destroy_notify_falls_back_to_history() {
        let x = StubXConn::new();
        let mut state = fresh_state(&x);
        let object = ObjectTree::new().root();

        let a = Xid(10);
        let b = Xid(11);
        state.windows.insert(a, Window::new(a, object, WindowAttributes::default()));
        state.windows.insert(b, Window::new(b, object, WindowAttributes::default()));

        let screen = Screen::acquire(&x, 0, object, false, 1).unwrap();
        state.display.screens.push(screen);

        let screen = state.screen_mut(0).unwrap();
        screen.stacking.push_top(a);
        screen.stacking.push_top(b);
        screen.set_active(Some(a));
        screen.set_active(Some(b));

        handle_destroy_notify(&mut state, &x, b).unwrap();
        assert_eq!(state.display.screens[0].active_window, Some(a));
    }

    #[test]
    fn ping_sweep_marks_unresponsive_window_dead() {
        let x = StubXConn::new();
        let mut state = fresh_state(&x);
        let object = ObjectTree::new().root();
        let id = Xid(200);
        let mut w = Window::new(id, object, WindowAttributes::default());
        w.derived_type = WindowType::Normal;
        w.protocols.insert(crate::window::Protocols::PING);
        w.last_ping = 100;
        w.last_pong = 50; // never answered the last ping
        state.windows.insert(id, w);

        run_ping_sweep(&mut state, &x, 200).unwrap();
        assert!(!state.windows[&id].alive);
    }

    #[test]
    fn configure_request_on_sync_window_holds_resize_behind_alarm() {
        let x = StubXConn::new();
        let mut state = fresh_state(&x);
        let object = ObjectTree::new().root();
        let id = Xid(300);
        let mut w = Window::new(id, object, WindowAttributes::default());
        w.geometry.current = Rect::new(0, 0, 640, 480);
        w.protocols.insert(Protocols::SYNC_REQUEST);
        let alarm = Xid(301);
        w.sync = Some(crate::window::sync::SyncState::new(Xid(302), alarm, 0));
        state.windows.insert(id, w);
        state.alarms.insert(alarm, id);

        let req = crate::x::event::ConfigureRequestEvent {
            id,
            mask: ConfigureMask::WIDTH | ConfigureMask::HEIGHT,
            r: Rect::new(0, 0, 800, 600),
            border_width: 0,
            sibling: None,
            stack_mode: None,
        };
        handle_configure_request(&mut state, &x, req).unwrap();

        // Resize is held: geometry unchanged, a sync request went out, and
        // no ConfigureWindow call has been issued for the new size yet.
        assert_eq!(state.windows[&id].geometry.current, Rect::new(0, 0, 640, 480));
        assert!(state.windows[&id].sync.as_ref().unwrap().waiting);
        assert!(!x
            .calls()
            .iter()
            .any(|c| matches!(c, crate::x::mock::Call::Configure(cid, _) if *cid == id)));

        handle_event(&mut state, &x, XEvent::SyncAlarmNotify { alarm, value: 1 }).unwrap();

        let w = &state.windows[&id];
        assert_eq!(w.geometry.current, Rect::new(0, 0, 800, 600));
        assert!(!w.sync.as_ref().unwrap().waiting);
        assert!(x
            .calls()
            .iter()
            .any(|c| matches!(c, crate::x::mock::Call::Configure(cid, _) if *cid == id)));
    }
}
