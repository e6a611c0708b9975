//! Logic for interacting with the X server (the consumed half of §6's "X
//! server protocol" external interface).
//!
//! [XConn] is the seam a concrete backend (e.g. an `x11rb`-based
//! implementation, kept out of this crate's default build surface since it
//! would need a live display to be useful) plugs into. Everything in
//! [crate::dispatch], [crate::stacking] and [crate::focus] is written
//! against this trait so it can run against [mock::StubXConn] in tests.
use crate::geometry::{Point, Rect};
use crate::window::WindowAttributes;
use crate::x::atom::Atom;
use crate::x::event::{ClientMessage, ConfigureMask, StackMode, XEvent};
use crate::{Result, Xid};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod atom;
pub mod event;

pub mod mock;

/// A single X property value, typed the way `_NET_*`/ICCCM properties
/// actually are on the wire (§3, §6).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Prop {
    /// `CARDINAL`/`ATOM` list, e.g. `_NET_WM_STATE`, `_NET_WM_ALLOWED_ACTIONS`.
    Atoms(Vec<String>),
    /// A single 32 bit cardinal, e.g. `_NET_WM_DESKTOP`.
    Cardinal(u32),
    /// A list of 32 bit cardinals, e.g. `_NET_WM_STRUT_PARTIAL`.
    Cardinals(Vec<u32>),
    /// `UTF8_STRING` / `STRING` list, e.g. `WM_CLASS`, `_NET_WM_NAME`.
    UTF8String(Vec<String>),
    /// A raw byte blob for properties this crate does not interpret
    /// (`_MOTIF_WM_HINTS` before it is parsed into `MwmHints`).
    Bytes(Vec<u8>),
}

/// The ICCCM `WM_STATE` value, distinct from the EWMH `_NET_WM_STATE` bit
/// mask (§3 Window `state`).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WmState {
    Withdrawn,
    Normal,
    Iconic,
}

/// Window type to request when creating a frame/wrapper/dummy window
/// (§4.5.4, §4.4).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WinType {
    /// A hidden, unmapped stub window for timestamp queries / selections.
    CheckWin,
    /// An input-only window (click-catching frame, screen-edge strip).
    InputOnly,
    /// A regular InputOutput window with the given depth/visual copied
    /// from a reference window (the client being reparented).
    InputOutput(Xid),
}

/// Geometry/stacking fields a `configure_window` call may set, mirroring
/// the `CW*` protocol bits (§4.8 Configure pipeline step 8).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClientConfig {
    pub mask: ConfigureMask,
    pub r: Rect,
    pub border_width: u32,
    pub sibling: Option<Xid>,
    pub stack_mode: Option<StackMode>,
}

/// A handle on a running X11 connection used for issuing requests.
///
/// Grounded on the teacher's `x::XConn` trait; widened with the
/// reparenting, sync-counter, selection-ownership, and passive-grab
/// operations the compiz core needs that a tiling-only window manager does
/// not (§4.4, §4.5.4, §4.5.5).
pub trait XConn {
    /// The root window id for a given screen.
    fn root(&self, screen: usize) -> Xid;

    /// Raw per-output geometry (Xinerama/RandR), in output order.
    fn screen_details(&self, screen: usize) -> Result<Vec<Rect>>;

    /// Current cursor position, screen-relative.
    fn cursor_position(&self) -> Result<Point>;

    /// Non-blocking poll for the next queued event, if any.
    fn poll_event(&self) -> Result<Option<XEvent>>;

    /// Flush any pending requests to the server.
    fn flush(&self);

    /// Intern (or look up) an atom by name.
    fn intern_atom(&self, name: &str) -> Result<Xid>;

    /// Look up an atom's wire name.
    fn atom_name(&self, atom: Xid) -> Result<String>;

    /// Current geometry (position + size, excluding border) of a window.
    fn get_geometry(&self, id: Xid) -> Result<Rect>;

    /// [WindowAttributes] (override-redirect, map state, depth, ...).
    fn get_window_attributes(&self, id: Xid) -> Result<WindowAttributes>;

    /// Query the X server for the currently mapped top-level children of
    /// `root`, bottom to top (used to seed adoption of pre-existing
    /// windows and to verify the stacking list against `XQueryTree`, P2).
    fn query_tree(&self, root: Xid) -> Result<Vec<Xid>>;

    /// Fetch a named property.
    fn get_property(&self, id: Xid, name: &str) -> Result<Option<Prop>>;

    /// Set a named property.
    fn set_property(&self, id: Xid, name: &str, value: Prop) -> Result<()>;

    /// Delete a named property.
    fn delete_property(&self, id: Xid, name: &str) -> Result<()>;

    /// ICCCM `WM_STATE`.
    fn get_wm_state(&self, id: Xid) -> Result<Option<WmState>>;
    fn set_wm_state(&self, id: Xid, state: WmState) -> Result<()>;

    /// Map/unmap a window.
    fn map(&self, id: Xid) -> Result<()>;
    fn unmap(&self, id: Xid) -> Result<()>;

    /// Destroy a window the core created (frame/wrapper/dummy), never a
    /// client's own window.
    fn destroy(&self, id: Xid) -> Result<()>;

    /// Create a window of the given [WinType] as a child of `parent`.
    fn create_window(&self, parent: Xid, r: Rect, win_type: WinType) -> Result<Xid>;

    /// `XReparentWindow`.
    fn reparent(&self, id: Xid, new_parent: Xid, p: Point) -> Result<()>;

    /// Configure geometry/stacking per the `CW*` bits set in `cfg.mask`.
    fn configure_window(&self, id: Xid, cfg: ClientConfig) -> Result<()>;

    /// Send a synthetic `ConfigureNotify` per ICCCM 4.1.5.
    fn send_synthetic_configure_notify(&self, id: Xid, r: Rect) -> Result<()>;

    /// Add/remove `id` from the WM's save-set (§4.5.4 reparenting).
    fn change_save_set(&self, id: Xid, add: bool) -> Result<()>;

    /// `XSetInputFocus`.
    fn set_input_focus(&self, id: Xid) -> Result<()>;

    /// Send a [ClientMessage] to a window.
    fn send_client_message(&self, msg: ClientMessage) -> Result<()>;

    /// Establish a passive button grab on `id` (§4.5.4: AnyButton/AnyModifier
    /// on a frame to detect clicks) or a passive key grab (§4.4.1).
    fn grab_button(&self, id: Xid, button: Option<u8>, mods: u16) -> Result<()>;
    fn grab_key(&self, id: Xid, code: u8, mods: u16) -> Result<()>;
    fn ungrab_all(&self, id: Xid) -> Result<()>;

    /// `XGrabServer`/`XUngrabServer` — a bracket inside which every X call
    /// executes as one atomic operation on the server (§5).
    fn grab_server(&self) -> Result<()>;
    fn ungrab_server(&self) -> Result<()>;

    /// Attempt to become the owner of a manager selection
    /// (`WM_Sn`/`_NET_WM_CM_Sn`) at `timestamp`, returning the previous
    /// owner (if any) so the caller can wait for its destruction (§4.4
    /// `addScreen` step 3).
    fn acquire_selection(&self, selection: Xid, owner: Xid, timestamp: u32) -> Result<Option<Xid>>;

    /// Redirect `id`'s subwindows for compositing (`RedirectManual`).
    fn composite_redirect_subwindows(&self, id: Xid) -> Result<()>;

    /// Allocate a sync counter + alarm pair for a client declaring
    /// `_NET_WM_SYNC_REQUEST` (§4.5.5). Returns the counter id.
    fn sync_create_alarm(&self, counter: Xid, trigger_value: i64) -> Result<Xid>;

    /// Read a client's current sync counter value.
    fn sync_get_counter_value(&self, counter: Xid) -> Result<i64>;

    /// The number of X protocol errors observed since the last call to
    /// this method, used by `checkForError()` call sites per §7
    /// ("Recoverable per-operation" — callers inspect this after risky
    /// sequences and treat the window as already-destroyed on any error).
    fn error_count(&self) -> u64;
}

/// Read a single string-list property as plain `String`s, tolerating either
/// [Prop::UTF8String] or [Prop::Atoms] encodings.
pub fn read_strings(prop: &Prop) -> Vec<String> {
    match prop {
        Prop::UTF8String(v) | Prop::Atoms(v) => v.clone(),
        _ => Vec::new(),
    }
}

/// Intern `atom` and fetch its current value as an atom list, tolerating a
/// missing property as an empty list rather than an error (a window with no
/// `_NET_WM_STATE` set is not malformed, it simply has no state yet).
pub fn get_atom_list<X: XConn>(x: &X, id: Xid, atom: Atom) -> Result<Vec<String>> {
    Ok(x.get_property(id, atom.as_ref())?
        .map(|p| read_strings(&p))
        .unwrap_or_default())
}
