//! The fixed EWMH/ICCCM/compiz-private atom set a [Display] interns once at
//! startup (§3 Display, §4.4 step 2).
//!
//! Grounded on the teacher's `x11rb::atom::Atoms` (intern every atom in one
//! batch of requests, then collect replies in a single round trip) and its
//! `strum::EnumIter` derive for enumerating the atom set at compile time.
use strum_macros::{AsRefStr, EnumIter};

/// One atom from the fixed set interned at [crate::display::Display]
/// bootstrap. `AsRef<str>` gives the wire name `intern_atom` is called
/// with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, AsRefStr)]
#[allow(non_camel_case_types)]
pub enum Atom {
    // ICCCM
    #[strum(serialize = "WM_STATE")]
    WmState,
    #[strum(serialize = "WM_PROTOCOLS")]
    WmProtocols,
    #[strum(serialize = "WM_DELETE_WINDOW")]
    WmDeleteWindow,
    #[strum(serialize = "WM_TAKE_FOCUS")]
    WmTakeFocus,
    #[strum(serialize = "WM_CHANGE_STATE")]
    WmChangeState,
    #[strum(serialize = "WM_CLIENT_LEADER")]
    WmClientLeader,
    #[strum(serialize = "WM_CLASS")]
    WmClass,
    #[strum(serialize = "WM_NAME")]
    WmName,
    #[strum(serialize = "WM_HINTS")]
    WmHints,
    #[strum(serialize = "WM_NORMAL_HINTS")]
    WmNormalHints,
    #[strum(serialize = "WM_TRANSIENT_FOR")]
    WmTransientFor,
    #[strum(serialize = "MANAGER")]
    Manager,
    #[strum(serialize = "UTF8_STRING")]
    Utf8String,
    #[strum(serialize = "_MOTIF_WM_HINTS")]
    MotifWmHints,

    // EWMH root/session
    #[strum(serialize = "_NET_SUPPORTED")]
    NetSupported,
    #[strum(serialize = "_NET_CLIENT_LIST")]
    NetClientList,
    #[strum(serialize = "_NET_CLIENT_LIST_STACKING")]
    NetClientListStacking,
    #[strum(serialize = "_NET_NUMBER_OF_DESKTOPS")]
    NetNumberOfDesktops,
    #[strum(serialize = "_NET_CURRENT_DESKTOP")]
    NetCurrentDesktop,
    #[strum(serialize = "_NET_DESKTOP_NAMES")]
    NetDesktopNames,
    #[strum(serialize = "_NET_ACTIVE_WINDOW")]
    NetActiveWindow,
    #[strum(serialize = "_NET_WORKAREA")]
    NetWorkarea,
    #[strum(serialize = "_NET_SUPPORTING_WM_CHECK")]
    NetSupportingWmCheck,
    #[strum(serialize = "_NET_SHOWING_DESKTOP")]
    NetShowingDesktop,
    #[strum(serialize = "_NET_STARTUP_ID")]
    NetStartupId,

    // EWMH per-window
    #[strum(serialize = "_NET_WM_NAME")]
    NetWmName,
    #[strum(serialize = "_NET_WM_PID")]
    NetWmPid,
    #[strum(serialize = "_NET_WM_DESKTOP")]
    NetWmDesktop,
    #[strum(serialize = "_NET_WM_USER_TIME")]
    NetWmUserTime,
    #[strum(serialize = "_NET_WM_USER_TIME_WINDOW")]
    NetWmUserTimeWindow,
    #[strum(serialize = "_NET_WM_STRUT")]
    NetWmStrut,
    #[strum(serialize = "_NET_WM_STRUT_PARTIAL")]
    NetWmStrutPartial,
    #[strum(serialize = "_NET_WM_SYNC_REQUEST")]
    NetWmSyncRequest,
    #[strum(serialize = "_NET_WM_SYNC_REQUEST_COUNTER")]
    NetWmSyncRequestCounter,
    #[strum(serialize = "_NET_WM_PING")]
    NetWmPing,
    #[strum(serialize = "_NET_WM_MOVERESIZE")]
    NetWmMoveresize,
    #[strum(serialize = "_NET_CLOSE_WINDOW")]
    NetCloseWindow,
    #[strum(serialize = "_NET_REQUEST_FRAME_EXTENTS")]
    NetRequestFrameExtents,
    #[strum(serialize = "_NET_FRAME_EXTENTS")]
    NetFrameExtents,
    #[strum(serialize = "_NET_WM_ALLOWED_ACTIONS")]
    NetWmAllowedActions,

    // _NET_WM_WINDOW_TYPE and its values
    #[strum(serialize = "_NET_WM_WINDOW_TYPE")]
    NetWmWindowType,
    #[strum(serialize = "_NET_WM_WINDOW_TYPE_DESKTOP")]
    NetWmWindowTypeDesktop,
    #[strum(serialize = "_NET_WM_WINDOW_TYPE_DOCK")]
    NetWmWindowTypeDock,
    #[strum(serialize = "_NET_WM_WINDOW_TYPE_TOOLBAR")]
    NetWmWindowTypeToolbar,
    #[strum(serialize = "_NET_WM_WINDOW_TYPE_MENU")]
    NetWmWindowTypeMenu,
    #[strum(serialize = "_NET_WM_WINDOW_TYPE_UTILITY")]
    NetWmWindowTypeUtility,
    #[strum(serialize = "_NET_WM_WINDOW_TYPE_SPLASH")]
    NetWmWindowTypeSplash,
    #[strum(serialize = "_NET_WM_WINDOW_TYPE_DIALOG")]
    NetWmWindowTypeDialog,
    #[strum(serialize = "_NET_WM_WINDOW_TYPE_NORMAL")]
    NetWmWindowTypeNormal,
    #[strum(serialize = "_NET_WM_WINDOW_TYPE_DROPDOWN_MENU")]
    NetWmWindowTypeDropdownMenu,
    #[strum(serialize = "_NET_WM_WINDOW_TYPE_POPUP_MENU")]
    NetWmWindowTypePopupMenu,
    #[strum(serialize = "_NET_WM_WINDOW_TYPE_TOOLTIP")]
    NetWmWindowTypeTooltip,
    #[strum(serialize = "_NET_WM_WINDOW_TYPE_NOTIFICATION")]
    NetWmWindowTypeNotification,
    #[strum(serialize = "_NET_WM_WINDOW_TYPE_COMBO")]
    NetWmWindowTypeCombo,
    #[strum(serialize = "_NET_WM_WINDOW_TYPE_DND")]
    NetWmWindowTypeDnd,

    // _NET_WM_STATE and its values
    #[strum(serialize = "_NET_WM_STATE")]
    NetWmState,
    #[strum(serialize = "_NET_WM_STATE_MODAL")]
    NetWmStateModal,
    #[strum(serialize = "_NET_WM_STATE_STICKY")]
    NetWmStateSticky,
    #[strum(serialize = "_NET_WM_STATE_MAXIMIZED_VERT")]
    NetWmStateMaximizedVert,
    #[strum(serialize = "_NET_WM_STATE_MAXIMIZED_HORZ")]
    NetWmStateMaximizedHorz,
    #[strum(serialize = "_NET_WM_STATE_SHADED")]
    NetWmStateShaded,
    #[strum(serialize = "_NET_WM_STATE_SKIP_TASKBAR")]
    NetWmStateSkipTaskbar,
    #[strum(serialize = "_NET_WM_STATE_SKIP_PAGER")]
    NetWmStateSkipPager,
    #[strum(serialize = "_NET_WM_STATE_HIDDEN")]
    NetWmStateHidden,
    #[strum(serialize = "_NET_WM_STATE_FULLSCREEN")]
    NetWmStateFullscreen,
    #[strum(serialize = "_NET_WM_STATE_ABOVE")]
    NetWmStateAbove,
    #[strum(serialize = "_NET_WM_STATE_BELOW")]
    NetWmStateBelow,
    #[strum(serialize = "_NET_WM_STATE_DEMANDS_ATTENTION")]
    NetWmStateDemandsAttention,

    // _NET_WM_ALLOWED_ACTIONS values
    #[strum(serialize = "_NET_WM_ACTION_MOVE")]
    NetWmActionMove,
    #[strum(serialize = "_NET_WM_ACTION_RESIZE")]
    NetWmActionResize,
    #[strum(serialize = "_NET_WM_ACTION_STICK")]
    NetWmActionStick,
    #[strum(serialize = "_NET_WM_ACTION_MINIMIZE")]
    NetWmActionMinimize,
    #[strum(serialize = "_NET_WM_ACTION_MAXIMIZE_HORZ")]
    NetWmActionMaximizeHorz,
    #[strum(serialize = "_NET_WM_ACTION_MAXIMIZE_VERT")]
    NetWmActionMaximizeVert,
    #[strum(serialize = "_NET_WM_ACTION_FULLSCREEN")]
    NetWmActionFullscreen,
    #[strum(serialize = "_NET_WM_ACTION_CLOSE")]
    NetWmActionClose,
    #[strum(serialize = "_NET_WM_ACTION_SHADE")]
    NetWmActionShade,
    #[strum(serialize = "_NET_WM_ACTION_CHANGE_DESKTOP")]
    NetWmActionChangeDesktop,
    #[strum(serialize = "_NET_WM_ACTION_ABOVE")]
    NetWmActionAbove,
    #[strum(serialize = "_NET_WM_ACTION_BELOW")]
    NetWmActionBelow,

    /// The single example of the "compiz-private" atom class spec.md names
    /// without enumerating (§3 Display).
    #[strum(serialize = "_COMPIZ_SCREEN_HINT")]
    CompizScreenHint,
}

impl Atom {
    /// All twelve `_NET_WM_WINDOW_TYPE_*` atoms, in the type-precedence
    /// order of §3 invariant I3 (most to least specific is not the same as
    /// this list's order — see [crate::window::derive_type] for the actual
    /// precedence chain; this is just the enumerable set).
    pub const WINDOW_TYPES: &'static [Atom] = &[
        Atom::NetWmWindowTypeDesktop,
        Atom::NetWmWindowTypeDock,
        Atom::NetWmWindowTypeToolbar,
        Atom::NetWmWindowTypeMenu,
        Atom::NetWmWindowTypeUtility,
        Atom::NetWmWindowTypeSplash,
        Atom::NetWmWindowTypeDialog,
        Atom::NetWmWindowTypeNormal,
        Atom::NetWmWindowTypeDropdownMenu,
        Atom::NetWmWindowTypePopupMenu,
        Atom::NetWmWindowTypeTooltip,
        Atom::NetWmWindowTypeNotification,
        Atom::NetWmWindowTypeCombo,
        Atom::NetWmWindowTypeDnd,
    ];

    /// All eleven `_NET_WM_STATE_*` atoms §3 Window enumerates for `state`.
    pub const STATES: &'static [Atom] = &[
        Atom::NetWmStateModal,
        Atom::NetWmStateSticky,
        Atom::NetWmStateMaximizedVert,
        Atom::NetWmStateMaximizedHorz,
        Atom::NetWmStateShaded,
        Atom::NetWmStateSkipTaskbar,
        Atom::NetWmStateSkipPager,
        Atom::NetWmStateHidden,
        Atom::NetWmStateFullscreen,
        Atom::NetWmStateAbove,
        Atom::NetWmStateBelow,
        Atom::NetWmStateDemandsAttention,
    ];

    /// Format a per-screen selection atom name, e.g. `WM_S0`.
    pub fn wm_sn(screen: usize) -> String {
        format!("WM_S{screen}")
    }

    /// Format a per-screen compositing-selection atom name, e.g.
    /// `_NET_WM_CM_S0`.
    pub fn net_wm_cm_sn(screen: usize) -> String {
        format!("_NET_WM_CM_S{screen}")
    }
}
