//! Crate wide error and result types.
//!
//! The variants below follow the error taxonomy of the design: fatal to the
//! whole process, fatal to a single display, recoverable per-operation, and
//! client-level. Only [crate::display::Display::open], [crate::display::
//! Display::add_screen] (for a display's first screen) and the top level CLI
//! entry point are expected to propagate an [Error] with `?`; every other
//! call site in the state engine catches failures and logs them instead, per
//! the propagation policy this mirrors.
use crate::Xid;

/// Crate wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Crate wide error type.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Unable to open a connection to the X server at all (exit code 2).
    #[error("unable to open X display")]
    OpenDisplay,

    /// A required X extension is missing (exit code 1).
    #[error("required X extension '{name}' is not available")]
    MissingExtension {
        /// The extension name as reported by the server (e.g. "Composite").
        name: &'static str,
    },

    /// Could not acquire the `WM_Sn` / `_NET_WM_CM_Sn` selections for a
    /// screen (exit code 1).
    #[error("failed to acquire window/compositing manager selection for screen {screen}")]
    SelectionAcquisitionFailed {
        /// The X screen number.
        screen: usize,
    },

    /// Another window manager already owns the root event mask and
    /// `--replace` was not requested (exit code 1).
    #[error("another window manager is already running on screen {screen}")]
    AnotherWmRunning {
        /// The X screen number.
        screen: usize,
    },

    /// A tracked property was missing or malformed for a given client.
    #[error("malformed or missing '{atom}' property on window {window}")]
    MalformedProperty {
        /// The window the property belongs to.
        window: Xid,
        /// The atom name, for diagnostics.
        atom: &'static str,
    },

    /// There were not enough workspace names to cover the attached screens.
    #[error("{n_screens} screens attached but only {n_ws} workspace names configured")]
    InsufficientWorkspaces {
        /// Number of configured workspace names.
        n_ws: usize,
        /// Number of attached screens.
        n_screens: usize,
    },

    /// No screens were supplied when constructing a [Display].
    #[error("at least one screen is required")]
    NoScreens,

    /// A typed state extension of the given type has not been registered.
    #[error("no state extension registered for {type_name}")]
    UnknownStateExtension {
        /// Name of the extension type, for diagnostics.
        type_name: &'static str,
    },

    /// An unrecognised CLI flag was supplied.
    #[error("unrecognised command line flag '{0}'")]
    UnknownFlag(String),

    /// A flag that requires a value was given none (or a malformed one).
    #[error("flag '{flag}' requires a valid value")]
    InvalidFlagValue {
        /// The flag name, e.g. `--refresh-rate`.
        flag: &'static str,
    },

    /// Lower level X11 connection establishment failure.
    #[cfg(feature = "x11rb")]
    #[error(transparent)]
    Connect(#[from] x11rb::errors::ConnectError),

    /// The X11 connection itself broke.
    #[cfg(feature = "x11rb")]
    #[error(transparent)]
    Connection(#[from] x11rb::errors::ConnectionError),

    /// A request/reply round trip failed.
    #[cfg(feature = "x11rb")]
    #[error(transparent)]
    Reply(#[from] x11rb::errors::ReplyError),

    /// A request/reply round trip or resource id allocation failed.
    #[cfg(feature = "x11rb")]
    #[error(transparent)]
    ReplyOrId(#[from] x11rb::errors::ReplyOrIdError),
}

impl Error {
    /// The process exit code associated with a fatal error, if this error
    /// is one of the fatal-to-process / fatal-to-display variants of §7.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Error::OpenDisplay => Some(2),
            Error::MissingExtension { .. }
            | Error::SelectionAcquisitionFailed { .. }
            | Error::AnotherWmRunning { .. } => Some(1),
            _ => None,
        }
    }

    /// Whether this error belongs to the "recoverable per-operation" class:
    /// callers should increment the error counter, log, and continue rather
    /// than unwind.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Reply(_) | Error::ReplyOrId(_) | Error::MalformedProperty { .. }
        )
    }
}
