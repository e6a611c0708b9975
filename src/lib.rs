//! compiz-core: the window-management state machine and compositor main
//! loop of a compositing X11 window manager, minus rendering, GLSL
//! fragment-program composition, cursor drawing, window decoration, and
//! any Wayland backend.
//!
//! The crate is organised the way the object/plugin substrate (§2 C2)
//! expects to be consumed: [object] is the generic tree + reflection +
//! signal + private-storage machinery; [display], [screen] and [window]
//! layer compiz's specific object kinds on top of it; [x] is the protocol
//! boundary; [dispatch], [stacking], [focus] and [mainloop] are the state
//! machine and scheduler that tie them together.
#![warn(missing_debug_implementations)]

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod display;
pub mod error;
pub mod focus;
pub mod geometry;
pub mod mainloop;
pub mod object;
pub mod plugin;
pub mod private_index;
pub mod screen;
pub mod stacking;
pub mod window;
pub mod x;

pub use error::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An X11 resource id (window, atom, pixmap, counter, alarm, ...). A plain
/// `u32` newtype rather than distinct types per resource class, matching
/// how the protocol itself treats them: IDs are only ever disambiguated by
/// the request that uses them, never by their bit pattern.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Xid(pub u32);

impl std::fmt::Display for Xid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl From<u32> for Xid {
    fn from(v: u32) -> Self {
        Xid(v)
    }
}
