//! Display bootstrap (part of C4): atom interning, extension probing, the
//! keyboard modifier map, and the per-display timestamp window.
//!
//! Grounded on the teacher's `x11rb::X11rbConnection::new` (connect, probe
//! extensions, intern atoms in one batched round trip) and `core::Config`
//! for where display-wide policy knobs live.
use crate::object::ObjectId;
use crate::screen::Screen;
use crate::x::XConn;
use crate::{Error, Result, Xid};
use std::time::Duration;
use tracing::{debug, info, warn};

/// The X extensions `addDisplay` step 3 probes for. Composite/Damage/Sync/
/// Fixes/XKB are mandatory; RandR/Shape/Xinerama are best-effort.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtensionVersions {
    pub composite: Option<(u32, u32)>,
    pub damage: bool,
    pub sync: bool,
    pub fixes: bool,
    pub xkb: bool,
    pub randr: bool,
    pub shape: bool,
    pub xinerama: bool,
}

impl ExtensionVersions {
    /// §4.4 step 3: "require Composite ≥ 0.2, Damage, Sync, Fixes, XKB
    /// (fatal if absent)".
    pub fn check_required(&self) -> Result<()> {
        let Some((major, minor)) = self.composite else {
            return Err(Error::MissingExtension { name: "Composite" });
        };
        if (major, minor) < (0, 2) {
            return Err(Error::MissingExtension { name: "Composite" });
        }
        if !self.damage {
            return Err(Error::MissingExtension { name: "Damage" });
        }
        if !self.sync {
            return Err(Error::MissingExtension { name: "Sync" });
        }
        if !self.fixes {
            return Err(Error::MissingExtension { name: "Fixes" });
        }
        if !self.xkb {
            return Err(Error::MissingExtension { name: "XKB" });
        }
        Ok(())
    }
}

/// Virtual modifiers compiz translates to real keyboard masks on every
/// grab (§4.4.1).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModMap {
    pub alt: u16,
    pub meta: u16,
    pub super_: u16,
    pub hyper: u16,
    pub mode_switch: u16,
    pub num_lock: u16,
    pub scroll_lock: u16,
}

impl ModMap {
    /// `ignoredModMask`: OR-ed into every passive grab so NumLock/
    /// ScrollLock/CapsLock being toggled does not break accelerators.
    pub fn ignored_mod_mask(&self, lock: u16) -> u16 {
        lock | self.num_lock | self.scroll_lock
    }

    /// Translate a virtual modifier mask (built from `self`'s bits) into
    /// the real mask a grab request should use.
    pub fn to_real_mask(&self, virtual_mask: u16) -> u16 {
        let mut real = 0;
        if virtual_mask & self.alt != 0 {
            real |= self.alt;
        }
        if virtual_mask & self.meta != 0 {
            real |= self.meta;
        }
        if virtual_mask & self.super_ != 0 {
            real |= self.super_;
        }
        if virtual_mask & self.hyper != 0 {
            real |= self.hyper;
        }
        real
    }
}

/// Per-display focus-prevention policy knobs (§4.7), configurable rather
/// than hard-coded so the CLI/config layer (C10) can override them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPreventionLevel {
    None,
    Low,
    High,
    VeryHigh,
}

/// One X display connection and everything bootstrapped on it.
#[derive(Debug)]
pub struct Display {
    pub object: ObjectId,
    pub extensions: ExtensionVersions,
    pub mod_map: ModMap,
    pub ignored_mod_mask: u16,
    pub focus_prevention: FocusPreventionLevel,
    pub ping_delay: Duration,
    pub timestamp_window: Xid,
    pub active_window: Option<Xid>,
    pub mod_state: u32,
    pub last_key_event_time: u32,
    pub error_count: u64,
    pub screens: Vec<Screen>,
}

impl Display {
    /// `addDisplay(host, num)` steps 2-6, minus the actual connection open
    /// (the caller already has a live [XConn]) and minus per-screen setup,
    /// which is [Display::add_screen].
    pub fn open<X: XConn>(
        x: &X,
        object: ObjectId,
        extensions: ExtensionVersions,
        mod_map: ModMap,
        ping_delay: Duration,
    ) -> Result<Self> {
        extensions.check_required()?;

        let timestamp_window = x.create_window(
            x.root(0),
            crate::geometry::Rect::new(-1, -1, 1, 1),
            crate::x::WinType::CheckWin,
        )?;

        let ignored_mod_mask = mod_map.ignored_mod_mask(1 << 1);

        info!(?extensions, "display extensions probed");

        Ok(Self {
            object,
            extensions,
            mod_map,
            ignored_mod_mask,
            focus_prevention: FocusPreventionLevel::Low,
            ping_delay,
            timestamp_window,
            active_window: None,
            mod_state: 0,
            last_key_event_time: 0,
            error_count: 0,
            screens: Vec::new(),
        })
    }

    /// `addScreen(n)`: wire a new [Screen] into this display, acquiring its
    /// manager selections. See [Screen::acquire] for the selection dance
    /// itself.
    pub fn add_screen<X: XConn>(
        &mut self,
        x: &X,
        n: usize,
        object: ObjectId,
        replace_wm: bool,
        timestamp: u32,
    ) -> Result<usize> {
        let screen = Screen::acquire(x, n, object, replace_wm, timestamp)?;
        self.screens.push(screen);
        Ok(self.screens.len() - 1)
    }

    /// XKB state-notify: update `modState`/`lastKeyEventTime` so passive
    /// grabs arm correctly (§4.6).
    pub fn on_xkb_state_notify(&mut self, mod_state: u32, time: u32) {
        debug!(mod_state, time, "xkb state notify");
        self.mod_state = mod_state;
        self.last_key_event_time = time;
    }

    /// Record an X protocol error (the error handler of §4.4 step 1: count
    /// errors, never abort).
    pub fn note_error(&mut self) {
        self.error_count += 1;
        warn!(total = self.error_count, "X protocol error observed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_extension_is_fatal() {
        let ext = ExtensionVersions {
            composite: Some((0, 3)),
            damage: true,
            sync: true,
            fixes: true,
            xkb: false,
            ..Default::default()
        };
        assert!(matches!(
            ext.check_required(),
            Err(Error::MissingExtension { name: "XKB" })
        ));
    }

    #[test]
    fn composite_below_0_2_is_fatal() {
        let ext = ExtensionVersions {
            composite: Some((0, 1)),
            damage: true,
            sync: true,
            fixes: true,
            xkb: true,
            ..Default::default()
        };
        assert!(ext.check_required().is_err());
    }

    #[test]
    fn mod_map_translates_virtual_to_real_mask() {
        let map = ModMap {
            alt: 0x8,
            meta: 0x10,
            ..Default::default()
        };
        assert_eq!(map.to_real_mask(0x8 | 0x10), 0x18);
        assert_eq!(map.to_real_mask(0), 0);
    }
}
