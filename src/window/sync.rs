//! `_NET_WM_SYNC_REQUEST` protocol state (§4.5.5).
use crate::geometry::Rect;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// The sync-request watchdog timeout: if the client never acknowledges a
/// resize, [crate::mainloop::MainLoop] commits the pending geometry anyway
/// after this many milliseconds (§4.6 P6).
pub const SYNC_WATCHDOG_MS: u64 = 1200;

/// A client's declared sync counter and the bookkeeping needed to drive the
/// "request, wait for alarm, commit" protocol.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SyncState {
    pub counter: crate::Xid,
    pub alarm: crate::Xid,
    /// The value last sent to the client; the alarm is armed one unit
    /// above whatever the counter read when this was allocated.
    pub next_value: i64,
    /// True from the moment a resize is requested until the alarm fires
    /// (or the watchdog expires); while true, `ConfigureRequest` handling
    /// only stashes geometry into `pending_geometry` rather than resizing
    /// immediately (§4.6 ConfigureRequest handling).
    pub waiting: bool,
    /// The geometry to commit once the client acknowledges.
    pub pending_geometry: Option<Rect>,
    /// When the watchdog should force-commit `pending_geometry` if the
    /// alarm has not fired by then. Not serialised: it is a monotonic,
    /// process-local deadline, meaningless across a restart.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub deadline: Option<Instant>,
}

impl SyncState {
    pub fn new(counter: crate::Xid, alarm: crate::Xid, initial_value: i64) -> Self {
        Self {
            counter,
            alarm,
            next_value: initial_value + 1,
            waiting: false,
            pending_geometry: None,
            deadline: None,
        }
    }

    /// Begin a resize: arm `waiting`, stash the target geometry, set the
    /// watchdog deadline [SYNC_WATCHDOG_MS] out, and return the value that
    /// should be sent to the client in a `WM_SYNC_REQUEST` client message.
    pub fn begin_resize(&mut self, target: Rect) -> i64 {
        self.waiting = true;
        self.pending_geometry = Some(target);
        self.deadline = Some(Instant::now() + Duration::from_millis(SYNC_WATCHDOG_MS));
        let value = self.next_value;
        self.next_value += 1;
        value
    }

    /// The alarm fired (or the watchdog expired): take the pending
    /// geometry to commit and clear the wait state.
    pub fn commit(&mut self) -> Option<Rect> {
        self.waiting = false;
        self.deadline = None;
        self.pending_geometry.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Xid;

    #[test]
    fn begin_resize_then_commit_round_trips_pending_geometry() {
        let mut s = SyncState::new(Xid(1), Xid(2), 0);
        let target = Rect::new(0, 0, 200, 100);
        let value = s.begin_resize(target);
        assert_eq!(value, 1);
        assert!(s.waiting);

        let committed = s.commit();
        assert_eq!(committed, Some(target));
        assert!(!s.waiting);
        assert_eq!(s.pending_geometry, None);
    }

    #[test]
    fn next_value_monotonically_increases() {
        let mut s = SyncState::new(Xid(1), Xid(2), 10);
        assert_eq!(s.begin_resize(Rect::zeroed()), 11);
        assert_eq!(s.begin_resize(Rect::zeroed()), 12);
    }
}
