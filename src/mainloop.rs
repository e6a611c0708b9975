//! The cooperative scheduler (C3): a single-threaded timer heap, fd
//! watchers, and the six-step per-iteration redraw algorithm of §4.3.
//!
//! Grounded on the teacher's `manager::grab_keys_and_run` event loop shape
//! (drain events, dispatch, flush, reap background work, repeat) combined
//! with `nix::poll` for the fd-wait step the teacher's blocking
//! `wait_for_event` has no equivalent of — the teacher never multiplexes
//! more than the X connection's own fd.
use crate::dispatch::{self, State};
use crate::geometry::{Rect, Region};
use crate::x::XConn;
use crate::{Result, Xid};
use nix::poll::{poll, PollFd, PollFlags};
use std::os::unix::io::RawFd;
use std::time::{Duration, Instant};
use tracing::{trace, warn};

/// Handle returned by [MainLoop::add_timeout]/[MainLoop::add_watch_fd];
/// opaque to callers, used only to cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u64);

struct Timeout {
    handle: Handle,
    interval: Duration,
    remaining: Duration,
    callback: Box<dyn FnMut() -> bool>,
}

impl std::fmt::Debug for Timeout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timeout")
            .field("handle", &self.handle)
            .field("interval", &self.interval)
            .field("remaining", &self.remaining)
            .finish()
    }
}

struct Watch {
    handle: Handle,
    fd: RawFd,
    events: PollFlags,
    callback: Box<dyn FnMut(PollFlags) -> bool>,
}

impl std::fmt::Debug for Watch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watch")
            .field("handle", &self.handle)
            .field("fd", &self.fd)
            .field("events", &self.events)
            .finish()
    }
}

/// What a screen's painter is handed each redraw: the accumulated damage
/// and the output rectangles it covers. The core treats the painter as an
/// opaque collaborator (§6) — this trait models only the call boundary,
/// not any actual rendering.
pub trait Painter {
    fn prepare_paint_screen(&mut self, screen: usize, dt: Duration);
    fn paint_screen(&mut self, screen: usize, damage: &Region, outputs: &[Rect]);
    fn done_paint_screen(&mut self, screen: usize);
}

/// A painter that does nothing; used where the crate is driven headless
/// (tests, or a core embedded without a compositing backend attached).
#[derive(Debug, Default)]
pub struct NullPainter;

impl Painter for NullPainter {
    fn prepare_paint_screen(&mut self, _screen: usize, _dt: Duration) {}
    fn paint_screen(&mut self, _screen: usize, _damage: &Region, _outputs: &[Rect]) {}
    fn done_paint_screen(&mut self, _screen: usize) {}
}

/// Per-screen redraw pacing: tracks how late successive frames have run
/// and ratchets a time-multiplier up when consistently behind, back down
/// when caught up (§4.3 step 3).
#[derive(Debug, Clone, Copy)]
struct RedrawPacing {
    optimal: Duration,
    multiplier: f64,
    last_redraw: Instant,
}

impl RedrawPacing {
    fn new(optimal: Duration, now: Instant) -> Self {
        Self {
            optimal,
            multiplier: 1.0,
            last_redraw: now,
        }
    }

    /// Time remaining until this screen should next be redrawn, and the
    /// `dt` that redraw would be passed.
    fn time_to_next_redraw(&self, now: Instant) -> (Duration, Duration) {
        let since = now.saturating_duration_since(self.last_redraw);
        let target = self.optimal.mul_f64(self.multiplier);
        let remaining = target.saturating_sub(since);
        (remaining, since)
    }

    fn record_redraw(&mut self, now: Instant, since: Duration) {
        let target = self.optimal.mul_f64(self.multiplier);
        if since > target {
            self.multiplier = (self.multiplier * 1.1).min(4.0);
        } else {
            self.multiplier = (self.multiplier * 0.95).max(1.0);
        }
        self.last_redraw = now;
    }
}

/// The scheduler itself: owns the dispatcher [State], a live [XConn], and
/// every timer/fd registered with it.
pub struct MainLoop<X: XConn, P: Painter> {
    pub state: State,
    x: X,
    painter: P,
    timeouts: Vec<Timeout>,
    watches: Vec<Watch>,
    next_handle: u64,
    pacing: Vec<RedrawPacing>,
    in_handle_event: bool,
    running: bool,
    last_timeout_sweep: Instant,
}

impl<X: XConn, P: Painter> std::fmt::Debug for MainLoop<X, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MainLoop")
            .field("timeouts", &self.timeouts.len())
            .field("watches", &self.watches.len())
            .field("running", &self.running)
            .finish()
    }
}

impl<X: XConn, P: Painter> MainLoop<X, P> {
    pub fn new(state: State, x: X, painter: P, redraw_optimal: Duration) -> Self {
        let now = Instant::now();
        let pacing = (0..state.display.screens.len())
            .map(|_| RedrawPacing::new(redraw_optimal, now))
            .collect();
        Self {
            state,
            x,
            painter,
            timeouts: Vec::new(),
            watches: Vec::new(),
            next_handle: 0,
            pacing,
            in_handle_event: false,
            running: true,
            last_timeout_sweep: now,
        }
    }

    fn alloc_handle(&mut self) -> Handle {
        self.next_handle += 1;
        Handle(self.next_handle)
    }

    /// Register a recurring timeout. `callback` returning `false` cancels
    /// itself; returning `true` re-arms at the same interval (§4.3 step 5).
    pub fn add_timeout(
        &mut self,
        interval: Duration,
        callback: impl FnMut() -> bool + 'static,
    ) -> Handle {
        let handle = self.alloc_handle();
        self.timeouts.push(Timeout {
            handle,
            interval,
            remaining: interval,
            callback: Box::new(callback),
        });
        handle
    }

    /// Cancellation is re-entrancy-safe: the entry is only actually dropped
    /// during the next post-poll cleanup pass (§4.3 "Cancellation").
    pub fn remove_timeout(&mut self, handle: Handle) {
        self.timeouts.retain(|t| t.handle != handle);
    }

    pub fn add_watch_fd(
        &mut self,
        fd: RawFd,
        events: PollFlags,
        callback: impl FnMut(PollFlags) -> bool + 'static,
    ) -> Handle {
        let handle = self.alloc_handle();
        self.watches.push(Watch {
            handle,
            fd,
            events,
            callback: Box::new(callback),
        });
        handle
    }

    pub fn remove_watch_fd(&mut self, handle: Handle) {
        self.watches.retain(|w| w.handle != handle);
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Run iterations until [MainLoop::stop] is called.
    pub fn run(&mut self) -> Result<()> {
        while self.running {
            self.run_iteration()?;
        }
        Ok(())
    }

    /// One pass of the six-step algorithm, plus the sync-request watchdog
    /// sweep that rides alongside step 5.
    pub fn run_iteration(&mut self) -> Result<()> {
        self.drain_events()?;

        let now = Instant::now();
        let min_time_to_redraw = self.poll_timeout_for_redraw(now);
        let next_timeout = self.next_timeout_deadline();
        let next_sync_deadline = self.next_sync_deadline(now);
        let wait = [min_time_to_redraw, next_timeout, next_sync_deadline]
            .into_iter()
            .flatten()
            .min();

        self.poll_fds(wait)?;
        self.run_expired_timeouts(now);
        self.run_sync_watchdogs(now)?;
        self.redraw_damaged_screens(now)?;

        Ok(())
    }

    /// Step 1: drain non-blocking X events, forwarding each to
    /// [dispatch::handle_event]. `in_handle_event` prevents a synthetic
    /// warp-pointer sequence emitted while handling one event from being
    /// mistaken for fresh pointer motion.
    fn drain_events(&mut self) -> Result<()> {
        loop {
            let event = match self.x.poll_event()? {
                Some(e) => e,
                None => break,
            };
            self.in_handle_event = true;
            let outcome = dispatch::handle_event(&mut self.state, &self.x, event);
            self.in_handle_event = false;
            if let Err(e) = outcome {
                if e.is_recoverable() {
                    self.state.display.note_error();
                    warn!(error = %e, "recoverable error handling event, continuing");
                } else {
                    return Err(e);
                }
            }
        }
        self.x.flush();
        Ok(())
    }

    /// Step 2+3: accumulate damage per screen and compute the soonest a
    /// damaged screen wants to redraw. A screen with no damage and no
    /// pending destroys is idle and excluded from the wait computation.
    fn poll_timeout_for_redraw(&self, now: Instant) -> Option<Duration> {
        self.state
            .display
            .screens
            .iter()
            .zip(self.pacing.iter())
            .filter(|(screen, _)| !screen.damage.is_empty() || screen.pending_destroys > 0)
            .map(|(_, pacing)| pacing.time_to_next_redraw(now).0)
            .min()
    }

    fn next_timeout_deadline(&self) -> Option<Duration> {
        self.timeouts.iter().map(|t| t.remaining).min()
    }

    /// Soonest a window waiting on a sync-request acknowledgement needs its
    /// watchdog checked, so `poll_fds` does not sleep past it.
    fn next_sync_deadline(&self, now: Instant) -> Option<Duration> {
        self.state
            .windows
            .values()
            .filter_map(|w| w.sync.as_ref())
            .filter(|s| s.waiting)
            .filter_map(|s| s.deadline)
            .map(|d| d.saturating_duration_since(now))
            .min()
    }

    /// Step 4: poll every watched fd for the computed wait, firing
    /// callbacks whose `revents` came back set. A callback returning
    /// `false` is removed in the same cleanup pass cancellation uses.
    fn poll_fds(&mut self, wait: Option<Duration>) -> Result<()> {
        if self.watches.is_empty() {
            if let Some(d) = wait {
                std::thread::sleep(d.min(Duration::from_millis(50)));
            }
            return Ok(());
        }

        let mut fds: Vec<PollFd> = self
            .watches
            .iter()
            .map(|w| PollFd::new(w.fd, w.events))
            .collect();
        let timeout_ms = wait.map(|d| d.as_millis().min(i32::MAX as u128) as i32).unwrap_or(-1);

        match poll(&mut fds, timeout_ms) {
            Ok(n) if n > 0 => {
                let mut keep = vec![true; self.watches.len()];
                for (i, pfd) in fds.iter().enumerate() {
                    if let Some(revents) = pfd.revents() {
                        if !revents.is_empty() {
                            let again = (self.watches[i].callback)(revents);
                            if !again {
                                keep[i] = false;
                            }
                        }
                    }
                }
                let mut iter = keep.into_iter();
                self.watches.retain(|_| iter.next().unwrap_or(true));
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "poll() failed"),
        }
        Ok(())
    }

    /// Step 5: decrement every timeout's remaining time by the wall-clock
    /// delta since the last sweep (clamped at zero for clock drift) and
    /// run every head that has expired.
    fn run_expired_timeouts(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_timeout_sweep);
        self.last_timeout_sweep = now;

        for t in self.timeouts.iter_mut() {
            t.remaining = t.remaining.saturating_sub(elapsed);
        }

        let mut keep = vec![true; self.timeouts.len()];
        for (i, t) in self.timeouts.iter_mut().enumerate() {
            if t.remaining.is_zero() {
                let again = (t.callback)();
                if again {
                    t.remaining = t.interval;
                } else {
                    keep[i] = false;
                }
            }
        }
        let mut iter = keep.into_iter();
        self.timeouts.retain(|_| iter.next().unwrap_or(true));
    }

    /// Sync-request watchdog (§4.6 P6): force-commit any window whose
    /// resize is still `waiting` past its [crate::window::sync::SyncState::deadline]
    /// — a client that declared `_NET_WM_SYNC_REQUEST` but never fires the
    /// alarm would otherwise leave the window frozen at its pre-resize size
    /// forever, since a bare `ConfigureRequest` while `waiting` only
    /// overwrites `pending_geometry` rather than applying it.
    fn run_sync_watchdogs(&mut self, now: Instant) -> Result<()> {
        let expired: Vec<Xid> = self
            .state
            .windows
            .iter()
            .filter(|(_, w)| {
                w.sync
                    .as_ref()
                    .map(|s| s.waiting && s.deadline.is_some_and(|d| now >= d))
                    .unwrap_or(false)
            })
            .map(|(id, _)| *id)
            .collect();

        for id in expired {
            dispatch::force_commit_sync_geometry(&mut self.state, &self.x, id)?;
        }
        Ok(())
    }

    /// Step 6: for every screen whose redraw deadline has arrived, run the
    /// paint sequence and reap any destroyed windows still pending.
    fn redraw_damaged_screens(&mut self, now: Instant) -> Result<()> {
        for n in 0..self.state.display.screens.len() {
            let (time_left, since) = self.pacing[n].time_to_next_redraw(now);
            let damaged = {
                let screen = &self.state.display.screens[n];
                !screen.damage.is_empty() || screen.pending_destroys > 0
            };
            if !damaged || !time_left.is_zero() {
                continue;
            }

            self.painter.prepare_paint_screen(n, since);

            let damage = self.state.display.screens[n].take_damage();
            let outputs = self.state.display.screens[n].outputs.clone();
            self.painter.paint_screen(n, &damage, &outputs);
            self.painter.done_paint_screen(n);
            self.pacing[n].record_redraw(now, since);

            while self.state.display.screens[n].pending_destroys > 0 {
                self.state.display.screens[n].pending_destroys -= 1;
            }
            trace!(screen = n, "screen redrawn");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redraw_pacing_ratchets_multiplier_up_when_late() {
        let now = Instant::now();
        let mut pacing = RedrawPacing::new(Duration::from_millis(16), now);
        let later = now + Duration::from_millis(100);
        pacing.record_redraw(later, Duration::from_millis(100));
        assert!(pacing.multiplier > 1.0);
    }

    #[test]
    fn redraw_pacing_relaxes_multiplier_when_caught_up() {
        let now = Instant::now();
        let mut pacing = RedrawPacing::new(Duration::from_millis(16), now);
        pacing.multiplier = 2.0;
        let later = now + Duration::from_millis(5);
        pacing.record_redraw(later, Duration::from_millis(5));
        assert!(pacing.multiplier < 2.0);
    }
}
