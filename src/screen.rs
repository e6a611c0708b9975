//! Per-screen state (C4 bootstrap + the screen-scoped fields of §3): the
//! root window, selection ownership, viewport/desktop geometry, damage
//! accumulation, and the stacking list container.
//!
//! Grounded on the teacher's `x::XConnExt::manage`/`refresh` (stacking list
//! maintenance) generalised to the full screen-acquisition dance of §4.4
//! step "addScreen", which the teacher (no compositing, no manager
//! selection) has no equivalent of — that part follows spec.md directly.
use crate::geometry::{Rect, Region};
use crate::object::ObjectId;
use crate::window::struts::{self, Struts};
use crate::x::atom::Atom;
use crate::x::XConn;
use crate::{Error, Result, Xid};
use std::collections::VecDeque;
use tracing::{info, warn};

/// How many most-recently-active windows the focus history ring retains
/// (§3 Screen "active-window history ring (32 slots × 64 recent ids)" —
/// modelled here as a single bounded ring since the two numbers describe
/// the same structure at two granularities in the original).
pub const ACTIVE_HISTORY_CAPACITY: usize = 64;

/// A doubly linked stacking position is represented here as a flat,
/// bottom-to-top `Vec<Xid>` rather than an intrusive linked list — matching
/// the [crate::geometry::Region] design rationale: the lists involved are
/// small (hundreds of windows at most) and a `Vec` gives the same `O(1)`
/// "is it above/below" queries via position comparison, with none of the
/// unsafe pointer juggling a hand-rolled doubly linked list would need.
#[derive(Debug, Clone, Default)]
pub struct StackingList {
    /// Bottom to top.
    order: Vec<Xid>,
}

impl StackingList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn iter_bottom_to_top(&self) -> impl Iterator<Item = Xid> + '_ {
        self.order.iter().copied()
    }

    pub fn iter_top_to_bottom(&self) -> impl Iterator<Item = Xid> + '_ {
        self.order.iter().rev().copied()
    }

    pub fn position(&self, id: Xid) -> Option<usize> {
        self.order.iter().position(|w| *w == id)
    }

    /// Push `id` at the very top.
    pub fn push_top(&mut self, id: Xid) {
        self.remove(id);
        self.order.push(id);
    }

    /// Insert `id` directly below `above`, or at the top if `above` is
    /// `None` (§4.8 Restack). No-op if `id` is already in that position.
    pub fn restack_below(&mut self, id: Xid, above: Option<Xid>) -> bool {
        let already_there = match above {
            Some(a) => matches!((self.position(id), self.position(a)), (Some(cur), Some(target)) if cur + 1 == target),
            None => self.position(id) == Some(self.order.len().saturating_sub(1)) && !self.order.is_empty(),
        };
        if already_there {
            return false;
        }

        self.remove(id);
        match above.and_then(|a| self.position(a)) {
            Some(idx) => self.order.insert(idx, id),
            None => self.order.push(id),
        }
        true
    }

    pub fn remove(&mut self, id: Xid) {
        self.order.retain(|w| *w != id);
    }

    pub fn above(&self, id: Xid) -> Option<Xid> {
        let idx = self.position(id)?;
        self.order.get(idx + 1).copied()
    }

    pub fn below(&self, id: Xid) -> Option<Xid> {
        let idx = self.position(id)?;
        idx.checked_sub(1).and_then(|i| self.order.get(i)).copied()
    }

    pub fn as_slice(&self) -> &[Xid] {
        &self.order
    }
}

/// Viewport geometry: the desktop is tiled `hsize x vsize` virtual
/// screens, one of which is the current output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport {
    pub hsize: u32,
    pub vsize: u32,
    pub current_x: u32,
    pub current_y: u32,
}

/// A bounded MRU ring of recently-active window ids, for focus fallbacks.
#[derive(Debug, Clone, Default)]
pub struct ActiveHistory {
    ring: VecDeque<Xid>,
}

impl ActiveHistory {
    pub fn push(&mut self, id: Xid) {
        self.ring.retain(|w| *w != id);
        self.ring.push_front(id);
        if self.ring.len() > ACTIVE_HISTORY_CAPACITY {
            self.ring.pop_back();
        }
    }

    pub fn remove(&mut self, id: Xid) {
        self.ring.retain(|w| *w != id);
    }

    pub fn most_recent(&self) -> Option<Xid> {
        self.ring.front().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = Xid> + '_ {
        self.ring.iter().copied()
    }
}

/// A passive grab reference count, keyed implicitly by (button/key, mods)
/// at the call site; stored here as a flat `Vec` since screens only ever
/// have a handful of distinct grabs active.
#[derive(Debug, Clone, Default)]
pub struct GrabTable {
    entries: Vec<(u16, u16, u32)>,
}

impl GrabTable {
    /// Increment the refcount for `(code, mods)`, returning true if this
    /// was the first reference (i.e. the caller must actually issue the
    /// grab request).
    pub fn acquire(&mut self, code: u16, mods: u16) -> bool {
        if let Some(e) = self.entries.iter_mut().find(|e| e.0 == code && e.1 == mods) {
            e.2 += 1;
            false
        } else {
            self.entries.push((code, mods, 1));
            true
        }
    }

    /// Decrement the refcount, returning true if it reached zero (the
    /// caller must issue the ungrab request).
    pub fn release(&mut self, code: u16, mods: u16) -> bool {
        if let Some(pos) = self.entries.iter().position(|e| e.0 == code && e.1 == mods) {
            self.entries[pos].2 -= 1;
            if self.entries[pos].2 == 0 {
                self.entries.remove(pos);
                return true;
            }
        }
        false
    }
}

/// One X screen under management.
#[derive(Debug)]
pub struct Screen {
    pub object: ObjectId,
    pub number: usize,
    pub root: Xid,
    pub wm_selection_owner: Xid,
    pub cm_selection_owner: Xid,
    pub outputs: Vec<Rect>,
    pub viewport: Viewport,
    pub current_desktop: u32,
    pub number_of_desktops: u32,
    pub damage: Region,
    pub pending_destroys: u32,
    pub active_window: Option<Xid>,
    pub active_history: ActiveHistory,
    pub stacking: StackingList,
    pub button_grabs: GrabTable,
    pub key_grabs: GrabTable,
    pub screen_edges: Vec<Xid>,
    pub showing_desktop: bool,
}

impl Screen {
    /// `addScreen(n)`: create the manager-selection owner window, acquire
    /// `WM_Sn`/`_NET_WM_CM_Sn` at `timestamp`, broadcast the manager
    /// message, redirect subwindows, and select the root event mask.
    ///
    /// If `replace_wm` is false and a prior owner exists, selection
    /// acquisition fails outright (§4.4 step 3) rather than waiting for the
    /// old owner's destruction — callers that want to wait should retry
    /// after observing the previous owner's `DestroyNotify` themselves,
    /// since the wait is a suspension point (§5) this synchronous call
    /// does not perform.
    pub fn acquire<X: XConn>(
        x: &X,
        n: usize,
        object: ObjectId,
        replace_wm: bool,
        timestamp: u32,
    ) -> Result<Self> {
        let root = x.root(n);
        let owner = x.create_window(root, Rect::new(-1, -1, 1, 1), crate::x::WinType::CheckWin)?;
        x.set_property(
            owner,
            Atom::NetWmName.as_ref(),
            crate::x::Prop::UTF8String(vec!["compiz".to_string()]),
        )?;

        let wm_sel = x.intern_atom(&Atom::wm_sn(n))?;
        let cm_sel = x.intern_atom(&Atom::net_wm_cm_sn(n))?;

        let prev_wm = x.acquire_selection(wm_sel, owner, timestamp)?;
        if prev_wm.is_some() && !replace_wm {
            return Err(Error::AnotherWmRunning { screen: n });
        }
        let prev_cm = x.acquire_selection(cm_sel, owner, timestamp)?;
        if prev_cm.is_some() && !replace_wm {
            return Err(Error::AnotherWmRunning { screen: n });
        }

        x.send_client_message(crate::x::event::ClientMessage::Other {
            id: root,
            dtype: "MANAGER".to_string(),
            data: [timestamp, wm_sel.0, owner.0, 0, 0],
        })?;

        x.composite_redirect_subwindows(root)?;

        if x.error_count() > 0 {
            warn!(screen = n, "error during screen acquisition, undoing selection ownership");
            return Err(Error::SelectionAcquisitionFailed { screen: n });
        }

        let outputs = x.screen_details(n)?;
        info!(screen = n, outputs = outputs.len(), "screen acquired");

        Ok(Self {
            object,
            number: n,
            root,
            wm_selection_owner: owner,
            cm_selection_owner: owner,
            outputs,
            viewport: Viewport {
                hsize: 1,
                vsize: 1,
                current_x: 0,
                current_y: 0,
            },
            current_desktop: 0,
            number_of_desktops: 1,
            damage: Region::empty(),
            pending_destroys: 0,
            active_window: None,
            active_history: ActiveHistory::default(),
            stacking: StackingList::new(),
            button_grabs: GrabTable::default(),
            key_grabs: GrabTable::default(),
            screen_edges: Vec::new(),
            showing_desktop: false,
        })
    }

    /// I4: recompute the usable work-area from this screen's outputs and
    /// every visible window's struts.
    pub fn work_area(&self, window_struts: impl Iterator<Item = Struts>) -> Region {
        struts::work_area(&self.outputs, window_struts)
    }

    /// Queue damage; `updateStruts`/output reconfiguration trigger this the
    /// same way a window's repaint would (§4.3 main loop step 2).
    pub fn damage_rect(&mut self, r: Rect) {
        self.damage.add_rect(r);
    }

    pub fn take_damage(&mut self) -> Region {
        std::mem::replace(&mut self.damage, Region::empty())
    }

    pub fn set_active(&mut self, id: Option<Xid>) {
        self.active_window = id;
        if let Some(id) = id {
            self.active_history.push(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stacking_list_restack_below_moves_window() {
        let mut list = StackingList::new();
        list.push_top(Xid(1));
        list.push_top(Xid(2));
        list.push_top(Xid(3));
        // bottom->top: 1, 2, 3

        assert!(list.restack_below(Xid(3), Some(Xid(1))));
        assert_eq!(list.as_slice(), &[Xid(3), Xid(1), Xid(2)]);
    }

    #[test]
    fn restack_below_is_noop_when_already_positioned() {
        let mut list = StackingList::new();
        list.push_top(Xid(1));
        list.push_top(Xid(2));
        assert!(!list.restack_below(Xid(1), Some(Xid(2))));
    }

    #[test]
    fn active_history_deduplicates_and_caps_capacity() {
        let mut hist = ActiveHistory::default();
        for i in 0..(ACTIVE_HISTORY_CAPACITY as u32 + 10) {
            hist.push(Xid(i));
        }
        assert_eq!(hist.ring.len(), ACTIVE_HISTORY_CAPACITY);
        hist.push(Xid(0));
        assert_eq!(hist.most_recent(), Some(Xid(0)));
    }

    #[test]
    fn grab_table_refcounts_acquire_and_release() {
        let mut grabs = GrabTable::default();
        assert!(grabs.acquire(38, 0)); // first ref -> actually grab
        assert!(!grabs.acquire(38, 0)); // second ref -> already grabbed
        assert!(!grabs.release(38, 0)); // still one ref left
        assert!(grabs.release(38, 0)); // last ref -> actually ungrab
    }
}
