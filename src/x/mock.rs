//! A scripted, in-memory [XConn] for exercising the state engine and
//! dispatcher without a live X server.
//!
//! Grounded on the teacher's `x::mock::MockXConn` (a blanket struct
//! recording calls and replaying canned responses) generalised with a
//! pending event queue so integration tests can drive scenarios
//! deterministically.
use super::event::XEvent;
use super::{ClientConfig, Prop, WinType, WmState};
use crate::geometry::{Point, Rect};
use crate::window::WindowAttributes;
use crate::{Error, Result, Xid};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

/// A log entry recorded for every mutating call, so tests can assert on
/// the exact sequence of operations a scenario produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Map(Xid),
    Unmap(Xid),
    Destroy(Xid),
    Configure(Xid, ClientConfig),
    Reparent(Xid, Xid, Point),
    SetInputFocus(Xid),
    SendClientMessage(super::event::ClientMessage),
    ChangeSaveSet(Xid, bool),
    SetWmState(Xid, WmState),
}

#[derive(Debug, Default)]
struct Inner {
    next_id: u32,
    geometry: HashMap<Xid, Rect>,
    attrs: HashMap<Xid, WindowAttributes>,
    properties: HashMap<(Xid, String), Prop>,
    wm_state: HashMap<Xid, WmState>,
    atoms: HashMap<String, Xid>,
    atom_names: HashMap<Xid, String>,
    events: VecDeque<XEvent>,
    calls: Vec<Call>,
    outputs: Vec<Rect>,
    tree: Vec<Xid>,
    cursor: Point,
    selections: HashMap<Xid, Xid>,
    error_count: u64,
}

/// A single-screen, fully in-process stand-in for a real X connection.
#[derive(Debug)]
pub struct StubXConn {
    inner: RefCell<Inner>,
    root: Xid,
}

impl StubXConn {
    pub fn new() -> Self {
        let root = Xid(1);
        let mut inner = Inner {
            next_id: 2,
            ..Default::default()
        };
        inner.outputs.push(Rect::new(0, 0, 1920, 1080));
        Self {
            inner: RefCell::new(inner),
            root,
        }
    }

    /// Pre-seed a window as already existing on the server (e.g. to model
    /// adoption of a pre-existing client at WM startup).
    pub fn seed_window(&self, r: Rect, attrs: WindowAttributes) -> Xid {
        let mut inner = self.inner.borrow_mut();
        let id = Xid(inner.next_id);
        inner.next_id += 1;
        inner.geometry.insert(id, r);
        inner.attrs.insert(id, attrs);
        inner.tree.push(id);
        id
    }

    /// Queue an event to be returned by the next [XConn::poll_event] call.
    pub fn push_event(&self, event: XEvent) {
        self.inner.borrow_mut().events.push_back(event);
    }

    /// The calls recorded so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.inner.borrow().calls.clone()
    }

    pub fn geometry_of(&self, id: Xid) -> Option<Rect> {
        self.inner.borrow().geometry.get(&id).copied()
    }

    pub fn set_outputs(&self, outputs: Vec<Rect>) {
        self.inner.borrow_mut().outputs = outputs;
    }
}

impl Default for StubXConn {
    fn default() -> Self {
        Self::new()
    }
}

impl super::XConn for StubXConn {
    fn root(&self, _screen: usize) -> Xid {
        self.root
    }

    fn screen_details(&self, _screen: usize) -> Result<Vec<Rect>> {
        Ok(self.inner.borrow().outputs.clone())
    }

    fn cursor_position(&self) -> Result<Point> {
        Ok(self.inner.borrow().cursor)
    }

    fn poll_event(&self) -> Result<Option<XEvent>> {
        Ok(self.inner.borrow_mut().events.pop_front())
    }

    fn flush(&self) {}

    fn intern_atom(&self, name: &str) -> Result<Xid> {
        let mut inner = self.inner.borrow_mut();
        if let Some(id) = inner.atoms.get(name) {
            return Ok(*id);
        }
        let id = Xid(inner.next_id);
        inner.next_id += 1;
        inner.atoms.insert(name.to_string(), id);
        inner.atom_names.insert(id, name.to_string());
        Ok(id)
    }

    fn atom_name(&self, atom: Xid) -> Result<String> {
        self.inner
            .borrow()
            .atom_names
            .get(&atom)
            .cloned()
            .ok_or(Error::OpenDisplay)
    }

    fn get_geometry(&self, id: Xid) -> Result<Rect> {
        Ok(self.inner.borrow().geometry.get(&id).copied().unwrap_or_default())
    }

    fn get_window_attributes(&self, id: Xid) -> Result<WindowAttributes> {
        Ok(self.inner.borrow().attrs.get(&id).copied().unwrap_or_default())
    }

    fn query_tree(&self, _root: Xid) -> Result<Vec<Xid>> {
        Ok(self.inner.borrow().tree.clone())
    }

    fn get_property(&self, id: Xid, name: &str) -> Result<Option<Prop>> {
        Ok(self.inner.borrow().properties.get(&(id, name.to_string())).cloned())
    }

    fn set_property(&self, id: Xid, name: &str, value: Prop) -> Result<()> {
        self.inner.borrow_mut().properties.insert((id, name.to_string()), value);
        Ok(())
    }

    fn delete_property(&self, id: Xid, name: &str) -> Result<()> {
        self.inner.borrow_mut().properties.remove(&(id, name.to_string()));
        Ok(())
    }

    fn get_wm_state(&self, id: Xid) -> Result<Option<WmState>> {
        Ok(self.inner.borrow().wm_state.get(&id).copied())
    }

    fn set_wm_state(&self, id: Xid, state: WmState) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        inner.wm_state.insert(id, state);
        inner.calls.push(Call::SetWmState(id, state));
        Ok(())
    }

    fn map(&self, id: Xid) -> Result<()> {
        if let Some(a) = self.inner.borrow_mut().attrs.get_mut(&id) {
            a.mapped = true;
        }
        self.inner.borrow_mut().calls.push(Call::Map(id));
        Ok(())
    }

    fn unmap(&self, id: Xid) -> Result<()> {
        if let Some(a) = self.inner.borrow_mut().attrs.get_mut(&id) {
            a.mapped = false;
        }
        self.inner.borrow_mut().calls.push(Call::Unmap(id));
        Ok(())
    }

    fn destroy(&self, id: Xid) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        inner.tree.retain(|w| *w != id);
        inner.calls.push(Call::Destroy(id));
        Ok(())
    }

    fn create_window(&self, _parent: Xid, r: Rect, _win_type: WinType) -> Result<Xid> {
        let mut inner = self.inner.borrow_mut();
        let id = Xid(inner.next_id);
        inner.next_id += 1;
        inner.geometry.insert(id, r);
        inner.attrs.insert(id, WindowAttributes::default());
        inner.tree.push(id);
        Ok(id)
    }

    fn reparent(&self, id: Xid, new_parent: Xid, p: Point) -> Result<()> {
        self.inner.borrow_mut().calls.push(Call::Reparent(id, new_parent, p));
        Ok(())
    }

    fn configure_window(&self, id: Xid, cfg: ClientConfig) -> Result<()> {
        self.inner.borrow_mut().geometry.insert(id, cfg.r);
        self.inner.borrow_mut().calls.push(Call::Configure(id, cfg));
        Ok(())
    }

    fn send_synthetic_configure_notify(&self, _id: Xid, _r: Rect) -> Result<()> {
        Ok(())
    }

    fn change_save_set(&self, id: Xid, add: bool) -> Result<()> {
        self.inner.borrow_mut().calls.push(Call::ChangeSaveSet(id, add));
        Ok(())
    }

    fn set_input_focus(&self, id: Xid) -> Result<()> {
        self.inner.borrow_mut().calls.push(Call::SetInputFocus(id));
        Ok(())
    }

    fn send_client_message(&self, msg: super::event::ClientMessage) -> Result<()> {
        self.inner.borrow_mut().calls.push(Call::SendClientMessage(msg));
        Ok(())
    }

    fn grab_button(&self, _id: Xid, _button: Option<u8>, _mods: u16) -> Result<()> {
        Ok(())
    }

    fn grab_key(&self, _id: Xid, _code: u8, _mods: u16) -> Result<()> {
        Ok(())
    }

    fn ungrab_all(&self, _id: Xid) -> Result<()> {
        Ok(())
    }

    fn grab_server(&self) -> Result<()> {
        Ok(())
    }

    fn ungrab_server(&self) -> Result<()> {
        Ok(())
    }

    fn acquire_selection(&self, selection: Xid, owner: Xid, _timestamp: u32) -> Result<Option<Xid>> {
        let mut inner = self.inner.borrow_mut();
        let prev = inner.selections.insert(selection, owner);
        Ok(prev)
    }

    fn composite_redirect_subwindows(&self, _id: Xid) -> Result<()> {
        Ok(())
    }

    fn sync_create_alarm(&self, _counter: Xid, _trigger_value: i64) -> Result<Xid> {
        let mut inner = self.inner.borrow_mut();
        let id = Xid(inner.next_id);
        inner.next_id += 1;
        Ok(id)
    }

    fn sync_get_counter_value(&self, _counter: Xid) -> Result<i64> {
        Ok(0)
    }

    fn error_count(&self) -> u64 {
        self.inner.borrow().error_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::x::XConn;

    #[test]
    fn map_records_call_and_flips_attrs() {
        let conn = StubXConn::new();
        let id = conn.seed_window(Rect::new(0, 0, 100, 100), WindowAttributes::default());
        conn.map(id).unwrap();
        assert!(conn.get_window_attributes(id).unwrap().mapped);
        assert_eq!(conn.calls(), vec![Call::Map(id)]);
    }

    #[test]
    fn intern_atom_is_idempotent() {
        let conn = StubXConn::new();
        let a = conn.intern_atom("_NET_WM_STATE").unwrap();
        let b = conn.intern_atom("_NET_WM_STATE").unwrap();
        assert_eq!(a, b);
        assert_eq!(conn.atom_name(a).unwrap(), "_NET_WM_STATE");
    }

    #[test]
    fn queued_events_drain_in_fifo_order() {
        let conn = StubXConn::new();
        conn.push_event(XEvent::MappingNotify);
        conn.push_event(XEvent::RandrNotify);
        assert_eq!(conn.poll_event().unwrap(), Some(XEvent::MappingNotify));
        assert_eq!(conn.poll_event().unwrap(), Some(XEvent::RandrNotify));
        assert_eq!(conn.poll_event().unwrap(), None);
    }
}
