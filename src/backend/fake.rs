//! In-memory display used by the unit tests

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use x11rb::protocol::xproto::{Atom, AtomEnum, Window};

use super::{
    ClientMessage, DisplayConnection, DisplayError, DisplayEvent, PointerState, Property,
    SelectionRequest,
};

pub const ROOT: Window = 1;

#[derive(Debug, Clone, Copy)]
struct Rect {
    x: i16,
    y: i16,
    width: i16,
    height: i16,
}

impl Rect {
    fn contains(&self, x: i16, y: i16) -> bool {
        x >= self.x && y >= self.y && x < self.x + self.width && y < self.y + self.height
    }
}

#[derive(Default)]
struct State {
    atoms: HashMap<String, Atom>,
    next_atom: Atom,
    fail_intern: Option<String>,
    geometry: HashMap<Window, Rect>,
    children: HashMap<Window, Vec<Window>>,
    properties: HashMap<(Window, Atom), Property>,
    failing_reads: HashSet<Window>,
    failing_writes: HashSet<Window>,
    next_window: Window,
    destroyed: Vec<Window>,
    selection_owners: HashMap<Atom, Window>,
    sent: Vec<ClientMessage>,
    notifications: Vec<(SelectionRequest, Atom)>,
    events: VecDeque<DisplayEvent>,
    pointer: PointerState,
    flushes: usize,
}

/// A scriptable display: a window tree with absolute geometry, properties,
/// and recorders for everything the engine sends.
pub struct FakeDisplay {
    state: Mutex<State>,
}

impl FakeDisplay {
    pub fn new() -> Self {
        let mut state = State {
            next_atom: 100,
            next_window: 0x100,
            ..State::default()
        };
        state.geometry.insert(
            ROOT,
            Rect {
                x: 0,
                y: 0,
                width: 1920,
                height: 1080,
            },
        );
        state.children.insert(ROOT, Vec::new());
        Self {
            state: Mutex::new(state),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Make interning `name` fail
    pub fn fail_intern(&self, name: &str) {
        self.state().fail_intern = Some(name.to_string());
    }

    /// Atom assigned to `name`, interning it if needed
    pub fn atom(&self, name: &str) -> Atom {
        let mut state = self.state();
        intern(&mut state, name)
    }

    /// Add `window` on top of `parent`'s children, with absolute geometry
    pub fn add_window(&self, parent: Window, window: Window, x: i16, y: i16, width: i16, height: i16) {
        let mut state = self.state();
        state.geometry.insert(
            window,
            Rect {
                x,
                y,
                width,
                height,
            },
        );
        state.children.entry(window).or_default();
        state.children.entry(parent).or_default().push(window);
    }

    /// Mark `window` as XDND aware with the given protocol version
    pub fn set_aware(&self, window: Window, version: u32) {
        let aware = self.atom("XdndAware");
        self.set_property32(window, aware, AtomEnum::ATOM.into(), &[version]);
    }

    pub fn set_property32(&self, window: Window, property: Atom, type_: Atom, data: &[u32]) {
        let value = data.iter().flat_map(|v| v.to_ne_bytes()).collect();
        self.state().properties.insert(
            (window, property),
            Property {
                type_,
                format: 32,
                value,
            },
        );
    }

    pub fn set_property8(&self, window: Window, property: Atom, type_: Atom, data: &[u8]) {
        self.state().properties.insert(
            (window, property),
            Property {
                type_,
                format: 8,
                value: data.to_vec(),
            },
        );
    }

    pub fn property(&self, window: Window, property: Atom) -> Option<Property> {
        self.state().properties.get(&(window, property)).cloned()
    }

    /// Make every property read on `window` fail
    pub fn fail_reads(&self, window: Window) {
        self.state().failing_reads.insert(window);
    }

    /// Make property writes on `window` fail like an oversized request
    pub fn fail_writes(&self, window: Window) {
        self.state().failing_writes.insert(window);
    }

    pub fn set_pointer(&self, x: i16, y: i16, mask: u16) {
        self.state().pointer = PointerState { x, y, mask };
    }

    pub fn push_event(&self, event: DisplayEvent) {
        self.state().events.push_back(event);
    }

    /// Client messages sent so far
    pub fn sent(&self) -> Vec<ClientMessage> {
        self.state().sent.clone()
    }

    /// Types of the client messages sent so far, by atom name
    pub fn sent_names(&self) -> Vec<String> {
        let state = self.state();
        state
            .sent
            .iter()
            .map(|msg| name_of(&state, msg.type_))
            .collect()
    }

    pub fn clear_sent(&self) {
        self.state().sent.clear();
    }

    pub fn notifications(&self) -> Vec<(SelectionRequest, Atom)> {
        self.state().notifications.clone()
    }

    pub fn selection_owner(&self, selection: Atom) -> Option<Window> {
        self.state().selection_owners.get(&selection).copied()
    }

    pub fn flushes(&self) -> usize {
        self.state().flushes
    }

    pub fn destroyed(&self) -> Vec<Window> {
        self.state().destroyed.clone()
    }
}

impl FakeDisplay {
    fn check_write(&self, window: Window) -> Result<(), DisplayError> {
        if self.state().failing_writes.contains(&window) {
            return Err(x11rb::errors::ConnectionError::MaximumRequestLengthExceeded.into());
        }
        Ok(())
    }
}

fn intern(state: &mut State, name: &str) -> Atom {
    if let Some(atom) = state.atoms.get(name) {
        return *atom;
    }
    let atom = state.next_atom;
    state.next_atom += 1;
    state.atoms.insert(name.to_string(), atom);
    atom
}

fn name_of(state: &State, atom: Atom) -> String {
    state
        .atoms
        .iter()
        .find(|(_, a)| **a == atom)
        .map(|(name, _)| name.clone())
        .unwrap_or_else(|| format!("#{atom}"))
}

fn request_failed() -> DisplayError {
    DisplayError::Connection(x11rb::errors::ConnectionError::UnknownError)
}

impl DisplayConnection for FakeDisplay {
    fn root(&self) -> Window {
        ROOT
    }

    fn intern_atoms(&self, names: &[&str]) -> Result<Vec<Atom>, DisplayError> {
        let mut state = self.state();
        if let Some(failing) = &state.fail_intern {
            if names.contains(&failing.as_str()) {
                return Err(request_failed());
            }
        }
        Ok(names.iter().map(|name| intern(&mut state, name)).collect())
    }

    fn atom_name(&self, atom: Atom) -> Result<String, DisplayError> {
        let state = self.state();
        state
            .atoms
            .iter()
            .find(|(_, a)| **a == atom)
            .map(|(name, _)| name.clone())
            .ok_or_else(request_failed)
    }

    fn create_proxy_window(&self) -> Result<Window, DisplayError> {
        let mut state = self.state();
        let window = state.next_window;
        state.next_window += 1;
        Ok(window)
    }

    fn destroy_window(&self, window: Window) -> Result<(), DisplayError> {
        self.state().destroyed.push(window);
        Ok(())
    }

    fn children(&self, window: Window) -> Result<Vec<Window>, DisplayError> {
        Ok(self
            .state()
            .children
            .get(&window)
            .cloned()
            .unwrap_or_default())
    }

    fn child_at(&self, window: Window, x: i16, y: i16) -> Result<Option<Window>, DisplayError> {
        let state = self.state();
        let children = state.children.get(&window).ok_or_else(request_failed)?;
        // Topmost child is last in stacking order
        Ok(children
            .iter()
            .rev()
            .find(|child| {
                state
                    .geometry
                    .get(child)
                    .is_some_and(|rect| rect.contains(x, y))
            })
            .copied())
    }

    fn read_property(
        &self,
        window: Window,
        property: Atom,
        type_: Atom,
    ) -> Result<Option<Property>, DisplayError> {
        let state = self.state();
        if state.failing_reads.contains(&window) {
            return Err(request_failed());
        }
        let any: Atom = AtomEnum::ANY.into();
        Ok(state
            .properties
            .get(&(window, property))
            .filter(|prop| type_ == any || prop.type_ == type_)
            .cloned())
    }

    fn write_property32(
        &self,
        window: Window,
        property: Atom,
        type_: Atom,
        data: &[u32],
    ) -> Result<(), DisplayError> {
        self.check_write(window)?;
        self.set_property32(window, property, type_, data);
        Ok(())
    }

    fn write_property8(
        &self,
        window: Window,
        property: Atom,
        type_: Atom,
        data: &[u8],
    ) -> Result<(), DisplayError> {
        self.check_write(window)?;
        self.set_property8(window, property, type_, data);
        Ok(())
    }

    fn delete_property(&self, window: Window, property: Atom) -> Result<(), DisplayError> {
        self.state().properties.remove(&(window, property));
        Ok(())
    }

    fn set_selection_owner(&self, owner: Window, selection: Atom) -> Result<(), DisplayError> {
        self.state().selection_owners.insert(selection, owner);
        Ok(())
    }

    fn send_client_message(&self, message: ClientMessage) -> Result<(), DisplayError> {
        self.state().sent.push(message);
        Ok(())
    }

    fn send_selection_notify(
        &self,
        request: &SelectionRequest,
        property: Atom,
    ) -> Result<(), DisplayError> {
        self.state().notifications.push((*request, property));
        Ok(())
    }

    fn query_pointer(&self) -> Result<PointerState, DisplayError> {
        Ok(self.state().pointer)
    }

    fn poll_event(&self) -> Result<Option<DisplayEvent>, DisplayError> {
        Ok(self.state().events.pop_front())
    }

    fn flush(&self) -> Result<(), DisplayError> {
        self.state().flushes += 1;
        Ok(())
    }
}
