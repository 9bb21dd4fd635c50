//! Display backend abstraction
//!
//! The drag engine and the window locator talk to the X server only through
//! [`DisplayConnection`]. The production implementation wraps an x11rb
//! `RustConnection`; tests drive the engine with an in-memory display.

mod x11;

#[cfg(test)]
pub(crate) mod fake;

pub use x11::X11Connection;

use x11rb::errors::{ConnectError, ConnectionError, ReplyError, ReplyOrIdError};
use x11rb::protocol::xproto::{Atom, Timestamp, Window};

/// Errors reported by a display backend
#[derive(Debug, thiserror::Error)]
pub enum DisplayError {
    #[error("failed to connect to the X server: {0}")]
    Connect(#[from] ConnectError),
    #[error("X connection error: {0}")]
    Connection(#[from] ConnectionError),
    #[error("X request failed: {0}")]
    Reply(#[from] ReplyError),
    #[error("X request or id allocation failed: {0}")]
    ReplyOrId(#[from] ReplyOrIdError),
}

/// A window property as returned by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    /// Type atom of the stored value
    pub type_: Atom,
    /// 8, 16 or 32
    pub format: u8,
    /// Raw value bytes in native byte order
    pub value: Vec<u8>,
}

impl Property {
    /// Interpret the value as a list of 32-bit items
    pub fn value32(&self) -> Option<Vec<u32>> {
        if self.format != 32 {
            return None;
        }
        Some(
            self.value
                .chunks_exact(4)
                .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        )
    }
}

/// A 32-bit format client message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientMessage {
    /// Window the message is about (and delivered to)
    pub window: Window,
    /// Message type atom
    pub type_: Atom,
    pub data: [u32; 5],
}

/// A ConvertSelection request forwarded to us as selection owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionRequest {
    pub time: Timestamp,
    pub requestor: Window,
    pub selection: Atom,
    pub target: Atom,
    pub property: Atom,
}

/// Events the drag engine cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    ClientMessage(ClientMessage),
    SelectionRequest(SelectionRequest),
    /// Anything else; drained and ignored
    Other,
}

/// Pointer position in root coordinates plus the button/modifier mask
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointerState {
    pub x: i16,
    pub y: i16,
    pub mask: u16,
}

impl PointerState {
    /// Core protocol Button1 bit of the key/button mask
    pub const BUTTON1: u16 = 1 << 8;

    /// Whether the primary button is held down
    pub fn primary_down(&self) -> bool {
        self.mask & Self::BUTTON1 != 0
    }
}

/// Operations the drag engine and locator need from a display connection
pub trait DisplayConnection {
    /// Root window of the default screen
    fn root(&self) -> Window;

    /// Intern all `names` in a single round trip batch.
    ///
    /// Either every atom is returned, in order, or the call fails.
    fn intern_atoms(&self, names: &[&str]) -> Result<Vec<Atom>, DisplayError>;

    /// Reverse lookup of an atom's name
    fn atom_name(&self, atom: Atom) -> Result<String, DisplayError>;

    /// Create a never-mapped, input-only window used as message endpoint
    fn create_proxy_window(&self) -> Result<Window, DisplayError>;

    fn destroy_window(&self, window: Window) -> Result<(), DisplayError>;

    /// Direct children of `window`, bottom-most first
    fn children(&self, window: Window) -> Result<Vec<Window>, DisplayError>;

    /// Child of `window` containing the root coordinates `(x, y)`, if any
    fn child_at(&self, window: Window, x: i16, y: i16) -> Result<Option<Window>, DisplayError>;

    /// Read a property; `None` when the property is not set.
    ///
    /// `type_` of `AtomEnum::ANY` accepts any type.
    fn read_property(
        &self,
        window: Window,
        property: Atom,
        type_: Atom,
    ) -> Result<Option<Property>, DisplayError>;

    fn write_property32(
        &self,
        window: Window,
        property: Atom,
        type_: Atom,
        data: &[u32],
    ) -> Result<(), DisplayError>;

    fn write_property8(
        &self,
        window: Window,
        property: Atom,
        type_: Atom,
        data: &[u8],
    ) -> Result<(), DisplayError>;

    fn delete_property(&self, window: Window, property: Atom) -> Result<(), DisplayError>;

    fn set_selection_owner(&self, owner: Window, selection: Atom) -> Result<(), DisplayError>;

    /// Send a client message to `message.window` with an empty event mask
    fn send_client_message(&self, message: ClientMessage) -> Result<(), DisplayError>;

    /// Answer a selection request; a `property` of `NONE` is a refusal
    fn send_selection_notify(
        &self,
        request: &SelectionRequest,
        property: Atom,
    ) -> Result<(), DisplayError>;

    fn query_pointer(&self) -> Result<PointerState, DisplayError>;

    /// Non-blocking: return the next queued event, if any
    fn poll_event(&self) -> Result<Option<DisplayEvent>, DisplayError>;

    /// Send every buffered request. Other methods may leave requests
    /// buffered; callers flush once per batch.
    fn flush(&self) -> Result<(), DisplayError>;
}
