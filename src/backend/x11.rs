//! X11 display backend using x11rb

use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::protocol::xproto::{
    self, Atom, ConnectionExt, CreateWindowAux, EventMask, PropMode, Window, WindowClass,
};
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as WrapperConnectionExt;

use super::{
    ClientMessage, DisplayConnection, DisplayError, DisplayEvent, PointerState, Property,
    SelectionRequest,
};

/// A dedicated connection to the X server
pub struct X11Connection {
    conn: RustConnection,
    root: Window,
}

impl X11Connection {
    /// Open a new connection; `display` of `None` uses `$DISPLAY`
    pub fn connect(display: Option<&str>) -> Result<Self, DisplayError> {
        let (conn, screen_num) = RustConnection::connect(display)?;
        let screen = &conn.setup().roots[screen_num];
        let root = screen.root;

        tracing::debug!(screen = screen_num, root, "Connected to X server");

        Ok(Self { conn, root })
    }
}

impl DisplayConnection for X11Connection {
    fn root(&self) -> Window {
        self.root
    }

    fn intern_atoms(&self, names: &[&str]) -> Result<Vec<Atom>, DisplayError> {
        // Send every request before waiting on the first reply
        let cookies = names
            .iter()
            .map(|name| self.conn.intern_atom(false, name.as_bytes()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut atoms = Vec::with_capacity(cookies.len());
        for cookie in cookies {
            atoms.push(cookie.reply()?.atom);
        }
        Ok(atoms)
    }

    fn atom_name(&self, atom: Atom) -> Result<String, DisplayError> {
        let reply = self.conn.get_atom_name(atom)?.reply()?;
        Ok(String::from_utf8_lossy(&reply.name).into_owned())
    }

    fn create_proxy_window(&self) -> Result<Window, DisplayError> {
        let window = self.conn.generate_id()?;
        self.conn.create_window(
            x11rb::COPY_DEPTH_FROM_PARENT,
            window,
            self.root,
            -100,
            -100,
            1,
            1,
            0,
            WindowClass::INPUT_ONLY,
            x11rb::COPY_FROM_PARENT,
            &CreateWindowAux::new()
                .override_redirect(1)
                .event_mask(EventMask::PROPERTY_CHANGE),
        )?;
        Ok(window)
    }

    fn destroy_window(&self, window: Window) -> Result<(), DisplayError> {
        self.conn.destroy_window(window)?;
        Ok(())
    }

    fn children(&self, window: Window) -> Result<Vec<Window>, DisplayError> {
        Ok(self.conn.query_tree(window)?.reply()?.children)
    }

    fn child_at(&self, window: Window, x: i16, y: i16) -> Result<Option<Window>, DisplayError> {
        let reply = self
            .conn
            .translate_coordinates(self.root, window, x, y)?
            .reply()?;

        if reply.child == x11rb::NONE {
            Ok(None)
        } else {
            Ok(Some(reply.child))
        }
    }

    fn read_property(
        &self,
        window: Window,
        property: Atom,
        type_: Atom,
    ) -> Result<Option<Property>, DisplayError> {
        let reply = self
            .conn
            .get_property(false, window, property, type_, 0, u32::MAX)?
            .reply()?;

        if reply.type_ == x11rb::NONE || reply.value.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Property {
                type_: reply.type_,
                format: reply.format,
                value: reply.value,
            }))
        }
    }

    fn write_property32(
        &self,
        window: Window,
        property: Atom,
        type_: Atom,
        data: &[u32],
    ) -> Result<(), DisplayError> {
        self.conn
            .change_property32(PropMode::REPLACE, window, property, type_, data)?;
        Ok(())
    }

    fn write_property8(
        &self,
        window: Window,
        property: Atom,
        type_: Atom,
        data: &[u8],
    ) -> Result<(), DisplayError> {
        self.conn
            .change_property8(PropMode::REPLACE, window, property, type_, data)?;
        Ok(())
    }

    fn delete_property(&self, window: Window, property: Atom) -> Result<(), DisplayError> {
        self.conn.delete_property(window, property)?;
        Ok(())
    }

    fn set_selection_owner(&self, owner: Window, selection: Atom) -> Result<(), DisplayError> {
        self.conn
            .set_selection_owner(owner, selection, x11rb::CURRENT_TIME)?;
        Ok(())
    }

    fn send_client_message(&self, message: ClientMessage) -> Result<(), DisplayError> {
        let event = xproto::ClientMessageEvent::new(32, message.window, message.type_, message.data);

        self.conn
            .send_event(false, message.window, EventMask::NO_EVENT, event)?;
        Ok(())
    }

    fn send_selection_notify(
        &self,
        request: &SelectionRequest,
        property: Atom,
    ) -> Result<(), DisplayError> {
        let event = xproto::SelectionNotifyEvent {
            response_type: xproto::SELECTION_NOTIFY_EVENT,
            sequence: 0,
            time: request.time,
            requestor: request.requestor,
            selection: request.selection,
            target: request.target,
            property,
        };

        self.conn
            .send_event(false, request.requestor, EventMask::NO_EVENT, event)?;
        Ok(())
    }

    fn query_pointer(&self) -> Result<PointerState, DisplayError> {
        let reply = self.conn.query_pointer(self.root)?.reply()?;
        Ok(PointerState {
            x: reply.root_x,
            y: reply.root_y,
            mask: u16::from(reply.mask),
        })
    }

    fn poll_event(&self) -> Result<Option<DisplayEvent>, DisplayError> {
        let Some(event) = self.conn.poll_for_event()? else {
            return Ok(None);
        };

        let event = match event {
            Event::ClientMessage(msg) if msg.format == 32 => {
                DisplayEvent::ClientMessage(ClientMessage {
                    window: msg.window,
                    type_: msg.type_,
                    data: msg.data.as_data32(),
                })
            }
            Event::SelectionRequest(req) => DisplayEvent::SelectionRequest(SelectionRequest {
                time: req.time,
                requestor: req.requestor,
                selection: req.selection,
                target: req.target,
                property: req.property,
            }),
            Event::Error(err) => {
                tracing::debug!(?err, "X error while dragging");
                DisplayEvent::Other
            }
            _ => DisplayEvent::Other,
        };

        Ok(Some(event))
    }

    fn flush(&self) -> Result<(), DisplayError> {
        self.conn.flush()?;
        Ok(())
    }
}
