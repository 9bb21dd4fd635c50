//! Atom table - the fixed XDND vocabulary, interned once per connection

use x11rb::errors::ConnectionError;
use x11rb::protocol::xproto::Atom;

use crate::backend::{DisplayConnection, DisplayError};
use crate::error::{DragError, Result};

/// MIME type used for file transfers
pub const URI_LIST: &str = "text/uri-list";

/// MIME types a drag may offer
pub const MIME_TYPES: &[&str] = &[
    URI_LIST,
    "text/plain",
    "text/plain;charset=utf-8",
    "UTF8_STRING",
    "audio/midi",
    "audio/x-midi",
    "application/octet-stream",
];

const PROTOCOL_NAMES: [&str; 11] = [
    "XdndAware",
    "XdndSelection",
    "XdndEnter",
    "XdndPosition",
    "XdndStatus",
    "XdndLeave",
    "XdndDrop",
    "XdndFinished",
    "XdndTypeList",
    "XdndActionCopy",
    "TARGETS",
];

/// Cached protocol and MIME atoms
#[derive(Debug, Clone)]
pub struct AtomTable {
    pub xdnd_aware: Atom,
    pub xdnd_selection: Atom,
    pub xdnd_enter: Atom,
    pub xdnd_position: Atom,
    pub xdnd_status: Atom,
    pub xdnd_leave: Atom,
    pub xdnd_drop: Atom,
    pub xdnd_finished: Atom,
    pub xdnd_type_list: Atom,
    pub xdnd_action_copy: Atom,
    pub targets: Atom,
    mime: Vec<(&'static str, Atom)>,
}

impl AtomTable {
    /// Intern the whole vocabulary in one batch.
    ///
    /// There is no partial table: if any name fails, construction fails.
    pub fn intern<C: DisplayConnection + ?Sized>(conn: &C) -> Result<Self> {
        let names: Vec<&str> = PROTOCOL_NAMES
            .iter()
            .chain(MIME_TYPES.iter())
            .copied()
            .collect();

        let mut atoms = conn.intern_atoms(&names).map_err(DragError::InternAtoms)?;
        let mime_atoms = if atoms.len() == names.len() {
            atoms.split_off(PROTOCOL_NAMES.len())
        } else {
            return Err(incomplete());
        };

        let Ok(
            [
                xdnd_aware,
                xdnd_selection,
                xdnd_enter,
                xdnd_position,
                xdnd_status,
                xdnd_leave,
                xdnd_drop,
                xdnd_finished,
                xdnd_type_list,
                xdnd_action_copy,
                targets,
            ],
        ) = <[Atom; PROTOCOL_NAMES.len()]>::try_from(atoms)
        else {
            return Err(incomplete());
        };

        let mime = MIME_TYPES.iter().copied().zip(mime_atoms).collect();

        Ok(Self {
            xdnd_aware,
            xdnd_selection,
            xdnd_enter,
            xdnd_position,
            xdnd_status,
            xdnd_leave,
            xdnd_drop,
            xdnd_finished,
            xdnd_type_list,
            xdnd_action_copy,
            targets,
            mime,
        })
    }

    /// Atom of a supported MIME type, or `NONE` if the type is not offerable
    pub fn mime_atom(&self, mime: &str) -> Atom {
        self.mime
            .iter()
            .find(|(name, _)| *name == mime)
            .map(|(_, atom)| *atom)
            .unwrap_or(x11rb::NONE)
    }

    /// Reverse of [`mime_atom`](Self::mime_atom) for the cached MIME types
    pub fn mime_name(&self, atom: Atom) -> Option<&'static str> {
        self.mime
            .iter()
            .find(|(_, a)| *a == atom)
            .map(|(name, _)| *name)
    }

    /// Name of any atom, for diagnostics. Never fails.
    pub fn atom_name<C: DisplayConnection + ?Sized>(&self, conn: &C, atom: Atom) -> String {
        if let Some(name) = self.mime_name(atom) {
            return name.to_string();
        }
        match conn.atom_name(atom) {
            Ok(name) => name,
            Err(_) => format!("<atom {atom}>"),
        }
    }
}

fn incomplete() -> DragError {
    DragError::InternAtoms(DisplayError::Connection(ConnectionError::UnknownError))
}
