//! Window locator - find the host application's top-level window by title
//!
//! Runs once at startup, on its own connection, so it never interferes with
//! the event stream of the drag engine.

use x11rb::errors::ConnectionError;
use x11rb::protocol::xproto::{Atom, AtomEnum, Window};

use crate::backend::{DisplayConnection, DisplayError, X11Connection};
use crate::error::{DragError, Result};

/// Looks windows up by their title
pub struct WindowLocator<C = X11Connection> {
    conn: C,
}

impl WindowLocator<X11Connection> {
    /// Open a dedicated connection for the lookup
    pub fn connect(display: Option<&str>) -> Result<Self> {
        Ok(Self::new(X11Connection::connect(display)?))
    }
}

impl<C: DisplayConnection> WindowLocator<C> {
    pub fn new(conn: C) -> Self {
        Self { conn }
    }

    pub fn find_window_by_title(&self, title: &str) -> Result<Window> {
        find_window_by_title(&self.conn, title)
    }
}

struct TitleAtoms {
    net_wm_name: Atom,
    utf8_string: Atom,
}

/// Walk the window tree from the root and return the first window whose
/// `_NET_WM_NAME` or `WM_NAME` equals `title`.
///
/// Windows whose properties cannot be read are skipped, but their children
/// are still searched.
pub fn find_window_by_title<C: DisplayConnection + ?Sized>(conn: &C, title: &str) -> Result<Window> {
    let atoms = conn
        .intern_atoms(&["_NET_WM_NAME", "UTF8_STRING"])
        .map_err(DragError::InternAtoms)?;
    let [net_wm_name, utf8_string] = atoms[..] else {
        return Err(DragError::InternAtoms(DisplayError::Connection(
            ConnectionError::UnknownError,
        )));
    };
    let atoms = TitleAtoms {
        net_wm_name,
        utf8_string,
    };

    let mut stack = vec![conn.root()];
    let mut visited = 0usize;

    while let Some(window) = stack.pop() {
        visited += 1;

        match title_matches(conn, &atoms, window, title) {
            Ok(true) => {
                tracing::debug!(window, visited, title, "Located application window");
                return Ok(window);
            }
            Ok(false) => {}
            Err(e) => tracing::trace!(window, "Skipping window with unreadable title: {}", e),
        }

        match conn.children(window) {
            // Reversed so the first child is searched first
            Ok(children) => stack.extend(children.into_iter().rev()),
            Err(e) => tracing::trace!(window, "Failed to list children: {}", e),
        }
    }

    tracing::debug!(visited, title, "No window with matching title");
    Err(DragError::WindowNotFound(title.to_string()))
}

fn title_matches<C: DisplayConnection + ?Sized>(
    conn: &C,
    atoms: &TitleAtoms,
    window: Window,
    title: &str,
) -> std::result::Result<bool, DisplayError> {
    // Try _NET_WM_NAME first (UTF-8)
    if let Some(prop) = conn.read_property(window, atoms.net_wm_name, atoms.utf8_string)? {
        if prop.value == title.as_bytes() {
            return Ok(true);
        }
    }

    // Fall back to WM_NAME
    if let Some(prop) = conn.read_property(window, AtomEnum::WM_NAME.into(), AtomEnum::STRING.into())? {
        if prop.value == title.as_bytes() {
            return Ok(true);
        }
    }

    Ok(false)
}
