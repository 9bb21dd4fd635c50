//! Drag source - the XDND protocol engine
//!
//! A [`DragSource`] owns its own X connection and an invisible proxy window.
//! The proxy owns `XdndSelection` during a drag and is the source reported
//! in every outbound message, so targets reply to it and we see the replies
//! on our connection rather than the toolkit's.
//!
//! The host drives everything by polling once per frame:
//!
//! 1. [`DragSource::update_pointer`] (or [`update_mouse_position`]) while
//!    dragging, to hit-test and notify targets;
//! 2. [`DragSource::pump_events`] while a drag is active, including after a
//!    successful [`finish_drag`], to answer selection requests and see
//!    `XdndFinished`.
//!
//! There is no pointer grab and no timeout: a target that never finishes
//! leaves the session Dropped until [`DragSource::close`].
//!
//! [`update_mouse_position`]: DragSource::update_mouse_position
//! [`finish_drag`]: DragSource::finish_drag

pub mod protocol;
pub mod selection;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use x11rb::protocol::xproto::{Atom, AtomEnum, Window};

use crate::backend::{
    ClientMessage, DisplayConnection, DisplayEvent, PointerState, SelectionRequest, X11Connection,
};
use crate::config::DragSourceConfig;
use crate::core::atoms::{AtomTable, URI_LIST};
use crate::core::session::{DragSession, DragState, Target};
use crate::core::uri;
use crate::error::{DragError, Result};
use crate::locator::{self, WindowLocator};

use self::protocol::{Inbound, Outbound, INLINE_TYPES, MIN_XDND_VERSION, XDND_VERSION};

/// Debug-level trace that only fires in verbose mode
macro_rules! verbose {
    ($self:expr, $($arg:tt)+) => {
        if $self.config.verbose {
            tracing::debug!($($arg)+);
        }
    };
}

/// Source side of an XDND drag
pub struct DragSource<C: DisplayConnection = X11Connection> {
    conn: C,
    atoms: AtomTable,
    proxy: Window,
    located_window: Option<Window>,
    config: DragSourceConfig,
    session: Mutex<DragSession>,
    closed: AtomicBool,
}

impl DragSource<X11Connection> {
    /// Connect to the X server and set up the engine.
    ///
    /// When a window title is configured it is located first, on a separate
    /// short-lived connection. Every failure here is fatal.
    pub fn new(config: DragSourceConfig) -> Result<Self> {
        let located_window = match &config.window_title {
            Some(title) => {
                let locator = WindowLocator::connect(config.display.as_deref())?;
                Some(locator.find_window_by_title(title)?)
            }
            None => None,
        };

        let conn = X11Connection::connect(config.display.as_deref())?;
        Self::build(conn, config, located_window)
    }
}

impl<C: DisplayConnection> DragSource<C> {
    /// Set up the engine on an existing connection.
    ///
    /// A configured window title is looked up on `conn` itself.
    pub fn with_connection(conn: C, config: DragSourceConfig) -> Result<Self> {
        let located_window = match &config.window_title {
            Some(title) => Some(locator::find_window_by_title(&conn, title)?),
            None => None,
        };
        Self::build(conn, config, located_window)
    }

    fn build(conn: C, config: DragSourceConfig, located_window: Option<Window>) -> Result<Self> {
        let atoms = AtomTable::intern(&conn)?;
        let proxy = conn.create_proxy_window()?;
        conn.flush()?;

        tracing::info!(proxy, ?located_window, "XDND drag source ready");

        Ok(Self {
            conn,
            atoms,
            proxy,
            located_window,
            config,
            session: Mutex::new(DragSession::default()),
            closed: AtomicBool::new(false),
        })
    }

    fn session(&self) -> MutexGuard<'_, DragSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn connection(&self) -> &C {
        &self.conn
    }

    pub fn config(&self) -> &DragSourceConfig {
        &self.config
    }

    pub fn atoms(&self) -> &AtomTable {
        &self.atoms
    }

    /// The invisible window that owns the selection and receives replies
    pub fn proxy_window(&self) -> Window {
        self.proxy
    }

    /// The host window found by title at construction, if one was configured
    pub fn located_window(&self) -> Option<Window> {
        self.located_window
    }

    pub fn state(&self) -> DragState {
        self.session().state
    }

    pub fn offered_mime_types(&self) -> Vec<String> {
        self.session().mime_types.clone()
    }

    pub fn current_target(&self) -> Option<Window> {
        self.session().target_window()
    }

    pub fn target_accepted(&self) -> bool {
        self.session().target_accepted
    }

    /// Temp file of the last file-based transfer, until it is cleaned up
    pub fn temp_file(&self) -> Option<PathBuf> {
        self.session().temp_file.clone()
    }

    /// Start dragging `data`, offered as `mime_types`
    pub fn start_drag<S: AsRef<str>>(&self, mime_types: &[S], data: Vec<u8>) -> Result<()> {
        let mut session = self.session();
        self.ensure_idle(&session)?;
        self.begin(&mut session, mime_types, data, None)
    }

    /// Start dragging with the payload produced by `producer`.
    ///
    /// The producer only runs if no drag is in progress.
    pub fn start_drag_with<S, F>(&self, mime_types: &[S], producer: F) -> Result<()>
    where
        S: AsRef<str>,
        F: FnOnce() -> Vec<u8>,
    {
        let mut session = self.session();
        self.ensure_idle(&session)?;
        let data = producer();
        self.begin(&mut session, mime_types, data, None)
    }

    /// Start dragging `data` as a file named `filename`.
    ///
    /// The payload is written under the configured temp directory and
    /// `text/uri-list` is always offered first, pointing at that file.
    pub fn start_drag_with_filename<S: AsRef<str>>(
        &self,
        mime_types: &[S],
        data: Vec<u8>,
        filename: &str,
    ) -> Result<()> {
        let mut session = self.session();
        self.ensure_idle(&session)?;
        self.begin(&mut session, mime_types, data, Some(filename))
    }

    fn ensure_idle(&self, session: &DragSession) -> Result<()> {
        if session.is_active() {
            tracing::warn!(state = ?session.state, "Refusing to start a drag while one is in progress");
            return Err(DragError::AlreadyInProgress);
        }
        Ok(())
    }

    fn begin<S: AsRef<str>>(
        &self,
        session: &mut DragSession,
        mime_types: &[S],
        data: Vec<u8>,
        filename: Option<&str>,
    ) -> Result<()> {
        // The previous drag is over, nobody reads its file anymore
        if let Some(stale) = session.temp_file.take() {
            remove_temp_file(&stale);
        }

        let mut offered = self.offerable(mime_types);

        let file_uri = match filename {
            Some(filename) => {
                let path = uri::temp_path(&self.config.temp_dir, filename);
                write_temp_file(&self.config.temp_dir, &path, &data)?;
                session.temp_file = Some(path.clone());

                offered.retain(|mime| mime != URI_LIST);
                offered.insert(0, URI_LIST.to_string());
                Some(uri::file_uri(&path))
            }
            None => None,
        };

        let type_atoms: Vec<Atom> = offered.iter().map(|m| self.atoms.mime_atom(m)).collect();
        if type_atoms.len() > INLINE_TYPES {
            self.conn.write_property32(
                self.proxy,
                self.atoms.xdnd_type_list,
                AtomEnum::ATOM.into(),
                &type_atoms,
            )?;
        } else {
            self.conn
                .delete_property(self.proxy, self.atoms.xdnd_type_list)?;
        }
        self.conn
            .set_selection_owner(self.proxy, self.atoms.xdnd_selection)?;
        self.conn.flush()?;

        verbose!(
            self,
            mime_types = ?offered,
            bytes = data.len(),
            file = ?session.temp_file,
            "Drag started"
        );
        session.begin(offered, data, file_uri);
        Ok(())
    }

    /// Known MIME types in caller order, without duplicates
    fn offerable<S: AsRef<str>>(&self, mime_types: &[S]) -> Vec<String> {
        let mut offered: Vec<String> = Vec::with_capacity(mime_types.len());
        for mime in mime_types.iter().map(AsRef::as_ref) {
            if self.atoms.mime_atom(mime) == x11rb::NONE {
                tracing::warn!(mime, "Not offering unsupported MIME type");
            } else if !offered.iter().any(|m| m == mime) {
                offered.push(mime.to_string());
            }
        }
        offered
    }

    fn offered_atoms(&self, session: &DragSession) -> Vec<Atom> {
        session
            .mime_types
            .iter()
            .map(|mime| self.atoms.mime_atom(mime))
            .collect()
    }

    /// Query the pointer without touching the drag
    pub fn pointer(&self) -> Result<PointerState> {
        Ok(self.conn.query_pointer()?)
    }

    /// Query the pointer and feed it to [`update_mouse_position`].
    ///
    /// Returns the pointer state so the host can watch for button release,
    /// or `None` if the query failed.
    ///
    /// [`update_mouse_position`]: Self::update_mouse_position
    pub fn update_pointer(&self) -> Option<PointerState> {
        match self.conn.query_pointer() {
            Ok(pointer) => {
                self.update_mouse_position(pointer.x.into(), pointer.y.into());
                Some(pointer)
            }
            Err(e) => {
                tracing::warn!("Failed to query pointer: {}", e);
                None
            }
        }
    }

    /// Track the pointer at root coordinates `(x, y)`. No-op unless dragging.
    pub fn update_mouse_position(&self, x: i32, y: i32) {
        let mut session = self.session();
        if session.state != DragState::Dragging {
            return;
        }

        let x = protocol::clamp_coordinate(x);
        let y = protocol::clamp_coordinate(y);
        let target = self.find_target(x, y);

        if target.map(|t| t.window) != session.target_window() {
            verbose!(
                self,
                from = ?session.target_window(),
                to = ?target.map(|t| t.window),
                "Drop target changed"
            );

            if let Some(old) = session.target {
                self.send(Outbound::Leave, old.window);
            }
            session.set_target(target);

            if let Some(new) = target {
                let types = self.offered_atoms(&session);
                self.send(
                    Outbound::Enter {
                        version: new.version,
                        types: &types,
                    },
                    new.window,
                );
            }
        }

        if let Some(current) = session.target {
            self.send(
                Outbound::Position {
                    x,
                    y,
                    time: x11rb::CURRENT_TIME,
                },
                current.window,
            );
        }
        self.flush();
    }

    /// Hit test: descend from the root through the windows under `(x, y)`
    /// and keep the deepest one that is XDND aware.
    fn find_target(&self, x: i16, y: i16) -> Option<Target> {
        let mut found = None;
        let mut window = self.conn.root();

        loop {
            let child = match self.conn.child_at(window, x, y) {
                Ok(Some(child)) => child,
                Ok(None) => break,
                Err(e) => {
                    tracing::trace!(window, "Hit test stopped: {}", e);
                    break;
                }
            };

            if let Some(version) = self.xdnd_version(child) {
                found = Some(Target {
                    window: child,
                    version,
                });
            }
            window = child;
        }

        found
    }

    /// Protocol version to use with `window`, or `None` if it is not aware.
    ///
    /// We announce [`XDND_VERSION`] but talk the lower of that and the
    /// version the target advertises, as XDND negotiation requires.
    fn xdnd_version(&self, window: Window) -> Option<u32> {
        let prop = self
            .conn
            .read_property(window, self.atoms.xdnd_aware, AtomEnum::ATOM.into())
            .ok()??;
        let version = *prop.value32()?.first()?;

        if version < MIN_XDND_VERSION {
            verbose!(self, window, version, "Ignoring target with old XDND version");
            return None;
        }
        Some(version.min(XDND_VERSION))
    }

    /// Release the pointer: drop on an accepting target, otherwise abandon.
    ///
    /// Returns the resulting state. After `Dropped` keep pumping events until
    /// the target sends XdndFinished.
    pub fn finish_drag(&self) -> DragState {
        let mut session = self.session();
        if session.state != DragState::Dragging {
            return session.state;
        }

        let accepted = session.target_accepted;
        let target = session.target;
        match target {
            Some(target) if accepted => {
                self.send(
                    Outbound::Drop {
                        time: x11rb::CURRENT_TIME,
                    },
                    target.window,
                );
                session.state = DragState::Dropped;
            }
            other => {
                if let Some(target) = other {
                    self.send(Outbound::Leave, target.window);
                }
                session.reset();
            }
        }

        self.flush();
        verbose!(self, state = ?session.state, "Drag finished");
        session.state
    }

    /// Abandon the drag. No-op unless dragging.
    pub fn cancel_drag(&self) {
        let mut session = self.session();
        if session.state != DragState::Dragging {
            return;
        }

        if let Some(target) = session.target {
            self.send(Outbound::Leave, target.window);
        }
        session.reset();
        self.flush();
        verbose!(self, "Drag cancelled");
    }

    /// Handle every queued event without blocking, then flush the replies
    pub fn pump_events(&self) -> Result<()> {
        while let Some(event) = self.conn.poll_event()? {
            self.handle_event(event);
        }
        self.conn.flush()?;
        Ok(())
    }

    fn handle_event(&self, event: DisplayEvent) {
        match event {
            DisplayEvent::ClientMessage(message) => self.handle_client_message(&message),
            DisplayEvent::SelectionRequest(request) => self.handle_selection_request(&request),
            DisplayEvent::Other => {}
        }
    }

    fn handle_client_message(&self, message: &ClientMessage) {
        let Some(inbound) = Inbound::decode(&self.atoms, message) else {
            verbose!(
                self,
                type_ = %self.atoms.atom_name(&self.conn, message.type_),
                "Ignoring client message"
            );
            return;
        };

        let mut session = self.session();
        match inbound {
            Inbound::Status { target, accepted } => {
                verbose!(self, target, accepted, "Received XdndStatus");
                if session.target_window() == Some(target) {
                    session.target_accepted = accepted;
                } else {
                    tracing::warn!(
                        target,
                        current = ?session.target_window(),
                        "XdndStatus from a window that is not the current target"
                    );
                }
            }
            Inbound::Finished { target } => {
                verbose!(self, target, "Received XdndFinished");
                if session.state == DragState::Dropped {
                    session.reset();
                    verbose!(self, "Drag complete");
                } else {
                    tracing::warn!(state = ?session.state, target, "Unexpected XdndFinished");
                }
            }
        }
    }

    fn handle_selection_request(&self, request: &SelectionRequest) {
        // Served in any state: requests can trail the drop
        let session = self.session();
        match selection::serve(&self.conn, &self.atoms, &session, request) {
            Ok(answer) => verbose!(
                self,
                requestor = request.requestor,
                target = %self.atoms.atom_name(&self.conn, request.target),
                ?answer,
                "Answered selection request"
            ),
            Err(e) => tracing::warn!(
                requestor = request.requestor,
                "Failed to answer selection request: {}",
                e
            ),
        }
    }

    fn flush(&self) {
        if let Err(e) = self.conn.flush() {
            tracing::warn!("Failed to flush X connection: {}", e);
        }
    }

    /// Queue `message` for `target`; the caller flushes
    fn send(&self, message: Outbound<'_>, target: Window) {
        let encoded = message.encode(&self.atoms, self.proxy, target);
        verbose!(self, target, data = ?encoded.data, "Sending {}", message.name());

        if let Err(e) = self.conn.send_client_message(encoded) {
            tracing::warn!(target, "Failed to send {}: {}", message.name(), e);
        }
    }

    /// Tear down: leave any target, remove the temp file, destroy the proxy.
    ///
    /// Safe to call more than once; also run on drop.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let mut session = self.session();
        if session.state == DragState::Dragging {
            if let Some(target) = session.target {
                self.send(Outbound::Leave, target.window);
            }
        }
        session.reset();
        if let Some(path) = session.temp_file.take() {
            remove_temp_file(&path);
        }
        drop(session);

        self.conn.destroy_window(self.proxy)?;
        self.conn.flush()?;
        tracing::debug!(proxy = self.proxy, "XDND drag source closed");
        Ok(())
    }
}

impl<C: DisplayConnection> Drop for DragSource<C> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("Failed to close drag source: {}", e);
        }
    }
}

fn write_temp_file(dir: &Path, path: &Path, data: &[u8]) -> Result<()> {
    let to_error = |source| DragError::TempFile {
        path: path.to_path_buf(),
        source,
    };
    std::fs::create_dir_all(dir).map_err(to_error)?;
    std::fs::write(path, data).map_err(to_error)
}

fn remove_temp_file(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed drag temp file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), "Failed to remove drag temp file: {}", e),
    }
}
