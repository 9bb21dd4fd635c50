//! Drag session - the mutable state of one drag, guarded by the engine lock

use std::path::PathBuf;

use x11rb::protocol::xproto::Window;

/// Where a drag is in its lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    /// Pointer is being tracked and targets notified
    Dragging,
    /// Drop was sent; waiting for the target's XdndFinished
    Dropped,
}

/// A currently tracked drop target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub window: Window,
    /// XDND version negotiated with it: `min(XDND_VERSION, XdndAware)`
    pub version: u32,
}

#[derive(Debug, Default)]
pub struct DragSession {
    pub state: DragState,
    /// Offered MIME types, in preference order
    pub mime_types: Vec<String>,
    pub payload: Vec<u8>,
    /// Materialized payload of a file-based transfer; outlives the session
    pub temp_file: Option<PathBuf>,
    /// Cached uri-list served for `text/uri-list`
    pub file_uri: Option<String>,
    pub target: Option<Target>,
    /// Last XdndStatus from `target` accepted the drop
    pub target_accepted: bool,
}

impl DragSession {
    pub fn is_active(&self) -> bool {
        self.state != DragState::Idle
    }

    /// Enter Dragging with a fresh offer
    pub fn begin(&mut self, mime_types: Vec<String>, payload: Vec<u8>, file_uri: Option<String>) {
        self.state = DragState::Dragging;
        self.mime_types = mime_types;
        self.payload = payload;
        self.file_uri = file_uri;
        self.target = None;
        self.target_accepted = false;
    }

    /// Switch targets; acceptance always belongs to the new target
    pub fn set_target(&mut self, target: Option<Target>) {
        self.target = target;
        self.target_accepted = false;
    }

    pub fn target_window(&self) -> Option<Window> {
        self.target.map(|t| t.window)
    }

    /// Back to Idle, dropping everything held in memory.
    ///
    /// The temp file is left alone: a slow reader may still be copying it.
    pub fn reset(&mut self) {
        self.state = DragState::Idle;
        self.mime_types.clear();
        self.payload = Vec::new();
        self.file_uri = None;
        self.target = None;
        self.target_accepted = false;
    }
}
