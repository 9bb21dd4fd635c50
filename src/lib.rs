//! xdnd-source - drag data out of an application into other X11 clients
//!
//! This library implements the source side of the XDND protocol for hosts
//! that run their own input loop, such as immediate-mode GUI toolkits.
//!
//! ## Features
//!
//! - Dedicated X connection and invisible proxy window, independent of the
//!   toolkit's connection
//! - Deepest-aware-window hit testing and Enter/Position/Leave/Drop messaging
//! - Serving `XdndSelection` for `TARGETS`, raw payloads and `text/uri-list`
//! - File-based transfers through a temp file and a `file://` URI
//! - Window lookup by title
//!
//! ## Usage
//!
//! Call [`DragSource::update_pointer`] and [`DragSource::pump_events`] once
//! per frame while a drag is active, and [`DragSource::finish_drag`] when
//! the button is released.

pub mod backend;
pub mod config;
pub mod core;
pub mod error;
pub mod locator;
pub mod source;

pub use crate::config::DragSourceConfig;
pub use crate::core::session::DragState;
pub use crate::error::DragError;
pub use crate::locator::WindowLocator;
pub use crate::source::DragSource;
