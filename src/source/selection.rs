//! Serving `XdndSelection` conversion requests

use x11rb::protocol::xproto::AtomEnum;

use crate::backend::{DisplayConnection, DisplayError, SelectionRequest};
use crate::core::atoms::{AtomTable, URI_LIST};
use crate::core::session::DragSession;

/// How a request was answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    /// TARGETS list with this many atoms
    Targets(usize),
    /// Data written; `uri` when the cached uri-list was served
    Data { len: usize, uri: bool },
    Refused,
}

/// Answer one request. A SelectionNotify is always sent, with a `NONE`
/// property when the request cannot be satisfied.
pub fn serve<C: DisplayConnection + ?Sized>(
    conn: &C,
    atoms: &AtomTable,
    session: &DragSession,
    request: &SelectionRequest,
) -> Result<Answer, DisplayError> {
    // Obsolete requestors leave the property unset
    let property = if request.property == x11rb::NONE {
        request.target
    } else {
        request.property
    };

    if request.selection != atoms.xdnd_selection || request.target == x11rb::NONE {
        return refuse(conn, request);
    }

    if request.target == atoms.targets {
        let mut targets = Vec::with_capacity(session.mime_types.len() + 1);
        targets.push(atoms.targets);
        targets.extend(session.mime_types.iter().map(|mime| atoms.mime_atom(mime)));

        if let Err(e) =
            conn.write_property32(request.requestor, property, AtomEnum::ATOM.into(), &targets)
        {
            return refuse_failed_write(conn, request, &e);
        }
        conn.send_selection_notify(request, property)?;
        return Ok(Answer::Targets(targets.len()));
    }

    let Some(mime) = session
        .mime_types
        .iter()
        .find(|mime| atoms.mime_atom(mime) == request.target)
    else {
        return refuse(conn, request);
    };

    let (bytes, uri) = match &session.file_uri {
        Some(uri) if mime == URI_LIST => (uri.as_bytes(), true),
        _ => (session.payload.as_slice(), false),
    };

    if let Err(e) = conn.write_property8(request.requestor, property, request.target, bytes) {
        return refuse_failed_write(conn, request, &e);
    }
    conn.send_selection_notify(request, property)?;
    Ok(Answer::Data {
        len: bytes.len(),
        uri,
    })
}

fn refuse<C: DisplayConnection + ?Sized>(
    conn: &C,
    request: &SelectionRequest,
) -> Result<Answer, DisplayError> {
    conn.send_selection_notify(request, x11rb::NONE)?;
    Ok(Answer::Refused)
}

/// The requestor still waits for a notify when the data never arrived
fn refuse_failed_write<C: DisplayConnection + ?Sized>(
    conn: &C,
    request: &SelectionRequest,
    error: &DisplayError,
) -> Result<Answer, DisplayError> {
    tracing::warn!(
        requestor = request.requestor,
        "Failed to write selection property, refusing: {}",
        error
    );
    refuse(conn, request)
}
