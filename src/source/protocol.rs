//! XDND client message layouts
//!
//! Every outbound message is format 32 with the source window in `data[0]`.

use x11rb::protocol::xproto::{Atom, Timestamp, Window};

use crate::backend::ClientMessage;
use crate::core::atoms::AtomTable;

/// Highest version we speak. XdndEnter carries the lower of this and the
/// version in the target's `XdndAware`.
pub const XDND_VERSION: u32 = 5;

/// Oldest version whose message layout we speak
pub const MIN_XDND_VERSION: u32 = 3;

/// Types carried inline in XdndEnter; more go to XdndTypeList
pub const INLINE_TYPES: usize = 3;

/// Messages sent from the drag source to a target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outbound<'a> {
    Enter { version: u32, types: &'a [Atom] },
    Position { x: i16, y: i16, time: Timestamp },
    Leave,
    Drop { time: Timestamp },
}

impl Outbound<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Outbound::Enter { .. } => "XdndEnter",
            Outbound::Position { .. } => "XdndPosition",
            Outbound::Leave => "XdndLeave",
            Outbound::Drop { .. } => "XdndDrop",
        }
    }

    pub fn encode(&self, atoms: &AtomTable, source: Window, target: Window) -> ClientMessage {
        let mut data = [source, 0, 0, 0, 0];

        let type_ = match *self {
            Outbound::Enter { version, types } => {
                data[1] = version << 24;
                if types.len() > INLINE_TYPES {
                    data[1] |= 1;
                }
                for (slot, atom) in data[2..].iter_mut().zip(types) {
                    *slot = *atom;
                }
                atoms.xdnd_enter
            }
            Outbound::Position { x, y, time } => {
                data[2] = pack_coordinates(x, y);
                data[3] = time;
                data[4] = atoms.xdnd_action_copy;
                atoms.xdnd_position
            }
            Outbound::Leave => atoms.xdnd_leave,
            Outbound::Drop { time } => {
                data[2] = time;
                atoms.xdnd_drop
            }
        };

        ClientMessage {
            window: target,
            type_,
            data,
        }
    }
}

/// Messages a target sends back to us
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound {
    Status { target: Window, accepted: bool },
    Finished { target: Window },
}

impl Inbound {
    /// `None` for client messages that are not XDND replies
    pub fn decode(atoms: &AtomTable, message: &ClientMessage) -> Option<Self> {
        let data = &message.data;
        if message.type_ == atoms.xdnd_status {
            Some(Inbound::Status {
                target: data[0],
                accepted: data[1] & 1 != 0,
            })
        } else if message.type_ == atoms.xdnd_finished {
            Some(Inbound::Finished { target: data[0] })
        } else {
            None
        }
    }
}

/// `x` in the high 16 bits, `y` in the low 16 bits
pub fn pack_coordinates(x: i16, y: i16) -> u32 {
    (u32::from(x as u16) << 16) | u32::from(y as u16)
}

/// Clamp a host coordinate into the X11 16-bit range
pub fn clamp_coordinate(value: i32) -> i16 {
    value.clamp(i16::MIN.into(), i16::MAX.into()) as i16
}
