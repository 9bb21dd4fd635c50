//! Protocol vocabulary and per-drag state

pub mod atoms;
pub mod session;
pub mod uri;
