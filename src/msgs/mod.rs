//! Wire message types: enums (§6 "Wire"), handshake message bodies, and
//! the extension writer/parser table (spec §4.2–§4.7).

pub mod enums;
pub mod extensions;
pub mod handshake;

pub use enums::*;
