//! Protocol module containing the caps field codec and the message types.

pub mod caps;
pub mod messages;

pub use caps::{Caps, CapsError, CapsReader, FieldKind, Value};
pub use messages::{Announcement, ProtocolError, RendezvousOffer};
