//! Types shared by the authoritative server and its clients: the bounded
//! world model, the wire protocol and the length-prefixed framing used on
//! every connection.

pub mod codec;
pub mod protocol;
pub mod world;

pub use codec::{read_packet, write_packet, CodecError, MAX_FRAME_LEN};
pub use protocol::{EntityId, Packet, PublicationEvent, PROTOCOL_VERSION};
pub use world::{BoundsError, Position, WorldBounds, DEFAULT_BOUND, DEFAULT_GROUND_Y, INTERPOLATION_FACTOR};
