//! DHCPv4 wire codec (C1): fixed header + TLV options, and the option codes
//! the server interprets.

pub mod message;
pub mod options;

pub use message::{CodecError, Message, BROADCAST_FLAG, CLIENT_PORT, OP_BOOTREPLY, OP_BOOTREQUEST, SERVER_PORT};
pub use options::{code, DhcpOptions, MessageType};
