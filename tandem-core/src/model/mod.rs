mod connection;
mod description;
mod ice;
mod room;
mod signaling;

pub use connection::ConnectionId;
pub use description::{IceCandidate, SdpKind, SessionDescription};
pub use ice::{IceServerConfig, default_ice_servers};
pub use room::RoomId;
pub use signaling::{ClientMessage, RelayKind, ServerMessage};
