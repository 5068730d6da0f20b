//! One-to-one video calls: a room-based signaling relay and the client-side
//! negotiation that runs over it.
//!
//! Enable `server` for the relay, `client` for the call negotiator, or
//! `full` for both. The wire model is always available.

pub use tandem_core::model::{ClientMessage, ConnectionId, RoomId, ServerMessage};

pub mod model {
    pub use tandem_core::model::*;
    pub use tandem_core::utils::*;
}

#[cfg(feature = "server")]
pub mod server {
    pub use tandem_server::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use tandem_client::*;
}
