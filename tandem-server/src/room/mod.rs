mod connection_registry;
mod room_registry;

pub use connection_registry::*;
pub use room_registry::*;
