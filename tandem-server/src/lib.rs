pub mod config;
pub mod error;
pub mod logging;
pub mod relay;
pub mod room;
pub mod signaling;

pub use config::*;
pub use error::*;
pub use relay::*;
pub use room::*;
pub use signaling::*;
