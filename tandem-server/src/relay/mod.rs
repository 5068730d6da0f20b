mod relay_command;
mod relay_router;

pub use relay_command::*;
pub use relay_router::*;
