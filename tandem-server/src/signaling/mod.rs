mod app;
mod signaling_service;
mod ws_handler;

pub use app::*;
pub use signaling_service::*;
pub use ws_handler::*;
