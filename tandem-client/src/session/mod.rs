mod peer_session;
mod rtc_session;
mod session_event;

pub use peer_session::*;
pub use rtc_session::*;
pub use session_event::*;
