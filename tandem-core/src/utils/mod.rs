/// Maximum number of connections a room may hold.
pub const ROOM_CAPACITY: usize = 2;

pub const DEFAULT_SIGNALING_PORT: u16 = 8080;

pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_2: &str = "stun:global.stun.twilio.com:3478";
