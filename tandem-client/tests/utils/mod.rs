
pub use call_helpers::*;
pub use mock_media::*;
pub use mock_session::*;
pub use mock_signaling::*;
