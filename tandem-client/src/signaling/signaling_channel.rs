use crate::error::CallError;
use tandem_core::ClientMessage;

/// Outbound half of the signaling transport. Sending never waits on the
/// server; delivery order per channel is preserved.
pub trait SignalingChannel: Send + Sync {
    fn send(&self, message: ClientMessage) -> Result<(), CallError>;
}
