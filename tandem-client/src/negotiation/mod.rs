mod call_command;
mod call_handle;
mod candidate_queue;
mod negotiation_state;
mod negotiator;

pub use call_command::*;
pub use call_handle::*;
pub use candidate_queue::*;
pub use negotiation_state::*;
pub use negotiator::*;
