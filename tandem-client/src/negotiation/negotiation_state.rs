use std::fmt;

/// Phase of the current call attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NegotiationState {
    #[default]
    Idle,
    Offering,
    AwaitingAnswer,
    Answering,
    Connected,
    Closed,
}

impl NegotiationState {
    /// An offer or answer exchange is in progress.
    pub fn is_negotiating(self) -> bool {
        matches!(self, Self::Offering | Self::AwaitingAnswer | Self::Answering)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Offering => "offering",
            Self::AwaitingAnswer => "awaiting-answer",
            Self::Answering => "answering",
            Self::Connected => "connected",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
