/// Live session state machine.
///
/// State transitions:
/// ```text
/// connecting → open ⇄ { listening ⇄ coach_speaking ⇄ thinking }
///                 ↓               ↓
///              closing ────────→ closed
/// ```
/// `Open` is re-entered after every completed turn. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Connecting,
    Open,
    Listening,
    CoachSpeaking,
    Thinking,
    Closing,
    Closed,
}

impl SessionState {
    /// Whether the remote connection is established and the session is exchanging audio.
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            Self::Open | Self::Listening | Self::CoachSpeaking | Self::Thinking
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Short lowercase name, used in logs and by UI callers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Listening => "listening",
            Self::CoachSpeaking => "coach_speaking",
            Self::Thinking => "thinking",
            Self::Closing => "closing",
            Self::Closed => "closed",
        }
    }
}
