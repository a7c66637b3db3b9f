use super::error::StreamError;
use super::session_summary::SessionSummary;

/// Streaming session state machine.
///
/// State transitions:
/// ```text
/// idle → recording → draining → closed
///   ↓        ↓           ↓
///   └────────┴───────────┴──→ failed
/// ```
/// `closed` and `failed` are terminal; a new recording needs a fresh session
/// (or an explicit reset back to idle).
#[derive(Debug, Clone, PartialEq)]
pub enum UplinkState {
    Idle,
    Recording { duration_secs: f64 },
    Draining,
    Closed(Box<SessionSummary>),
    Failed(StreamError),
}

impl UplinkState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording { .. })
    }

    pub fn is_draining(&self) -> bool {
        matches!(self, Self::Draining)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed(_) | Self::Failed(_))
    }

    /// Short lowercase name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording { .. } => "recording",
            Self::Draining => "draining",
            Self::Closed(_) => "closed",
            Self::Failed(_) => "failed",
        }
    }

    /// Returns the current duration if in a state that tracks it.
    pub fn duration(&self) -> Option<f64> {
        match self {
            Self::Recording { duration_secs } => Some(*duration_secs),
            Self::Closed(summary) => Some(summary.duration_secs),
            _ => None,
        }
    }
}
