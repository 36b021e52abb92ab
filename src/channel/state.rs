//! Channel lifecycle states

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of one channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelState {
    Idle,
    Running,
    Stopping,
    Stopped,
    Failed(String),
}

impl ChannelState {
    /// Check if transition from current state to target state is valid
    pub fn can_transition_to(&self, target: &ChannelState) -> bool {
        use ChannelState::*;

        matches!(
            (self, target),
            // From Idle
            (Idle, Running) |
            (Idle, Stopping) |
            (Idle, Stopped) |
            (Idle, Failed(_)) |

            // From Running
            (Running, Stopping) |
            (Running, Stopped) |
            (Running, Failed(_)) |

            // From Stopping
            (Stopping, Stopped) |
            (Stopping, Failed(_)) |

            // Restart as a new session
            (Stopped, Idle) |
            (Failed(_), Idle)
        )
    }

    /// Stopped or Failed: the worker is gone
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Failed(_))
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Idle => "Idle",
            Self::Running => "Running",
            Self::Stopping => "Stopping",
            Self::Stopped => "Stopped",
            Self::Failed(_) => "Failed",
        }
    }
}

impl Default for ChannelState {
    fn default() -> Self {
        Self::Idle
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(reason) => write!(f, "Failed ({})", reason),
            other => f.write_str(other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_lifecycle() {
        let failed = ChannelState::Failed("bind error".into());

        assert!(ChannelState::Idle.can_transition_to(&ChannelState::Running));
        assert!(ChannelState::Running.can_transition_to(&ChannelState::Stopping));
        assert!(ChannelState::Stopping.can_transition_to(&ChannelState::Stopped));
        assert!(ChannelState::Idle.can_transition_to(&failed));
        assert!(failed.can_transition_to(&ChannelState::Idle));
    }

    #[test]
    fn test_invalid_transitions() {
        let failed = ChannelState::Failed("x".into());

        // A late Running from the worker must not undo a stop request
        assert!(!ChannelState::Stopping.can_transition_to(&ChannelState::Running));
        assert!(!failed.can_transition_to(&ChannelState::Stopping));
        assert!(!failed.can_transition_to(&ChannelState::Stopped));
        assert!(!ChannelState::Stopped.can_transition_to(&ChannelState::Running));
    }

    #[test]
    fn test_display() {
        assert_eq!(ChannelState::Running.to_string(), "Running");
        assert_eq!(
            ChannelState::Failed("port busy".into()).to_string(),
            "Failed (port busy)"
        );
        assert!(ChannelState::Stopped.is_terminal());
        assert!(!ChannelState::Stopping.is_terminal());
    }
}
