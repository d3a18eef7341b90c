/// Scan status definitions
///
/// A scan moves monotonically through pending -> running -> {completed, failed}.
/// A pending scan may also fail directly when its setup fails.
use crate::AuditError;
use std::fmt;

/// Represents the lifecycle state of one scan run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanStatus {
    /// Scan has been created but no worker has started it
    Pending,

    /// Scan is crawling and checking pages
    Running,

    // ===== Terminal States =====
    /// Every reachable page within bounds was processed
    Completed,

    /// Scan stopped on a setup or fatal error
    Failed,
}

impl ScanStatus {
    /// Returns true if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: ScanStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Pending, Self::Failed)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }

    /// Validates a transition and returns the new status
    pub fn transition(self, next: ScanStatus) -> Result<ScanStatus, AuditError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(AuditError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Converts the status to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parses a status from a database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all possible scan statuses
    pub fn all_states() -> Vec<Self> {
        vec![Self::Pending, Self::Running, Self::Completed, Self::Failed]
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
