//! Export pass states

use serde::Serialize;
use std::fmt;

/// Where a pass is in its lifecycle
///
/// `Configuring -> SinksOpening -> Evaluating -> Writing -> Closing -> Done`,
/// with `Failed` reachable from any non-terminal state. A failed pass still
/// goes through `Closing` once any sink may have been opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportState {
    Configuring,
    SinksOpening,
    Evaluating,
    Writing,
    Closing,
    Done,
    Failed,
}

impl ExportState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExportState::Done | ExportState::Failed)
    }

    /// Whether `next` may follow this state
    pub fn can_transition_to(&self, next: ExportState) -> bool {
        use ExportState::*;
        match (self, next) {
            (Done | Failed, _) => false,
            (_, Failed) => true,
            (Configuring, SinksOpening)
            | (SinksOpening, Evaluating)
            | (SinksOpening, Closing)
            | (Evaluating, Writing)
            | (Evaluating, Closing)
            | (Writing, Closing)
            | (Closing, Done) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ExportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportState::Configuring => "configuring",
            ExportState::SinksOpening => "sinks-opening",
            ExportState::Evaluating => "evaluating",
            ExportState::Writing => "writing",
            ExportState::Closing => "closing",
            ExportState::Done => "done",
            ExportState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        use ExportState::*;
        let path = [Configuring, SinksOpening, Evaluating, Writing, Closing, Done];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_terminal_states() {
        use ExportState::*;
        assert!(Done.is_terminal());
        assert!(Failed.is_terminal());
        assert!(!Done.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Closing));
        assert!(Writing.can_transition_to(Failed));
        assert!(!Configuring.can_transition_to(Writing));
        assert!(!Closing.can_transition_to(Writing));
    }
}
