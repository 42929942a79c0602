use super::JobState;

/// The `which-jobs` operation attribute selector for Get-Jobs, RFC 8011
/// §4.2.6.1 plus the PWG 5100.18 `fetchable` extension used by the proxy
/// (output-device) scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhichJob {
    NotCompleted,
    Completed,
    All,
    Aborted,
    Canceled,
    Pending,
    PendingHeld,
    Processing,
    ProcessingStopped,
    /// Jobs carrying the `job-fetchable` state reason (proxy/output-device
    /// scenario); the caller cross-checks `job-state-reasons`, not `state`.
    Fetchable,
}

impl WhichJob {
    pub fn from_keyword(keyword: &str) -> WhichJob {
        match keyword {
            "completed" => WhichJob::Completed,
            "all" => WhichJob::All,
            "aborted" => WhichJob::Aborted,
            "canceled" => WhichJob::Canceled,
            "pending" => WhichJob::Pending,
            "pending-held" => WhichJob::PendingHeld,
            "processing" => WhichJob::Processing,
            "processing-stopped" => WhichJob::ProcessingStopped,
            "fetchable" => WhichJob::Fetchable,
            _ => WhichJob::NotCompleted,
        }
    }

    /// True if a job in the given state (and not carrying any particular
    /// state reason) matches this selector. `Fetchable` is handled
    /// separately by the caller since it depends on state-reasons, not state.
    pub fn matches(self, state: JobState) -> bool {
        match self {
            WhichJob::NotCompleted => !state.is_terminal(),
            WhichJob::Completed => state.is_terminal(),
            WhichJob::All => true,
            WhichJob::Aborted => state == JobState::Aborted,
            WhichJob::Canceled => state == JobState::Canceled,
            WhichJob::Pending => state == JobState::Pending,
            WhichJob::PendingHeld => state == JobState::Held,
            WhichJob::Processing => state == JobState::Processing,
            WhichJob::ProcessingStopped => state == JobState::Stopped,
            WhichJob::Fetchable => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_completed_excludes_terminal_states() {
        assert!(WhichJob::NotCompleted.matches(JobState::Pending));
        assert!(WhichJob::NotCompleted.matches(JobState::Processing));
        assert!(!WhichJob::NotCompleted.matches(JobState::Completed));
    }

    #[test]
    fn completed_only_matches_terminal_states() {
        assert!(WhichJob::Completed.matches(JobState::Completed));
        assert!(WhichJob::Completed.matches(JobState::Canceled));
        assert!(!WhichJob::Completed.matches(JobState::Pending));
    }

    #[test]
    fn all_matches_everything() {
        assert!(WhichJob::All.matches(JobState::Held));
        assert!(WhichJob::All.matches(JobState::Aborted));
    }

    #[test]
    fn unknown_keyword_defaults_to_not_completed() {
        assert_eq!(WhichJob::from_keyword("bogus"), WhichJob::NotCompleted);
    }
}
