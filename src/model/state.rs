use ipp::value::IppValue;

/// A job's lifecycle state, RFC 8011 §5.3.7. Discriminants match the
/// registered `job-state` enum values so `state as i32` is a valid
/// `IppValue::Enum` payload without a lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(i32)]
pub enum JobState {
    Pending = 3,
    Held = 4,
    Processing = 5,
    Stopped = 6,
    Canceled = 7,
    Aborted = 8,
    Completed = 9,
}

impl JobState {
    /// True once the job can no longer transition (COMPLETED, CANCELED, ABORTED).
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Canceled | JobState::Aborted)
    }

    /// True for PENDING/HELD, i.e. the job has not yet reached the scheduler.
    pub fn is_not_yet_processing(self) -> bool {
        matches!(self, JobState::Pending | JobState::Held)
    }
}

impl From<JobState> for IppValue {
    fn from(value: JobState) -> Self {
        IppValue::Enum(value as i32)
    }
}

impl TryFrom<i32> for JobState {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, i32> {
        match value {
            3 => Ok(Self::Pending),
            4 => Ok(Self::Held),
            5 => Ok(Self::Processing),
            6 => Ok(Self::Stopped),
            7 => Ok(Self::Canceled),
            8 => Ok(Self::Aborted),
            9 => Ok(Self::Completed),
            _ => Err(value),
        }
    }
}

impl TryFrom<IppValue> for JobState {
    type Error = IppValue;

    fn try_from(value: IppValue) -> Result<Self, IppValue> {
        match value {
            IppValue::Enum(v) => Self::try_from(v).map_err(|_| IppValue::Enum(v)),
            _ => Err(value),
        }
    }
}

/// A printer's top-level state, RFC 8011 §5.4.15. Only three values are
/// registered; PROCESSING is used while a job is under way, STOPPED while
/// paused/disabled, IDLE otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum PrinterState {
    Idle = 3,
    Processing = 4,
    Stopped = 5,
}

impl From<PrinterState> for IppValue {
    fn from(value: PrinterState) -> Self {
        IppValue::Enum(value as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Canceled.is_terminal());
        assert!(JobState::Aborted.is_terminal());
        assert!(!JobState::Pending.is_terminal());
        assert!(!JobState::Processing.is_terminal());
    }

    #[test]
    fn discriminants_match_rfc8011() {
        assert_eq!(JobState::Pending as i32, 3);
        assert_eq!(JobState::Completed as i32, 9);
        assert_eq!(PrinterState::Idle as i32, 3);
        assert_eq!(PrinterState::Stopped as i32, 5);
    }

    #[test]
    fn job_state_round_trips_through_enum_value() {
        for state in [JobState::Pending, JobState::Processing, JobState::Completed] {
            let value: IppValue = state.into();
            assert_eq!(JobState::try_from(value).unwrap(), state);
        }
        assert!(JobState::try_from(0).is_err());
    }
}
