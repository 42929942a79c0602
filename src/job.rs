use crate::attrs::{IppFilter, RequestedAttributes};
use crate::error::IppError;
use crate::model::{JobState, JobStateReasons};
use ipp::attribute::{IppAttribute, IppAttributes};
use ipp::model::DelimiterTag;
use ipp::value::IppValue;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

fn unix_secs(instant: SystemTime) -> i32 {
    instant
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i32)
        .unwrap_or(0)
}

/// A unit of work owned by exactly one Printer (§4.4). Mutable
/// fields are only ever touched through a `futures_locks::RwLock<Job>` held
/// by the owning Printer's job registry, so nothing here takes a lock itself.
#[derive(Debug)]
pub struct Job {
    pub id: i32,
    pub printer_id: i32,
    pub uuid: Uuid,
    pub name: String,
    pub username: String,
    pub format: Option<String>,
    pub message: String,

    state: JobState,
    state_reasons: JobStateReasons,
    /// Single-writer (cancel handler), multi-reader (scheduler/driver) flag.
    /// Never reset back to `false`. Shared via `Arc` so the scheduler can
    /// hand the driver a poll closure without re-locking the job.
    pub is_canceled: Arc<AtomicBool>,

    pub spool_path: Option<PathBuf>,
    /// Request attributes promoted into the job-attributes group at creation.
    pub attributes: IppAttributes,

    pub impressions: i32,
    pub impressions_completed: i32,

    created_at: SystemTime,
    processing_at: Option<SystemTime>,
    completed_at: Option<SystemTime>,
    state_time: Instant,
}

impl Job {
    pub fn new(
        id: i32,
        printer_id: i32,
        username: String,
        name: Option<String>,
        held: bool,
        attributes: IppAttributes,
    ) -> Job {
        let now = SystemTime::now();
        Job {
            id,
            printer_id,
            uuid: Uuid::new_v4(),
            name: name.unwrap_or_else(|| format!("Job #{id}")),
            username,
            format: None,
            message: String::new(),
            state: if held { JobState::Held } else { JobState::Pending },
            state_reasons: if held {
                JobStateReasons::JOB_INCOMING
            } else {
                JobStateReasons::NONE
            },
            is_canceled: Arc::new(AtomicBool::new(false)),
            spool_path: None,
            attributes,
            impressions: 0,
            impressions_completed: 0,
            created_at: now,
            processing_at: None,
            completed_at: None,
            state_time: Instant::now(),
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn state_reasons(&self) -> JobStateReasons {
        self.state_reasons
    }

    pub fn is_canceled(&self) -> bool {
        self.is_canceled.load(Ordering::Acquire)
    }

    /// A cloneable handle the scheduler can hand to the driver so it can
    /// poll cancellation without re-locking the job on every chunk.
    pub fn is_canceled_handle(&self) -> Arc<AtomicBool> {
        self.is_canceled.clone()
    }

    /// `openSpoolFile`: deterministic spool path for this job, `dir/<printer_id>-<job_id>-<seq>.<ext>`.
    pub fn spool_file_path(dir: &Path, printer_id: i32, job_id: i32, seq: u32, format: Option<&str>) -> PathBuf {
        let ext = match format {
            Some("image/pwg-raster") => "pwg",
            Some("image/urf") => "urf",
            Some("application/ipp") => "ipp",
            Some(_) => "prn",
            None => "prn",
        };
        dir.join(format!("{printer_id}-{job_id}-{seq}.{ext}"))
    }

    /// `setState`: update state + state_reasons together and bump state_time.
    /// Returns `true` if the new state is terminal (caller must move the job
    /// between the printer's active/completed registries in the same
    /// critical section).
    pub fn set_state(&mut self, new_state: JobState) -> bool {
        self.state = new_state;
        self.state_time = Instant::now();
        match new_state {
            JobState::Processing if self.processing_at.is_none() => {
                self.processing_at = Some(SystemTime::now());
            }
            JobState::Completed => {
                self.state_reasons.insert(JobStateReasons::JOB_COMPLETED_SUCCESSFULLY);
                self.completed_at = Some(SystemTime::now());
            }
            JobState::Canceled => {
                self.state_reasons.insert(JobStateReasons::JOB_CANCELED_BY_USER);
                self.completed_at = Some(SystemTime::now());
            }
            JobState::Aborted => {
                self.state_reasons.insert(JobStateReasons::ABORTED_BY_SYSTEM);
                self.completed_at = Some(SystemTime::now());
            }
            _ => {}
        }
        if new_state.is_terminal() {
            self.state_reasons.remove(JobStateReasons::PROCESSING_TO_STOP_POINT);
        }
        new_state.is_terminal()
    }

    pub fn mark_fetchable(&mut self, fetchable: bool) {
        if fetchable {
            self.state_reasons.insert(JobStateReasons::JOB_FETCHABLE);
        } else {
            self.state_reasons.remove(JobStateReasons::JOB_FETCHABLE);
        }
    }

    /// `submitFile`: promote HELD → PENDING once a document has been fully
    /// received; the caller (scheduler loop) picks it up on its next pass.
    pub fn submit_file(&mut self, path: PathBuf, format: Option<String>) {
        self.spool_path = Some(path);
        self.format = format;
        if self.state == JobState::Held {
            self.set_state(JobState::Pending);
        }
    }

    /// `cancel`: cooperative cancel. PROCESSING jobs only get the flag set
    /// (the driver loop observes it and stops); everything else transitions
    /// straight to CANCELED.
    pub fn cancel(&mut self) -> Result<bool, IppError> {
        if self.state.is_terminal() {
            return Err(IppError::not_possible("job already in a terminal state"));
        }
        if self.state == JobState::Processing {
            self.is_canceled.store(true, Ordering::Release);
            self.state_reasons.insert(JobStateReasons::PROCESSING_TO_STOP_POINT);
            Ok(false)
        } else {
            self.set_state(JobState::Canceled);
            Ok(true)
        }
    }

    /// `copyAttributes`: the lightweight job-description attributes always
    /// sent back after create/print/send-document (RFC 8011 §3.4).
    pub fn identity_attributes(&self, job_uri: &str) -> Vec<IppAttribute> {
        vec![
            IppAttribute::new(IppAttribute::JOB_URI, IppValue::Uri(job_uri.to_string())),
            IppAttribute::new(IppAttribute::JOB_ID, IppValue::Integer(self.id)),
            IppAttribute::new(IppAttribute::JOB_STATE, IppValue::from(self.state)),
            IppAttribute::new("job-state-message", IppValue::TextWithoutLanguage(self.message.clone())),
            IppAttribute::new(IppAttribute::JOB_STATE_REASONS, self.state_reasons.to_ipp_value()),
        ]
    }

    /// Full job-attributes block for Get-Job-Attributes/Get-Jobs, filtered by
    /// the client's `requested-attributes`.
    pub fn copy_attributes(&self, job_uri: &str, printer_uri: &str, requested: &RequestedAttributes) -> Vec<IppAttribute> {
        let mut attrs = self.identity_attributes(job_uri);
        attrs.push(IppAttribute::new("job-printer-uri", IppValue::Uri(printer_uri.to_string())));
        attrs.push(IppAttribute::new(
            IppAttribute::JOB_NAME,
            IppValue::NameWithoutLanguage(self.name.clone()),
        ));
        attrs.push(IppAttribute::new(
            "job-originating-user-name",
            IppValue::NameWithoutLanguage(self.username.clone()),
        ));
        attrs.push(IppAttribute::new("time-at-creation", IppValue::Integer(unix_secs(self.created_at))));
        attrs.push(IppAttribute::new(
            "time-at-processing",
            self.processing_at.map_or(IppValue::NoValue, |t| IppValue::Integer(unix_secs(t))),
        ));
        attrs.push(IppAttribute::new(
            "time-at-completed",
            self.completed_at.map_or(IppValue::NoValue, |t| IppValue::Integer(unix_secs(t))),
        ));
        attrs.push(IppAttribute::new(
            "job-impressions-completed",
            IppValue::Integer(self.impressions_completed),
        ));

        let mut dst = IppAttributes::new();
        IppFilter::copy_built(&mut dst, attrs, requested, DelimiterTag::JobAttributes);
        dst.groups_of(DelimiterTag::JobAttributes)
            .flat_map(|g| g.attributes().values().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> Job {
        Job::new(1, 1, "alice".to_string(), None, false, IppAttributes::new())
    }

    #[test]
    fn new_job_starts_pending() {
        assert_eq!(job().state(), JobState::Pending);
    }

    #[test]
    fn held_job_starts_held_with_incoming_reason() {
        let j = Job::new(2, 1, "bob".to_string(), None, true, IppAttributes::new());
        assert_eq!(j.state(), JobState::Held);
        assert!(j.state_reasons().contains(JobStateReasons::JOB_INCOMING));
    }

    #[test]
    fn cancel_processing_job_sets_flag_without_terminal_transition() {
        let mut j = job();
        j.set_state(JobState::Processing);
        let transitioned_immediately = j.cancel().unwrap();
        assert!(!transitioned_immediately);
        assert!(j.is_canceled());
        assert_eq!(j.state(), JobState::Processing);
    }

    #[test]
    fn cancel_processing_job_sets_processing_to_stop_point_reason() {
        let mut j = job();
        j.set_state(JobState::Processing);
        j.cancel().unwrap();
        assert!(j.state_reasons().contains(JobStateReasons::PROCESSING_TO_STOP_POINT));
        j.set_state(JobState::Completed);
        assert!(!j.state_reasons().contains(JobStateReasons::PROCESSING_TO_STOP_POINT));
    }

    #[test]
    fn cancel_pending_job_transitions_immediately() {
        let mut j = job();
        let transitioned_immediately = j.cancel().unwrap();
        assert!(transitioned_immediately);
        assert_eq!(j.state(), JobState::Canceled);
    }

    #[test]
    fn cancel_terminal_job_is_rejected() {
        let mut j = job();
        j.set_state(JobState::Completed);
        assert!(j.cancel().is_err());
    }

    #[test]
    fn submit_file_promotes_held_to_pending() {
        let mut j = Job::new(3, 1, "carol".to_string(), None, true, IppAttributes::new());
        j.submit_file(PathBuf::from("/tmp/1-3-0.prn"), Some("application/pdf".to_string()));
        assert_eq!(j.state(), JobState::Pending);
        assert_eq!(j.spool_path, Some(PathBuf::from("/tmp/1-3-0.prn")));
    }

    #[test]
    fn spool_file_path_is_deterministic() {
        let p = Job::spool_file_path(Path::new("/spool"), 2, 9, 0, Some("image/urf"));
        assert_eq!(p, PathBuf::from("/spool/2-9-0.urf"));
    }
}
