//! Small value types shared across the crate: page geometry, RFC 8011 job
//! and printer state machines, state-reason bitsets, and the `which-jobs`
//! selector. Kept deliberately free of any lock or I/O concern so they can
//! be unit tested in isolation.
mod page;
mod reasons;
mod state;
mod which_job;

pub use page::{PageOrientation, Resolution};
pub use reasons::{IdentifyActions, JobStateReasons, PrinterStateReasons};
pub use state::{JobState, PrinterState};
pub use which_job::WhichJob;
