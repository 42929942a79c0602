use super::Printer;
use crate::driver::RenderOutcome;
use crate::model::{JobState, PrinterState};
use crate::system::System;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

/// §4.5 "Scheduler loop": one tokio task per printer, started by the System
/// when the printer is created (or loaded from configuration). Also performs
/// the deferred half of DeletePrinter: once `is_deleted` is set and the
/// printer's last job has finished processing, it removes the printer from
/// `system`'s registry and exits.
pub async fn run_scheduler(system: Arc<System>, printer: Arc<Printer>) {
    loop {
        if printer.is_deleted.load(Ordering::Acquire) {
            let idle = printer.processing_job.read().await.is_none();
            if idle {
                system.remove_printer(printer.id).await;
                return;
            }
        }

        if printer.is_stopped.load(Ordering::Acquire) {
            tokio::time::sleep(Duration::from_secs(1)).await;
            continue;
        }

        let picked = pick_oldest_pending(&printer).await;
        let Some(job_id) = picked else {
            tokio::time::sleep(Duration::from_secs(1)).await;
            continue;
        };

        run_job(&printer, job_id).await;
    }
}

async fn pick_oldest_pending(printer: &Printer) -> Option<i32> {
    let jobs = printer.all_jobs.read().await;
    let mut candidate: Option<i32> = None;
    for job in jobs.iter() {
        let job = job.read().await;
        // A Create-Job with no Send-Document yet is PENDING but has no
        // spool file; it isn't a scheduler candidate until submit_file
        // attaches one (§4.4 "submitFile... invokes the scheduler").
        if job.state() == JobState::Pending && job.spool_path.is_some() && candidate.map_or(true, |c| job.id < c) {
            candidate = Some(job.id);
        }
    }
    candidate
}

async fn run_job(printer: &Printer, job_id: i32) {
    let Some(job_ref) = printer.find_job(job_id).await else { return };

    let (spool_path, format, canceled_flag) = {
        let mut job = job_ref.write().await;
        job.set_state(JobState::Processing);
        *printer.processing_job.write().await = Some(job_id);
        (job.spool_path.clone(), job.format.clone(), job.is_canceled_handle())
    };
    printer.set_runtime_state(PrinterState::Processing).await;

    let is_canceled = move || canceled_flag.load(Ordering::Acquire);
    let outcome = match spool_path {
        Some(path) => printer.driver.render(&path, format.as_deref(), &is_canceled).await,
        None => RenderOutcome::Aborted,
    };

    let spool_to_remove = {
        let mut job = job_ref.write().await;
        let final_state = match outcome {
            RenderOutcome::Completed => JobState::Completed,
            RenderOutcome::Canceled => JobState::Canceled,
            RenderOutcome::Aborted => JobState::Aborted,
        };
        job.impressions_completed = job.impressions;
        job.set_state(final_state);
        job.spool_path.take()
    };
    *printer.processing_job.write().await = None;
    // §3 invariant: the spool file is removed once the job reaches a
    // terminal state (retention windows aside, which this crate doesn't
    // implement).
    if let Some(path) = spool_to_remove {
        let _ = tokio::fs::remove_file(&path).await;
    }

    if printer.active_job_count().await == 0 {
        printer.set_runtime_state(PrinterState::Idle).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::NullDriver;
    use ipp::attribute::IppAttributes;

    #[tokio::test]
    async fn scheduler_completes_a_pending_job_then_idles() {
        let driver = Arc::new(NullDriver { format: "application/pdf".to_string() });
        let data = driver.init("file:///dev/null").await.unwrap();
        let printer = Arc::new(Printer::new(
            1,
            "p1".to_string(),
            "/ipp/print/p1".to_string(),
            "file:///dev/null".to_string(),
            "dummy".to_string(),
            driver,
            data,
            1,
        ));
        let job_id = printer
            .create_job("alice".to_string(), None, IppAttributes::new())
            .await
            .unwrap();
        let spool_path = std::env::temp_dir().join(format!("ippd-scheduler-test-{job_id}.prn"));
        tokio::fs::write(&spool_path, b"hello\n").await.unwrap();
        {
            let job = printer.find_job(job_id).await.unwrap();
            let mut job = job.write().await;
            job.submit_file(spool_path.clone(), Some("application/pdf".to_string()));
        }

        let picked = pick_oldest_pending(&printer).await;
        assert_eq!(picked, Some(job_id));
        run_job(&printer, job_id).await;

        let job = printer.find_job(job_id).await.unwrap();
        assert_eq!(job.read().await.state(), JobState::Completed);
        assert!(printer.processing_job.read().await.is_none());
        assert!(!spool_path.exists(), "spool file should be removed once the job is terminal");
    }

    #[tokio::test]
    async fn pending_job_without_a_spool_file_is_not_picked() {
        let driver = Arc::new(NullDriver { format: "application/pdf".to_string() });
        let data = driver.init("file:///dev/null").await.unwrap();
        let printer = Arc::new(Printer::new(
            1,
            "p1".to_string(),
            "/ipp/print/p1".to_string(),
            "file:///dev/null".to_string(),
            "dummy".to_string(),
            driver,
            data,
            1,
        ));
        // Create-Job with no Send-Document yet: PENDING, but no document.
        printer.create_job("alice".to_string(), None, IppAttributes::new()).await.unwrap();
        assert_eq!(pick_oldest_pending(&printer).await, None);
    }
}
