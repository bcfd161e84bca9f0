//! Per-run outcome counters for batch procedures

use std::time::Instant;

use tracing::{info, warn};

use crate::shared::errors::DomainError;

/// Success/failure tally of one batch run.
///
/// Each item (driver, invoice, reservation) is processed independently;
/// a failure is logged, counted and skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub job: &'static str,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Items looked at but needing no change
    pub skipped: usize,
}

impl JobReport {
    pub fn new(job: &'static str) -> Self {
        Self {
            job,
            processed: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
        }
    }

    pub fn success(&mut self) {
        self.processed += 1;
        self.succeeded += 1;
    }

    pub fn skip(&mut self) {
        self.processed += 1;
        self.skipped += 1;
    }

    pub fn failure(&mut self, item: impl std::fmt::Display, error: &DomainError) {
        self.processed += 1;
        self.failed += 1;
        warn!(job = self.job, %item, error = %error, "Batch item failed, skipping");
    }

    /// Fold another run of the same kind into this one.
    pub fn merge(&mut self, other: JobReport) {
        self.processed += other.processed;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    /// Emit the summary line and the job counters.
    pub fn finish(self, started: Instant) -> Self {
        let elapsed = started.elapsed().as_secs_f64();
        metrics::counter!("billing_job_runs_total", "job" => self.job).increment(1);
        metrics::counter!("billing_job_items_total", "job" => self.job, "outcome" => "succeeded")
            .increment(self.succeeded as u64);
        metrics::counter!("billing_job_items_total", "job" => self.job, "outcome" => "failed")
            .increment(self.failed as u64);
        metrics::histogram!("billing_job_duration_seconds", "job" => self.job).record(elapsed);

        if self.processed > 0 {
            info!(
                job = self.job,
                processed = self.processed,
                succeeded = self.succeeded,
                failed = self.failed,
                skipped = self.skipped,
                elapsed_ms = (elapsed * 1000.0) as u64,
                "Job finished"
            );
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tallies_outcomes() {
        let mut report = JobReport::new("overdue_sweep");
        report.success();
        report.skip();
        report.failure(7, &DomainError::Storage("disk full".into()));

        assert_eq!(report.processed, 3);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 1);
        assert!(!report.is_clean());
    }

    #[test]
    fn merge_adds_counts() {
        let mut a = JobReport::new("monthly_billing");
        a.success();
        let mut b = JobReport::new("monthly_billing");
        b.success();
        b.skip();
        a.merge(b);
        assert_eq!(a.processed, 3);
        assert_eq!(a.succeeded, 2);
        assert!(a.finish(Instant::now()).is_clean());
    }
}
