//! Enrichment job state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of an enrichment job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum JobStatus {
    Idle,
    Running,
    Complete,
    RateLimited,
    Error,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Complete | JobStatus::RateLimited | JobStatus::Error
        )
    }
}

/// Progress record of the detail backfill for one collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnrichmentJob {
    pub id: Uuid,
    pub collection: String,
    pub status: JobStatus,
    /// Queue length fixed at job start
    pub total: usize,
    pub enriched_count: usize,
    /// Fetched successfully but carried neither enrichment field
    pub skipped_count: usize,
    pub failed_count: usize,
    pub rate_limited: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub last_saved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error: Option<String>,
}

impl EnrichmentJob {
    /// Placeholder returned for a collection that never had a job.
    pub fn idle(collection: impl Into<String>) -> Self {
        Self {
            id: Uuid::nil(),
            collection: collection.into(),
            status: JobStatus::Idle,
            total: 0,
            enriched_count: 0,
            skipped_count: 0,
            failed_count: 0,
            rate_limited: false,
            started_at: None,
            finished_at: None,
            last_saved_at: None,
            error: None,
        }
    }

    /// A fresh job in the `Running` state.
    pub fn start(collection: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Running,
            started_at: Some(Utc::now()),
            ..Self::idle(collection)
        }
    }

    /// Items claimed and finished so far.
    pub fn processed(&self) -> usize {
        self.enriched_count + self.skipped_count + self.failed_count
    }

    /// Move into a terminal state. Returns false if already terminal.
    pub fn finish(&mut self, status: JobStatus) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = status;
        self.finished_at = Some(Utc::now());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_only_once() {
        let mut job = EnrichmentJob::start("music");
        assert_eq!(job.status, JobStatus::Running);

        assert!(job.finish(JobStatus::RateLimited));
        assert!(!job.finish(JobStatus::Complete));
        assert_eq!(job.status, JobStatus::RateLimited);
        assert!(job.finished_at.is_some());
    }

    #[test]
    fn test_start_creates_new_identity() {
        let a = EnrichmentJob::start("music");
        let b = EnrichmentJob::start("music");
        assert_ne!(a.id, b.id);
        assert_eq!(EnrichmentJob::idle("music").status, JobStatus::Idle);
    }
}
