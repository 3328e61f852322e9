//! In-memory registry of batch calculations submitted through `POST /api/jobs`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::batch::{BatchFile, BatchResult};
use crate::engine::Engine;

/// Jobs retained before finished ones start being evicted. Once every
/// retained job is still queued or running, new submissions are refused.
pub const MAX_JOBS: usize = 256;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStoreError {
    #[error("{active} jobs are still queued or running; retry once one finishes")]
    Full { active: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct JobProgress {
    pub done: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub state: JobState,
    pub progress: JobProgress,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<BatchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobRecord {
    fn queued(total: usize) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            state: JobState::Queued,
            progress: JobProgress { done: 0, total },
            created_at: now,
            updated_at: now,
            result: None,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct JobStore {
    jobs: Arc<Mutex<HashMap<Uuid, JobRecord>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, JobRecord>> {
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, id: Uuid) -> Option<JobRecord> {
        self.lock().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&self, record: JobRecord) -> Result<(), JobStoreError> {
        let mut jobs = self.lock();
        if jobs.len() >= MAX_JOBS {
            let oldest = jobs
                .values()
                .filter(|job| job.state.is_finished())
                .min_by_key(|job| job.created_at)
                .map(|job| job.id)
                .ok_or(JobStoreError::Full { active: jobs.len() })?;
            jobs.remove(&oldest);
        }
        jobs.insert(record.id, record);
        Ok(())
    }

    fn update<F>(&self, id: Uuid, apply: F)
    where
        F: FnOnce(&mut JobRecord),
    {
        if let Some(record) = self.lock().get_mut(&id) {
            apply(record);
            record.updated_at = Utc::now();
        }
    }

    /// Queues `plan` on the engine's worker pool and returns the new record.
    /// The plan is expected to have been validated already; failures are
    /// still captured on the record.
    pub fn submit(&self, engine: Arc<Engine>, plan: BatchFile) -> Result<JobRecord, JobStoreError> {
        let record = JobRecord::queued(plan.items.len());
        let id = record.id;
        self.insert(record.clone())?;
        tracing::info!(target: "starforce::jobs", %id, items = plan.items.len(), "job queued");

        let store = self.clone();
        let queue = engine.queue().clone();
        queue.detach(move || {
            store.update(id, |job| job.state = JobState::Running);
            let outcome = engine.portfolio_with_progress(&plan.items, &plan.options, |done, total| {
                store.update(id, |job| job.progress = JobProgress { done, total });
            });
            match outcome {
                Ok(portfolio) => {
                    let result = portfolio.result();
                    store.update(id, |job| {
                        job.state = JobState::Completed;
                        job.result = Some(result);
                    });
                    tracing::info!(target: "starforce::jobs", %id, "job completed");
                }
                Err(err) => {
                    tracing::warn!(target: "starforce::jobs", %id, error = %err, "job failed");
                    store.update(id, |job| {
                        job.state = JobState::Failed;
                        job.error = Some(err.to_string());
                    });
                }
            }
        });
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{BatchOptions, ItemDescriptor, StarForceGoal};
    use crate::config::EngineConfig;
    use crate::starforce::{Modifiers, TierSystem};
    use std::time::{Duration, Instant};

    fn plan(target_tier: u8) -> BatchFile {
        BatchFile {
            options: BatchOptions {
                trials: Some(50),
                ..BatchOptions::default()
            },
            items: vec![ItemDescriptor::new("hat", 160).with_star_force(StarForceGoal {
                current_tier: 0,
                target_tier,
                tier_system: TierSystem::Legacy,
                modifiers: Modifiers::default(),
                replacement_cost: 0,
            })],
        }
    }

    fn wait_finished(store: &JobStore, id: Uuid) -> JobRecord {
        let deadline = Instant::now() + Duration::from_secs(30);
        loop {
            let record = store.get(id).expect("job should exist");
            if record.state.is_finished() || Instant::now() > deadline {
                return record;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn job_runs_to_completion() {
        let engine = Arc::new(Engine::new(EngineConfig::default()));
        let store = JobStore::new();
        let record = store.submit(Arc::clone(&engine), plan(10)).unwrap();
        let finished = wait_finished(&store, record.id);
        assert_eq!(finished.state, JobState::Completed);
        assert_eq!(finished.progress, JobProgress { done: 1, total: 1 });
        let result = finished.result.expect("completed job carries a result");
        assert_eq!(result.items.len(), 1);
        assert!(finished.updated_at >= finished.created_at);
    }

    #[test]
    fn failing_plan_is_recorded() {
        let engine = Arc::new(Engine::new(EngineConfig::default()));
        let store = JobStore::new();
        let record = store.submit(engine, plan(24)).unwrap();
        let finished = wait_finished(&store, record.id);
        assert_eq!(finished.state, JobState::Failed);
        assert!(finished
            .error
            .as_deref()
            .is_some_and(|message| message.contains("exceeds maximum 23")));
    }

    #[test]
    fn unknown_job_is_absent() {
        assert!(JobStore::new().get(Uuid::new_v4()).is_none());
    }

    #[test]
    fn finished_jobs_are_evicted_first() {
        let store = JobStore::new();
        let mut first = JobRecord::queued(0);
        first.state = JobState::Completed;
        let first_id = first.id;
        store.insert(first).unwrap();
        for _ in 1..MAX_JOBS {
            store.insert(JobRecord::queued(0)).unwrap();
        }
        assert_eq!(store.len(), MAX_JOBS);
        let newest = JobRecord::queued(0);
        let newest_id = newest.id;
        store.insert(newest).unwrap();
        assert_eq!(store.len(), MAX_JOBS);
        assert!(store.get(first_id).is_none());
        assert!(store.get(newest_id).is_some());
    }

    #[test]
    fn full_store_of_active_jobs_refuses_new_work() {
        let store = JobStore::new();
        for _ in 0..MAX_JOBS {
            store.insert(JobRecord::queued(0)).unwrap();
        }
        let engine = Arc::new(Engine::new(EngineConfig::default()));
        assert_eq!(
            store.submit(engine, plan(10)).unwrap_err(),
            JobStoreError::Full { active: MAX_JOBS }
        );
        assert_eq!(store.len(), MAX_JOBS);
    }
}
