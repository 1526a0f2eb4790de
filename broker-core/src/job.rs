//! `Job`: one regional analysis — the immutable template plus
//! mutable delivery/completion bookkeeping.

use crate::dispatch::OriginCoordinates;
use broker_common::ids::{JobId, TaskId, WorkerCategory};
use broker_propagator::TaskTemplate;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const DEFAULT_REDELIVERY_TIMEOUT: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
pub struct Job {
    pub job_id: JobId,
    pub category: WorkerCategory,
    pub worker_tags: Vec<String>,
    pub template: TaskTemplate,
    pub n_tasks_total: u32,
    pub origins: Vec<OriginCoordinates>,
    pub include_path_results: bool,
    pub origin_point_set: bool,
    /// Whether this job routes over transit at all; drives the
    /// autoscale target formula.
    pub has_transit: bool,
    pub zoom: u32,
    /// Wall-clock submission time, for display in the job listing; no
    /// broker logic depends on it (redelivery/cooldown timing uses the
    /// injected [`crate::clock::Clock`] instead).
    pub submitted_at: DateTime<Utc>,
    redelivery_timeout: Duration,
    delivered: Vec<bool>,
    completed: Vec<bool>,
    deadlines: HashMap<TaskId, Instant>,
    errors: Vec<String>,
}

impl Job {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        job_id: JobId,
        category: WorkerCategory,
        worker_tags: Vec<String>,
        template: TaskTemplate,
        origins: Vec<OriginCoordinates>,
        has_transit: bool,
        zoom: u32,
        redelivery_timeout: Duration,
    ) -> Self {
        let n_tasks_total = origins.len() as u32;
        Self {
            job_id,
            category,
            worker_tags,
            template,
            n_tasks_total,
            origins,
            include_path_results: false,
            origin_point_set: false,
            has_transit,
            zoom,
            submitted_at: Utc::now(),
            redelivery_timeout,
            delivered: vec![false; n_tasks_total as usize],
            completed: vec![false; n_tasks_total as usize],
            deadlines: HashMap::new(),
            errors: Vec::new(),
        }
    }

    /// `i ∈ [0, n_total) with i ∉ delivered OR (delivered ∧ !completed ∧
    /// now() > deadline[i])`.
    pub fn has_tasks_to_deliver(&self, now: Instant) -> bool {
        if self.is_errored() {
            return false;
        }
        (0..self.n_tasks_total).any(|i| self.is_eligible(i, now))
    }

    fn is_eligible(&self, i: TaskId, now: Instant) -> bool {
        let idx = i as usize;
        if !self.delivered[idx] {
            return true;
        }
        if self.completed[idx] {
            return false;
        }
        self.deadlines
            .get(&i)
            .is_some_and(|deadline| now > *deadline)
    }

    /// Returns up to `k` eligible task IDs, undelivered tasks first (in
    /// ascending index order) ahead of redeliveries, marks them
    /// delivered and resets their deadline (undelivered-first tie-break).
    pub fn generate_some_tasks_to_deliver(&mut self, k: u32, now: Instant) -> Vec<TaskId> {
        if self.is_errored() || k == 0 {
            return Vec::new();
        }

        let mut undelivered = Vec::new();
        let mut redeliveries = Vec::new();
        for i in 0..self.n_tasks_total {
            let idx = i as usize;
            if !self.delivered[idx] {
                undelivered.push(i);
            } else if self.is_eligible(i, now) {
                redeliveries.push(i);
            }
        }

        let chosen: Vec<TaskId> = undelivered
            .into_iter()
            .chain(redeliveries)
            .take(k as usize)
            .collect();

        let deadline = now + self.redelivery_timeout;
        for &i in &chosen {
            self.delivered[i as usize] = true;
            self.deadlines.insert(i, deadline);
        }
        chosen
    }

    /// Idempotent: returns whether this call performed the 0→1
    /// transition (at-most-once completion).
    pub fn mark_task_completed(&mut self, task_id: TaskId) -> bool {
        let Some(slot) = self.completed.get_mut(task_id as usize) else {
            return false;
        };
        if *slot {
            return false;
        }
        *slot = true;
        self.deadlines.remove(&task_id);
        true
    }

    pub fn is_delivered(&self, task_id: TaskId) -> bool {
        self.delivered.get(task_id as usize).copied().unwrap_or(false)
    }

    pub fn is_completed(&self, task_id: TaskId) -> bool {
        self.completed.get(task_id as usize).copied().unwrap_or(false)
    }

    pub fn completed_count(&self) -> usize {
        self.completed.iter().filter(|&&done| done).count()
    }

    pub fn delivered_count(&self) -> usize {
        self.delivered.iter().filter(|&&done| done).count()
    }

    pub fn is_complete(&self) -> bool {
        self.completed_count() == self.n_tasks_total as usize
    }

    pub fn is_errored(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_active(&self) -> bool {
        !self.is_errored() && !self.is_complete()
    }

    pub fn append_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use broker_propagator::{AnalysisTask, GridDimensions, IterationSource};

    fn template() -> TaskTemplate {
        TaskTemplate {
            grid: GridDimensions { width: 1, height: 1 },
            analysis: AnalysisTask {
                percentiles: vec![50],
                cutoff_seconds: 600,
                iteration_source: IterationSource::MonteCarlo { draws: 1 },
                destination_opportunity_counts: None,
            },
        }
    }

    fn job(n: u32) -> Job {
        let origins = (0..n).map(|_| OriginCoordinates { lat: 0.0, lon: 0.0 }).collect();
        Job::new(
            JobId::new(),
            WorkerCategory::new("net", "1.0"),
            Vec::new(),
            template(),
            origins,
            false,
            9,
            DEFAULT_REDELIVERY_TIMEOUT,
        )
    }

    #[test]
    fn undelivered_tasks_are_preferred_over_redeliveries() {
        let mut job = job(5);
        let now = Instant::now();
        let first = job.generate_some_tasks_to_deliver(2, now);
        assert_eq!(first, vec![0, 1]);

        // Expire task 0's deadline, leaving it eligible for redelivery,
        // while tasks 2..5 remain wholly undelivered.
        let later = now + DEFAULT_REDELIVERY_TIMEOUT + Duration::from_secs(1);
        let second = job.generate_some_tasks_to_deliver(3, later);
        assert_eq!(second, vec![2, 3, 4]);
    }

    #[test]
    fn completion_is_idempotent() {
        let mut job = job(3);
        assert!(job.mark_task_completed(0));
        assert!(!job.mark_task_completed(0));
        assert_eq!(job.completed_count(), 1);
    }

    #[test]
    fn job_becomes_complete_only_once_every_task_is_completed() {
        let mut job = job(2);
        job.mark_task_completed(0);
        assert!(!job.is_complete());
        job.mark_task_completed(1);
        assert!(job.is_complete());
    }

    #[test]
    fn errored_job_stops_delivering_but_stays_queryable() {
        let mut job = job(3);
        job.append_error("worker blew up");
        assert!(job.is_errored());
        assert!(!job.is_active());
        assert!(job.generate_some_tasks_to_deliver(3, Instant::now()).is_empty());
    }

    #[test]
    fn redelivery_only_eligible_after_deadline_elapses() {
        let mut job = job(1);
        let now = Instant::now();
        job.generate_some_tasks_to_deliver(1, now);
        assert!(!job.has_tasks_to_deliver(now));
        let later = now + DEFAULT_REDELIVERY_TIMEOUT + Duration::from_secs(1);
        assert!(job.has_tasks_to_deliver(later));
    }
}
