//! Per-job state shared between the controller and the job's own task.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Identifier of a submitted job. Ids come from a per-controller generation
/// counter and increase with every submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub(crate) u64);

impl JobId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a job. `Running` moves to exactly one of the other two.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Running = 0,
    Cancelled = 1,
    Completed = 2,
}

impl JobState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Running,
            1 => Self::Cancelled,
            _ => Self::Completed,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Job {
    id: JobId,
    state: AtomicU8,
}

impl Job {
    pub(crate) fn new(id: JobId) -> Self {
        Self {
            id,
            state: AtomicU8::new(JobState::Running as u8),
        }
    }

    pub(crate) fn id(&self) -> JobId {
        self.id
    }

    pub(crate) fn state(&self) -> JobState {
        JobState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.state() == JobState::Cancelled
    }

    /// Running → Cancelled. Returns false if the job already finished either way.
    pub(crate) fn cancel(&self) -> bool {
        self.transition(JobState::Cancelled)
    }

    /// Running → Completed. Returns false if a cancellation got there first.
    pub(crate) fn complete(&self) -> bool {
        self.transition(JobState::Completed)
    }

    fn transition(&self, to: JobState) -> bool {
        self.state
            .compare_exchange(
                JobState::Running as u8,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_wins_over_complete() {
        let job = Job::new(JobId(1));
        assert!(job.cancel());
        assert!(!job.complete());
        assert_eq!(job.state(), JobState::Cancelled);
    }

    #[test]
    fn test_complete_wins_over_cancel() {
        let job = Job::new(JobId(2));
        assert!(job.complete());
        assert!(!job.cancel());
        assert!(!job.is_cancelled());
        assert_eq!(job.state(), JobState::Completed);
    }

    #[test]
    fn test_job_id_display() {
        assert_eq!(JobId(42).to_string(), "42");
        assert!(JobId(1) < JobId(2));
    }
}
