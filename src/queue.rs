use std::collections::VecDeque;

use tokio::sync::{Mutex, Notify};

use crate::config::LanguageConfig;
use crate::results::JobId;
use crate::workspace::WorkspacePaths;

/// A submitted job whose workspace is ready, waiting for a worker
#[derive(Debug, Clone)]
pub struct JobMessage {
    pub job_id: JobId,
    pub language: LanguageConfig,
    pub paths: WorkspacePaths,
    pub pipeline_options: String,
    pub unit_test: bool,
}

/// FIFO of jobs waiting for a worker. Never rejects a push.
pub struct JobQueue {
    queue: Mutex<VecDeque<JobMessage>>,
    notify: Notify,
}

impl JobQueue {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        }
    }

    pub async fn push(&self, job: JobMessage) {
        self.queue.lock().await.push_back(job);
        self.notify.notify_one();
    }

    /// Waits until a job is available
    pub async fn pop(&self) -> JobMessage {
        loop {
            if let Some(job) = self.queue.lock().await.pop_front() {
                return job;
            }
            self.notify.notified().await;
        }
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.queue.lock().await.len()
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}
