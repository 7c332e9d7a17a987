use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::CacheMiss;
use crate::config::LanguageConfig;
use crate::queue::{JobMessage, JobQueue};
use crate::results::{JobId, JobResults, JobStatus, Sdk};
use crate::worker::is_unit_test;
use crate::workspace::Workspaces;

/// Errors reported synchronously to callers of the service
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SubmitRequest {
    pub source_code: String,
    pub sdk: Sdk,
    #[serde(default)]
    pub pipeline_options: Option<String>,
}

/// Accepts jobs and answers polls about them. Jobs are executed by the
/// worker pool; everything a caller learns about a running job comes from
/// the result cache.
pub struct JobService {
    results: Arc<JobResults>,
    workspaces: Arc<Workspaces>,
    languages: Vec<LanguageConfig>,
    queue: Arc<JobQueue>,
}

impl JobService {
    pub fn new(
        results: Arc<JobResults>,
        workspaces: Arc<Workspaces>,
        languages: Vec<LanguageConfig>,
        queue: Arc<JobQueue>,
    ) -> Self {
        Self {
            results,
            workspaces,
            languages,
            queue,
        }
    }

    fn language(&self, sdk: Sdk) -> Option<&LanguageConfig> {
        self.languages.iter().find(|l| l.sdk == sdk)
    }

    /// Stores the source in a fresh workspace and queues the job. Returns
    /// before anything is compiled or run.
    pub async fn submit(&self, request: SubmitRequest) -> Result<JobId, ServiceError> {
        if request.source_code.trim().is_empty() {
            return Err(ServiceError::InvalidArgument(
                "source code must not be empty".to_string(),
            ));
        }
        let language = self.language(request.sdk).ok_or_else(|| {
            ServiceError::InvalidArgument(format!("sdk {} is not supported", request.sdk))
        })?;

        let job_id = JobId::new();
        let unit_test = is_unit_test(request.sdk, &request.source_code);
        let SubmitRequest {
            source_code,
            sdk,
            pipeline_options,
        } = request;

        let workspaces = Arc::clone(&self.workspaces);
        let task_language = language.clone();
        let paths = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
            let paths = workspaces
                .prepare(job_id, &task_language, unit_test)
                .with_context(|| format!("Failed to prepare workspace of job {job_id}"))?;
            if let Err(e) = workspaces.write_source(&paths, &source_code) {
                if let Err(cleanup) = workspaces.delete(&paths) {
                    log::warn!("Failed to delete workspace of job {job_id}: {cleanup:#}");
                }
                return Err(e);
            }
            Ok(paths)
        })
        .await
        .context("Workspace task failed")??;

        self.queue
            .push(JobMessage {
                job_id,
                language: language.clone(),
                paths,
                pipeline_options: pipeline_options.unwrap_or_default(),
                unit_test,
            })
            .await;
        log::info!("Queued {sdk} job {job_id}");

        Ok(job_id)
    }

    pub fn check_status(&self, job_id: JobId) -> Result<JobStatus, ServiceError> {
        self.results
            .status(job_id)
            .map_err(|miss| not_found(job_id, "status", miss))
    }

    pub fn get_compile_output(&self, job_id: JobId) -> Result<String, ServiceError> {
        self.results
            .compile_output(job_id)
            .map_err(|miss| not_found(job_id, "compile output", miss))
    }

    pub fn get_run_output(&self, job_id: JobId) -> Result<String, ServiceError> {
        self.results
            .run_output(job_id)
            .map_err(|miss| not_found(job_id, "run output", miss))
    }
}

// Expired and never written entries answer the same way
fn not_found(job_id: JobId, what: &str, miss: CacheMiss) -> ServiceError {
    log::debug!("No {what} for job {job_id}: {miss}");
    ServiceError::NotFound(format!("Job {job_id} has no {what}."))
}
