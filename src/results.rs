use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cache::{CacheError, CacheMiss, ResultCache};

/// Opaque identifier minted for every submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sdk {
    Java,
    Go,
    Python,
    Scio,
}

impl fmt::Display for Sdk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Java => "java",
            Self::Go => "go",
            Self::Python => "python",
            Self::Scio => "scio",
        };
        f.write_str(name)
    }
}

/// Observable state of a job. A job without any status entry is reported
/// as not found, never as one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Executing,
    Finished,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheTag {
    Status,
    CompileOutput,
    RunOutput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub job_id: JobId,
    pub tag: CacheTag,
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:?}", self.job_id, self.tag)
    }
}

/// Value stored per job. The tag a value is stored under is derived from
/// its variant, so a read under a tag always yields that variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobValue {
    Status(JobStatus),
    CompileOutput(String),
    RunOutput(String),
}

impl JobValue {
    pub fn tag(&self) -> CacheTag {
        match self {
            Self::Status(_) => CacheTag::Status,
            Self::CompileOutput(_) => CacheTag::CompileOutput,
            Self::RunOutput(_) => CacheTag::RunOutput,
        }
    }
}

/// Per-job view over the shared result cache
pub struct JobResults {
    cache: ResultCache<CacheKey, JobValue>,
}

impl JobResults {
    pub fn new(cache: ResultCache<CacheKey, JobValue>) -> Self {
        Self { cache }
    }

    /// Builds the cache and starts its expiry sweep on the current runtime
    pub fn start(capacity: usize, ttl: Duration, sweep_interval: Duration) -> Result<Self, CacheError> {
        let cache = ResultCache::new(capacity, ttl)?;
        cache.spawn_sweeper(sweep_interval)?;
        Ok(Self::new(cache))
    }

    pub fn set(&self, job_id: JobId, value: JobValue) {
        let key = CacheKey {
            job_id,
            tag: value.tag(),
        };
        self.cache.set(key, value);
    }

    pub fn set_status(&self, job_id: JobId, status: JobStatus) {
        self.set(job_id, JobValue::Status(status));
    }

    pub fn set_compile_output(&self, job_id: JobId, output: String) {
        self.set(job_id, JobValue::CompileOutput(output));
    }

    pub fn set_run_output(&self, job_id: JobId, output: String) {
        self.set(job_id, JobValue::RunOutput(output));
    }

    pub fn status(&self, job_id: JobId) -> Result<JobStatus, CacheMiss> {
        match self.get(job_id, CacheTag::Status)? {
            JobValue::Status(status) => Ok(status),
            _ => unreachable!("values are keyed by their own tag"),
        }
    }

    pub fn compile_output(&self, job_id: JobId) -> Result<String, CacheMiss> {
        match self.get(job_id, CacheTag::CompileOutput)? {
            JobValue::CompileOutput(output) => Ok(output),
            _ => unreachable!("values are keyed by their own tag"),
        }
    }

    pub fn run_output(&self, job_id: JobId) -> Result<String, CacheMiss> {
        match self.get(job_id, CacheTag::RunOutput)? {
            JobValue::RunOutput(output) => Ok(output),
            _ => unreachable!("values are keyed by their own tag"),
        }
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    fn get(&self, job_id: JobId, tag: CacheTag) -> Result<JobValue, CacheMiss> {
        self.cache.get(&CacheKey { job_id, tag })
    }
}
