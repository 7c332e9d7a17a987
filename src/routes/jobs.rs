mod get;
mod post;

pub use get::{get_compile_output_handler, get_run_output_handler, get_status_handler};
pub use post::post_job_handler;

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};

use crate::create_timestamp;
use crate::results::{JobId, JobStatus};
use crate::service::{JobService, ServiceError, SubmitRequest};

#[derive(Serialize, Deserialize, Debug)]
pub struct SubmitResponse {
    pub job_id: JobId,
    pub created_time: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct StatusResponse {
    pub status: JobStatus,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct OutputResponse {
    pub output: String,
}

fn parse_job_id(raw: &str) -> Result<JobId, ServiceError> {
    raw.parse()
        .map_err(|_| ServiceError::InvalidArgument(format!("'{raw}' is not a valid job id")))
}
