mod jobs;

pub use jobs::*;

use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use serde::Serialize;

use crate::service::ServiceError;

#[derive(Serialize)]
struct ErrorResponse {
    reason: &'static str,
    code: u32,
}

#[derive(Serialize)]
struct ErrorResponseWithMessage {
    reason: &'static str,
    code: u32,
    message: String,
}

pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let response = HttpResponse::BadRequest().json(ErrorResponse {
        reason: "ERR_INVALID_ARGUMENT",
        code: 1,
    });
    InternalError::from_response(err, response).into()
}

impl ServiceError {
    fn reason(&self) -> (&'static str, u32) {
        match self {
            Self::InvalidArgument(_) => ("ERR_INVALID_ARGUMENT", 1),
            Self::NotFound(_) => ("ERR_NOT_FOUND", 3),
            Self::Internal(_) => ("ERR_INTERNAL", 6),
        }
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let (reason, code) = self.reason();
        if let Self::Internal(e) = self {
            log::error!("Internal error: {e:#}");
        }
        HttpResponse::build(self.status_code()).json(ErrorResponseWithMessage {
            reason,
            code,
            message: self.to_string(),
        })
    }
}
