use super::*;

#[post("/jobs")]
pub async fn post_job_handler(
    service: web::Data<JobService>,
    body: web::Json<SubmitRequest>,
) -> Result<HttpResponse, ServiceError> {
    let job_id = service.submit(body.into_inner()).await?;

    Ok(HttpResponse::Ok().json(SubmitResponse {
        job_id,
        created_time: create_timestamp(),
    }))
}
