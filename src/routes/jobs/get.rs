use super::*;

#[get("/jobs/{id}/status")]
pub async fn get_status_handler(
    service: web::Data<JobService>,
    path: web::Path<(String,)>,
) -> Result<HttpResponse, ServiceError> {
    let job_id = parse_job_id(&path.into_inner().0)?;
    let status = service.check_status(job_id)?;

    log::debug!("Job {job_id} is {status:?}");
    Ok(HttpResponse::Ok().json(StatusResponse { status }))
}

#[get("/jobs/{id}/compile_output")]
pub async fn get_compile_output_handler(
    service: web::Data<JobService>,
    path: web::Path<(String,)>,
) -> Result<HttpResponse, ServiceError> {
    let job_id = parse_job_id(&path.into_inner().0)?;
    let output = service.get_compile_output(job_id)?;

    Ok(HttpResponse::Ok().json(OutputResponse { output }))
}

#[get("/jobs/{id}/run_output")]
pub async fn get_run_output_handler(
    service: web::Data<JobService>,
    path: web::Path<(String,)>,
) -> Result<HttpResponse, ServiceError> {
    let job_id = parse_job_id(&path.into_inner().0)?;
    let output = service.get_run_output(job_id)?;

    Ok(HttpResponse::Ok().json(OutputResponse { output }))
}
