use actix_web::{App, HttpServer, dev::Server, middleware, web};

use crate::config::ServerConfig;
use crate::routes::{
    get_compile_output_handler, get_run_output_handler, get_status_handler, json_error_handler,
    post_job_handler,
};
use crate::service::JobService;

/// Registers the job routes on an actix-web app
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .service(post_job_handler)
        .service(get_status_handler)
        .service(get_compile_output_handler)
        .service(get_run_output_handler);
}

pub fn build_server(server_config: ServerConfig, service: web::Data<JobService>) -> std::io::Result<Server> {
    let bind_address = server_config
        .bind_address
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let bind_port = server_config.bind_port.unwrap_or(12345);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(service.clone())
            .wrap(middleware::Logger::default())
            .configure(configure)
    })
    .bind((bind_address.as_str(), bind_port))?
    .run();

    log::info!("Listening on {bind_address}:{bind_port}");
    Ok(server)
}
