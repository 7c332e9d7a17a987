pub mod builder;
pub mod cache;
pub mod config;
pub mod executor;
pub mod queue;
pub mod results;
pub mod routes;
pub mod service;
pub mod web_server;
pub mod worker;
pub mod workspace;

pub fn create_timestamp() -> String {
    use chrono::{SecondsFormat, Utc};
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
