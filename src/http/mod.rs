//! This module holds the HTTP side of RustyPrometheus: the scrape endpoint and the sample
//! routes served by the `rprom server` command. It utilizes the `actix_web` crate.

use actix_web::{web, HttpResponse};
use serde::Serialize;

pub mod metrics;

pub const METRICS_PATH_DEFAULT: &str = "/metrics";

#[derive(Serialize)]
struct ResourceInfo {
    version: String,
    resource_id: String,
}

async fn ping() -> HttpResponse {
    HttpResponse::Ok().json("pong")
}

async fn resource(path: web::Path<(String, String)>) -> HttpResponse {
    let (version, resource_id) = path.into_inner();
    HttpResponse::Ok().json(ResourceInfo { version, resource_id })
}

pub fn init_service(cfg: &mut web::ServiceConfig, metrics_path: &str) {
    cfg.service(web::resource("/ping").name("ping").route(web::get().to(ping)));
    cfg.service(web::resource("/{version}/resource/{resource_id}").name("resource").route(web::get().to(resource)));
    metrics::init_metrics_service(cfg, metrics_path);
}
