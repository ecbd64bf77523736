use std::sync::Arc;

use actix_web::{web, HttpResponse};

use crate::metrics::registry::MetricsRegistry;

pub const CONTENT_TYPE_LATEST: &str = "text/plain; version=0.0.4";

pub async fn metrics_handler(registry: web::Data<Arc<MetricsRegistry>>) -> HttpResponse {
    match registry.encode() {
        Ok(buffer) => HttpResponse::Ok().content_type(CONTENT_TYPE_LATEST).body(buffer),
        Err(e) => {
            log::error!("Failed to encode metrics: {}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

pub fn init_metrics_service(cfg: &mut web::ServiceConfig, path: &str) {
    cfg.service(web::resource(path).name("metrics").route(web::get().to(metrics_handler)));
}
