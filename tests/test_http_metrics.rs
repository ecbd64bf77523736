use std::sync::Arc;

use actix_web::{dev::Service, http::StatusCode, test, web, App};
use rusty_prometheus::{
    http::{self, METRICS_PATH_DEFAULT},
    metrics::{
        http_metrics::HttpMetrics,
        middleware::RequestMetrics,
        registry::MetricsRegistry,
        route::RouteParameterPolicy,
    },
};
use serde_json::json;

fn setup() -> (Arc<MetricsRegistry>, RequestMetrics) {
    let registry = Arc::new(MetricsRegistry::new());
    let metrics = Arc::new(HttpMetrics::new(&registry).unwrap());
    let policy = RouteParameterPolicy::from_value(&json!({ "resource": ["resource_id"] })).unwrap();

    (registry, RequestMetrics::new(metrics).fixed_route_parameters(policy))
}

#[actix_rt::test]
async fn test_scrape_after_ping() {
    let (registry, request_metrics) = setup();

    let app = test::init_service(
        App::new()
            .wrap(request_metrics)
            .app_data(web::Data::new(Arc::clone(&registry)))
            .configure(|cfg| http::init_service(cfg, METRICS_PATH_DEFAULT)),
    )
    .await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/ping").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = test::call_and_read_body(&app, test::TestRequest::get().uri(METRICS_PATH_DEFAULT).to_request()).await;
    let text = String::from_utf8(body.to_vec()).unwrap();

    assert!(text.contains(r#"request_count_total{method="GET",path="/ping",status="200"} 1"#));
    assert!(text.contains(r#"request_latency_sum{method="GET",path="/ping"}"#));
    assert!(text.contains(r#"request_latency_count{method="GET",path="/ping"} 1"#));
    assert!(text.contains(r#"requests_in_progress{method="GET",path="/ping"} 0"#));

    // the scrape itself is still in flight while the registry is encoded
    assert!(text.contains(r#"requests_in_progress{method="GET",path="/metrics"} 1"#));
    assert!(!text.contains(r#"request_count_total{method="GET",path="/metrics""#));

    let text = registry.encode().unwrap();
    assert!(text.contains(r#"request_count_total{method="GET",path="/metrics",status="200"} 1"#));
    assert!(text.contains(r#"requests_in_progress{method="GET",path="/metrics"} 0"#));
}

#[actix_rt::test]
async fn test_fixed_route_parameters() {
    let (registry, request_metrics) = setup();

    let app = test::init_service(
        App::new()
            .wrap(request_metrics)
            .app_data(web::Data::new(Arc::clone(&registry)))
            .configure(|cfg| http::init_service(cfg, METRICS_PATH_DEFAULT)),
    )
    .await;

    for uri in ["/v1/resource/1234", "/v1/resource/4321", "/v2/resource/1234"] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = test::call_service(&app, test::TestRequest::get().uri("/missing").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let text = registry.encode().unwrap();
    assert!(text.contains(r#"request_count_total{method="GET",path="/v1/resource/{resource_id}",status="200"} 2"#));
    assert!(text.contains(r#"request_count_total{method="GET",path="/v2/resource/{resource_id}",status="200"} 1"#));
    assert!(!text.contains("/v1/resource/1234"));
    assert!(text.contains(r#"request_count_total{method="GET",path="/missing",status="404"} 1"#));
}

#[actix_rt::test]
async fn test_invalid_fixed_route_parameters() {
    let registry = Arc::new(MetricsRegistry::new());
    let metrics = Arc::new(HttpMetrics::new(&registry).unwrap());
    let policy = RouteParameterPolicy::from_value(&json!({ "resource": 16 })).unwrap();
    assert!(policy.validate().unwrap_err().is_configuration_error());

    let app = test::init_service(
        App::new()
            .wrap(RequestMetrics::new(metrics).fixed_route_parameters(policy))
            .app_data(web::Data::new(Arc::clone(&registry)))
            .configure(|cfg| http::init_service(cfg, METRICS_PATH_DEFAULT)),
    )
    .await;

    // routes without an entry are unaffected
    let resp = test::call_service(&app, test::TestRequest::get().uri("/ping").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let err = app.call(test::TestRequest::get().uri("/v1/resource/1234").to_request()).await.err().unwrap();
    assert_eq!(err.error_response().status(), StatusCode::INTERNAL_SERVER_ERROR);

    let text = registry.encode().unwrap();
    assert!(text.contains(r#"request_count_total{method="GET",path="/ping",status="200"} 1"#));
    assert!(!text.contains("/resource/"));
}
