use std::{
    future::{ready, Future, Ready},
    pin::Pin,
    rc::Rc,
    sync::Arc,
};

use actix_web::{
    body::MessageBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};

use super::{
    http_metrics::RequestRecorder,
    monitor::{MonitorOptions, RequestDescriptor, RequestMonitor},
    route::{RouteMatch, RouteParameterPolicy},
};

/// Middleware monitoring every request that goes through it.
///
/// ```ignore
/// let registry = Arc::new(MetricsRegistry::new());
/// let metrics = Arc::new(HttpMetrics::new(&registry)?);
/// let policy = RouteParameterPolicy::new().with_route("resource", ["resource_id"]);
///
/// HttpServer::new(move || {
///     App::new()
///         .wrap(RequestMetrics::new(metrics.clone()).fixed_route_parameters(policy.clone()))
///         .service(web::resource("/{version}/resource/{resource_id}").name("resource").to(handler))
/// })
/// ```
///
/// The route name (or, for unnamed routes, the route pattern) selects the policy entry.
/// A malformed entry fails the request with the configuration error. Errors coming from
/// the wrapped service, including handler errors actix has already turned into a
/// response, are returned as they are after being counted with status 500.
#[derive(Clone)]
pub struct RequestMetrics {
    recorder: Arc<dyn RequestRecorder>,
    options: MonitorOptions,
    policy: Arc<RouteParameterPolicy>,
}

impl RequestMetrics {
    pub fn new(recorder: Arc<dyn RequestRecorder>) -> Self {
        Self { recorder, options: MonitorOptions::default(), policy: Arc::new(RouteParameterPolicy::default()) }
    }

    /// Count requests as in flight while they are handled. Defaults to true.
    pub fn init_metrics(mut self, enabled: bool) -> Self {
        self.options.record_on_enter = enabled;
        self
    }

    /// Record count and latency when requests complete. Defaults to true.
    pub fn end_metrics(mut self, enabled: bool) -> Self {
        self.options.record_on_exit = enabled;
        self
    }

    pub fn fixed_route_parameters(mut self, policy: RouteParameterPolicy) -> Self {
        self.policy = Arc::new(policy);
        self
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequestMetrics
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RequestMetricsMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestMetricsMiddleware {
            service: Rc::new(service),
            recorder: Arc::clone(&self.recorder),
            options: self.options,
            policy: Arc::clone(&self.policy),
        }))
    }
}

pub struct RequestMetricsMiddleware<S> {
    service: Rc<S>,
    recorder: Arc<dyn RequestRecorder>,
    options: MonitorOptions,
    policy: Arc<RouteParameterPolicy>,
}

impl<S, B> Service<ServiceRequest> for RequestMetricsMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let recorder = Arc::clone(&self.recorder);
        let options = self.options;
        let policy = Arc::clone(&self.policy);

        Box::pin(async move {
            let route = RouteMatch::from_request(req.request());
            let request = RequestDescriptor::from_route(req.method(), &route, &policy)?;

            RequestMonitor::new(request, recorder, options)
                .run(service.call(req), |res| match res.response().error() {
                    Some(_) => None,
                    None => Some(res.status().as_u16()),
                })
                .await
        })
    }
}

#[cfg(test)]
mod test {
    use actix_web::{
        dev::{Service, ServiceResponse},
        error::{ErrorBadRequest, ErrorServiceUnavailable},
        http::StatusCode,
        test, web, App, HttpResponse,
    };
    use serde_json::json;

    use super::*;
    use crate::{
        errors::MetricsError,
        metrics::{
            http_metrics::HttpMetrics,
            registry::{LabeledMetric, MetricsRegistry},
        },
    };

    const RESOURCE: &str = "/{version}/resource/{resource_id}";

    async fn resource() -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    async fn broken() -> Result<HttpResponse, Error> {
        Err(ErrorBadRequest("bad input"))
    }

    fn count(metrics: &HttpMetrics, method: &str, path: &str, status: &str) -> u64 {
        metrics.request_count().labels(&[method, path, status]).unwrap().get()
    }

    fn in_progress(metrics: &HttpMetrics, method: &str, path: &str) -> i64 {
        metrics.requests_in_progress().labels(&[method, path]).unwrap().get()
    }

    #[actix_rt::test]
    async fn test_middleware_fixed_route_parameters() {
        let registry = MetricsRegistry::new();
        let metrics = Arc::new(HttpMetrics::new(&registry).unwrap());
        let policy = RouteParameterPolicy::new().with_route("resource", ["resource_id"]);

        let app = test::init_service(
            App::new()
                .wrap(RequestMetrics::new(metrics.clone()).fixed_route_parameters(policy))
                .service(web::resource(RESOURCE).name("resource").route(web::get().to(resource))),
        )
        .await;

        for uri in ["/v1/resource/1234", "/v1/resource/4321"] {
            let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
            assert_eq!(resp.status(), StatusCode::OK);
        }

        assert_eq!(count(&metrics, "GET", "/v1/resource/{resource_id}", "200"), 2);
        assert_eq!(count(&metrics, "GET", "/v1/resource/1234", "200"), 0);
        assert_eq!(in_progress(&metrics, "GET", "/v1/resource/{resource_id}"), 0);
    }

    #[actix_rt::test]
    async fn test_middleware_unnamed_route_and_raw_path() {
        let registry = MetricsRegistry::new();
        let metrics = Arc::new(HttpMetrics::new(&registry).unwrap());
        let policy = RouteParameterPolicy::new().with_route(RESOURCE, ["resource_id"]);

        let app = test::init_service(
            App::new()
                .wrap(RequestMetrics::new(metrics.clone()).fixed_route_parameters(policy))
                .route(RESOURCE, web::get().to(resource))
                .route("/ping", web::get().to(resource)),
        )
        .await;

        test::call_service(&app, test::TestRequest::get().uri("/v2/resource/1").to_request()).await;
        test::call_service(&app, test::TestRequest::get().uri("/ping").to_request()).await;
        test::call_service(&app, test::TestRequest::get().uri("/missing").to_request()).await;

        assert_eq!(count(&metrics, "GET", "/v2/resource/{resource_id}", "200"), 1);
        assert_eq!(count(&metrics, "GET", "/ping", "200"), 1);
        assert_eq!(count(&metrics, "GET", "/missing", "404"), 1);
    }

    #[actix_rt::test]
    async fn test_middleware_handler_error_response() {
        let registry = MetricsRegistry::new();
        let metrics = Arc::new(HttpMetrics::new(&registry).unwrap());

        let app = test::init_service(
            App::new().wrap(RequestMetrics::new(metrics.clone())).route("/broken", web::post().to(broken)),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::post().uri("/broken").to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(resp.response().error().unwrap().to_string(), "bad input");

        assert_eq!(count(&metrics, "POST", "/broken", "500"), 1);
        assert_eq!(count(&metrics, "POST", "/broken", "400"), 0);
        assert_eq!(in_progress(&metrics, "POST", "/broken"), 0);
    }

    #[actix_rt::test]
    async fn test_middleware_service_error_propagates() {
        let registry = MetricsRegistry::new();
        let metrics = Arc::new(HttpMetrics::new(&registry).unwrap());

        let app = test::init_service(
            App::new()
                .wrap_fn(|_req, _srv| async { Err::<ServiceResponse, Error>(ErrorServiceUnavailable("maintenance")) })
                .wrap(RequestMetrics::new(metrics.clone()))
                .route("/ping", web::get().to(resource)),
        )
        .await;

        let err = app.call(test::TestRequest::get().uri("/ping").to_request()).await.err().unwrap();
        assert_eq!(err.to_string(), "maintenance");
        assert_eq!(err.as_response_error().status_code(), StatusCode::SERVICE_UNAVAILABLE);

        assert_eq!(count(&metrics, "GET", "/ping", "500"), 1);
        assert_eq!(count(&metrics, "GET", "/ping", "503"), 0);
        assert_eq!(in_progress(&metrics, "GET", "/ping"), 0);
    }

    #[actix_rt::test]
    async fn test_middleware_invalid_policy() {
        let registry = MetricsRegistry::new();
        let metrics = Arc::new(HttpMetrics::new(&registry).unwrap());
        let policy = RouteParameterPolicy::from_value(&json!({ "resource": 16 })).unwrap();

        let app = test::init_service(
            App::new()
                .wrap(RequestMetrics::new(metrics.clone()).fixed_route_parameters(policy))
                .service(web::resource(RESOURCE).name("resource").route(web::get().to(resource))),
        )
        .await;

        let err = app.call(test::TestRequest::get().uri("/v1/resource/1234").to_request()).await.err().unwrap();
        let err = err.as_error::<MetricsError>().unwrap();
        assert!(err.is_configuration_error());

        let text = registry.encode().unwrap();
        assert!(!text.contains("request_count_total{"));
        assert!(!text.contains("requests_in_progress{"));
    }

    #[actix_rt::test]
    async fn test_middleware_options() {
        let registry = MetricsRegistry::new();
        let metrics = Arc::new(HttpMetrics::new(&registry).unwrap());

        let app = test::init_service(
            App::new().wrap(RequestMetrics::new(metrics.clone()).end_metrics(false)).route("/ping", web::get().to(resource)),
        )
        .await;

        test::call_service(&app, test::TestRequest::get().uri("/ping").to_request()).await;
        assert_eq!(count(&metrics, "GET", "/ping", "200"), 0);
        assert_eq!(in_progress(&metrics, "GET", "/ping"), 0);

        let app = test::init_service(
            App::new().wrap(RequestMetrics::new(metrics.clone()).init_metrics(false)).route("/ping", web::get().to(resource)),
        )
        .await;

        test::call_service(&app, test::TestRequest::get().uri("/ping").to_request()).await;
        assert_eq!(count(&metrics, "GET", "/ping", "200"), 1);
        assert_eq!(in_progress(&metrics, "GET", "/ping"), 0);
    }
}
