//! This crate is the 'library' part of RustyPrometheus, Prometheus instrumentation for
//! actix-web servers. It works in two ways independently:
//!
//! 1. A standalone `rprom` application serving an instrumented sample server, configured by an
//!    HCL or JSON file;
//! 2. A Rust crate that wraps any actix-web application with request metrics.
//!
//! For every request going through the [`metrics::middleware::RequestMetrics`] middleware three
//! metrics are maintained:
//!
//! - `request_count{method,path,status}`, a counter exposed as `request_count_total`;
//! - `request_latency{method,path}`, a histogram of the handling time in seconds;
//! - `requests_in_progress{method,path}`, a gauge of the requests being handled.
//!
//! The `path` label is the raw request path unless the route has fixed parameters, in which case
//! those parameters are replaced by their `{name}` placeholder so that the label stays bounded.
//!
//! ```ignore
//! let registry = Arc::new(MetricsRegistry::new());
//! let metrics = Arc::new(HttpMetrics::new(&registry)?);
//! let policy = RouteParameterPolicy::new().with_route("resource", ["resource_id"]);
//!
//! HttpServer::new(move || {
//!     App::new()
//!         .wrap(RequestMetrics::new(metrics.clone()).fixed_route_parameters(policy.clone()))
//!         .app_data(web::Data::new(registry.clone()))
//!         .configure(|cfg| http::init_service(cfg, http::METRICS_PATH_DEFAULT))
//! })
//! ```

pub mod cli;
pub mod errors;
pub mod http;
pub mod metrics;

#[cfg(test)]
pub mod test_utils;

/// Exit ok
pub const EXIT_CODE_OK: sysexits::ExitCode = sysexits::ExitCode::Ok;
/// Exit code when server exits unexpectedly
pub const EXIT_CODE_SERVER_EXIT_UNEXPECTEDLY: sysexits::ExitCode = sysexits::ExitCode::Software;
/// Exit code when loading configuration from file fails
pub const EXIT_CODE_LOAD_CONFIG_FAILURE: sysexits::ExitCode = sysexits::ExitCode::Config;
/// Exit code when insufficient params are passed via CLI
pub const EXIT_CODE_INSUFFICIENT_PARAMS: sysexits::ExitCode = sysexits::ExitCode::Usage;

/// Build timestamp in UTC
pub const BUILD_TIME: &str = build_time::build_time_utc!();

/// rusty_prometheus version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
