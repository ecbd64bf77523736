//! The `rusty_prometheus::metrics` module holds everything needed to instrument requests.
//!
//! - 'registry' holds the Prometheus registry and the labeled metric handles.
//! - 'http_metrics' defines the three request families: `request_count`, `request_latency`
//!   and `requests_in_progress`.
//! - 'monitor' pairs the start and the end of one request and pushes its accounting.
//! - 'route' turns a matched route into a cardinality-safe path label.
//! - 'middleware' wraps an actix-web application with request monitors.
//! - 'labels' and 'timer' time any code into a labeled histogram.
pub mod http_metrics;
pub mod labels;
pub mod middleware;
pub mod monitor;
pub mod registry;
pub mod route;
pub mod timer;
