use std::{env, path::PathBuf, sync::Arc};

use actix_web::{middleware, web, App, HttpServer};
use clap::Parser;
use derive_more::Deref;
use sysexits::ExitCode;

use crate::{
    cli::command::{self, CheckedConfig},
    errors::MetricsError,
    http,
    metrics::{http_metrics::HttpMetrics, middleware::RequestMetrics, registry::MetricsRegistry},
    BUILD_TIME, EXIT_CODE_INSUFFICIENT_PARAMS, EXIT_CODE_LOAD_CONFIG_FAILURE, EXIT_CODE_OK,
    EXIT_CODE_SERVER_EXIT_UNEXPECTEDLY, VERSION,
};

#[derive(Parser, Deref)]
#[command(
    author,
    version,
    about = r#"This command starts an instrumented RustyPrometheus sample server. Every request
it handles is counted and timed, and the metrics are exposed in the Prometheus text
format on the configured scrape path ("/metrics" by default).

Start a server with a configuration file:

  $ rprom server --config=/etc/rprom/config.hcl"#
)]
pub struct Server {
    #[deref]
    #[command(flatten, next_help_heading = "Command Options")]
    command_options: command::CommandOptions,
}

impl Server {
    #[inline]
    pub fn execute(&mut self) -> ExitCode {
        let Some(config_path) = self.config_path() else {
            return EXIT_CODE_INSUFFICIENT_PARAMS;
        };

        let checked = match self.load_config(config_path) {
            Ok(checked) => checked,
            Err(e) => {
                eprintln!("server config error: {}", e);
                return EXIT_CODE_LOAD_CONFIG_FAILURE;
            }
        };

        match self.main(config_path, checked) {
            Ok(_) => EXIT_CODE_OK,
            Err(e) => {
                log::error!("server error: {}", e);
                EXIT_CODE_SERVER_EXIT_UNEXPECTEDLY
            }
        }
    }

    pub fn main(&self, config_path: &PathBuf, checked: CheckedConfig) -> Result<(), MetricsError> {
        let CheckedConfig { config, policy, shutdown_timeout } = checked;

        env::set_var("RUST_LOG", self.log_level(&config));
        env_logger::init();

        let (_, listener) = config.listener.iter().next().ok_or(MetricsError::ErrConfigListenerNotFound)?;
        let listener = listener.clone();
        let metrics_config = config.metrics.clone();

        log::debug!("config_path: {}, metrics: {:?}", config_path.to_string_lossy(), metrics_config);

        let server = actix_rt::System::new();

        let registry = Arc::new(MetricsRegistry::new());
        let http_metrics = Arc::new(HttpMetrics::new(&registry)?);

        let request_metrics = RequestMetrics::new(http_metrics)
            .init_metrics(metrics_config.init_metrics)
            .end_metrics(metrics_config.end_metrics)
            .fixed_route_parameters(policy);
        let metrics_path = metrics_config.path.clone();

        let http_server = HttpServer::new(move || {
            let metrics_path = metrics_path.clone();
            App::new()
                .wrap(request_metrics.clone())
                .wrap(middleware::Logger::default())
                .app_data(web::Data::new(Arc::clone(&registry)))
                .configure(move |cfg| http::init_service(cfg, &metrics_path))
        })
        .shutdown_timeout(shutdown_timeout.as_secs())
        .bind(listener.address.as_str())?;

        log::info!(
            "rusty_prometheus {} (built {}) starts, listen addr: {}, metrics path: {}, waiting for request...",
            VERSION,
            BUILD_TIME,
            listener.address,
            metrics_config.path
        );

        server.block_on(async { http_server.run().await })?;

        Ok(())
    }
}
