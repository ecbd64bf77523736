use std::{
    fmt, io,
    sync::{MutexGuard, PoisonError},
};

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("The request response has not been observed. Use the method 'observe'.")]
    ErrUnobservedResponse,
    #[error("Fixed route parameters must be a mapping from route name to a collection of parameter names.")]
    ErrRoutePolicyInvalid,
    #[error("Fixed route parameters of route '{0}' must be a collection of parameter names.")]
    ErrRouteParametersInvalid(String),
    #[error("Metric '{name}' expects {expected} label values, got {got}.")]
    ErrMetricLabelsMismatch { name: String, expected: usize, got: usize },
    #[error("Metric '{0}' is already registered.")]
    ErrMetricAlreadyRegistered(String),
    #[error("Config path is invalid.")]
    ErrConfigPathInvalid,
    #[error("Config load failed.")]
    ErrConfigLoadFailed,
    #[error("Config listener not found.")]
    ErrConfigListenerNotFound,
    #[error("Config duration '{0}' is invalid.")]
    ErrConfigDurationInvalid(String),
    #[error("Some IO error happened, {:?}", .source)]
    IO {
        #[from]
        source: io::Error,
    },
    #[error("Some serde error happened, {:?}", .source)]
    Serde {
        #[from]
        source: serde_json::Error,
    },
    #[error("Some hcl error happened, {:?}", .source)]
    Hcl {
        #[from]
        source: hcl::Error,
    },
    #[error("Metrics encoding failed, {:?}", .source)]
    Encode {
        #[from]
        source: fmt::Error,
    },
    #[error("Mutex was poisoned")]
    ErrMutexPoison,
    #[error(transparent)]
    ErrOther(#[from] anyhow::Error),
    #[error("Unknown error.")]
    ErrUnknown,
}

impl MetricsError {
    /// Whether the error comes from a malformed route parameter policy.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, MetricsError::ErrRoutePolicyInvalid | MetricsError::ErrRouteParametersInvalid(_))
    }
}

impl PartialEq for MetricsError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (MetricsError::ErrUnobservedResponse, MetricsError::ErrUnobservedResponse)
            | (MetricsError::ErrRoutePolicyInvalid, MetricsError::ErrRoutePolicyInvalid)
            | (MetricsError::ErrConfigPathInvalid, MetricsError::ErrConfigPathInvalid)
            | (MetricsError::ErrConfigLoadFailed, MetricsError::ErrConfigLoadFailed)
            | (MetricsError::ErrConfigListenerNotFound, MetricsError::ErrConfigListenerNotFound)
            | (MetricsError::ErrMutexPoison, MetricsError::ErrMutexPoison)
            | (MetricsError::ErrUnknown, MetricsError::ErrUnknown) => true,
            (MetricsError::ErrRouteParametersInvalid(a), MetricsError::ErrRouteParametersInvalid(b))
            | (MetricsError::ErrMetricAlreadyRegistered(a), MetricsError::ErrMetricAlreadyRegistered(b))
            | (MetricsError::ErrConfigDurationInvalid(a), MetricsError::ErrConfigDurationInvalid(b)) => a == b,
            (
                MetricsError::ErrMetricLabelsMismatch { name: n1, expected: e1, got: g1 },
                MetricsError::ErrMetricLabelsMismatch { name: n2, expected: e2, got: g2 },
            ) => n1 == n2 && e1 == e2 && g1 == g2,
            _ => false,
        }
    }
}

impl<T> From<PoisonError<MutexGuard<'_, T>>> for MetricsError {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        MetricsError::ErrMutexPoison
    }
}

impl ResponseError for MetricsError {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
