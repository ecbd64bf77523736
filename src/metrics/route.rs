//! Route-path normalization.
//!
//! Metric labels built from raw request paths explode in cardinality as soon as a path
//! carries identifiers (`/v1/resource/1234`, `/v1/resource/4321`, ...). A
//! `RouteParameterPolicy` names, per route, the parameters whose concrete value must be
//! replaced by a `{name}` placeholder; every other parameter keeps its runtime value.
//!
//! Routes are identified by their actix name (`web::resource(..).name(..)`), or by their
//! pattern when they are unnamed.

use std::collections::{HashMap, HashSet};

use actix_web::{
    dev::{Path, ResourceDef},
    HttpRequest,
};
use serde_json::Value;

use crate::errors::MetricsError;

/// The route a request matched, with the parameter values captured from its path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteMatch {
    pub name: Option<String>,
    pub pattern: Option<String>,
    pub path: String,
    pub params: Vec<(String, String)>,
}

impl RouteMatch {
    pub fn new(path: &str) -> Self {
        Self { path: path.to_string(), ..Default::default() }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn pattern(mut self, pattern: &str) -> Self {
        self.pattern = Some(pattern.to_string());
        self
    }

    pub fn param(mut self, name: &str, value: &str) -> Self {
        self.params.push((name.to_string(), value.to_string()));
        self
    }

    /// Resolve the route of `req` against the application's resource map.
    ///
    /// Works before routing has run, which is where wrapping middleware sits: the pattern
    /// is looked up in the resource map and its parameters are captured from the path.
    pub fn from_request(req: &HttpRequest) -> Self {
        let path = req.path().to_string();
        let name = req.match_name().map(str::to_string);
        let pattern = req.match_pattern();

        let params = match pattern.as_deref() {
            Some(pattern) => capture_params(pattern, &path),
            None => Vec::new(),
        };

        Self { name, pattern, path, params }
    }
}

fn capture_params(pattern: &str, path: &str) -> Vec<(String, String)> {
    let def = ResourceDef::new(pattern);
    let mut resource = Path::new(path.to_string());
    if !def.capture_match_info(&mut resource) {
        return Vec::new();
    }

    resource.iter().map(|(name, value)| (name.to_string(), value.to_string())).collect()
}

/// Per-route set of parameters to replace by placeholders.
///
/// Entries are kept as given and checked when a route is looked up, so a malformed entry
/// fails the first request that needs it. `validate()` checks every entry up front.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteParameterPolicy {
    routes: HashMap<String, Value>,
}

impl RouteParameterPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route<I, S>(mut self, route: &str, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let params = params.into_iter().map(|p| Value::String(p.into())).collect();
        self.routes.insert(route.to_string(), Value::Array(params));
        self
    }

    /// Build a policy from an untyped config value. `null` is the empty policy; anything
    /// other than an object is rejected.
    pub fn from_value(value: &Value) -> Result<Self, MetricsError> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Object(map) => Ok(Self { routes: map.iter().map(|(k, v)| (k.clone(), v.clone())).collect() }),
            _ => Err(MetricsError::ErrRoutePolicyInvalid),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// The fixed parameter names of `route`, `None` when the policy has no entry for it.
    pub fn fixed_parameters(&self, route: &str) -> Result<Option<HashSet<&str>>, MetricsError> {
        let Some(value) = self.routes.get(route) else {
            return Ok(None);
        };

        let Value::Array(items) = value else {
            return Err(MetricsError::ErrRouteParametersInvalid(route.to_string()));
        };

        items
            .iter()
            .map(|item| item.as_str().ok_or_else(|| MetricsError::ErrRouteParametersInvalid(route.to_string())))
            .collect::<Result<HashSet<_>, _>>()
            .map(Some)
    }

    pub fn validate(&self) -> Result<(), MetricsError> {
        for route in self.routes.keys() {
            self.fixed_parameters(route)?;
        }
        Ok(())
    }

    fn lookup(&self, route: &RouteMatch) -> Result<Option<HashSet<&str>>, MetricsError> {
        for key in [route.name.as_deref(), route.pattern.as_deref()].into_iter().flatten() {
            if let Some(fixed) = self.fixed_parameters(key)? {
                return Ok(Some(fixed));
            }
        }
        Ok(None)
    }
}

/// Compute the metric label path of `route`.
///
/// Routes without a pattern or without a policy entry keep their raw path. Otherwise the
/// route pattern is rendered with `{name}` for fixed parameters and the captured value for
/// the others. When the captured values cannot fill the pattern, the pattern itself is
/// returned, so a fixed parameter value never reaches the label.
pub fn normalize(route: &RouteMatch, policy: &RouteParameterPolicy) -> Result<String, MetricsError> {
    let Some(pattern) = route.pattern.as_deref() else {
        return Ok(route.path.clone());
    };

    let Some(fixed) = policy.lookup(route)? else {
        return Ok(route.path.clone());
    };

    let values: HashMap<&str, String> = route
        .params
        .iter()
        .map(|(name, value)| {
            let value = if fixed.contains(name.as_str()) { format!("{{{}}}", name) } else { value.clone() };
            (name.as_str(), value)
        })
        .collect();

    let mut rendered = String::new();
    if !ResourceDef::new(pattern).resource_path_from_map(&mut rendered, &values) {
        log::warn!("cannot render route pattern {} for path {}, using the pattern", pattern, route.path);
        return Ok(pattern.to_string());
    }

    Ok(rendered)
}
