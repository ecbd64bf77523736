//! Label values for metric families.
//!
//! A label is either a raw string or the underlying value of an enumerated symbol, for
//! example a `strum::IntoStaticStr` enum whose variants carry their wire value:
//!
//! ```
//! use rusty_prometheus::metrics::labels::{resolve, Label};
//! use strum_macros::IntoStaticStr;
//!
//! #[derive(Clone, Copy, IntoStaticStr)]
//! enum Status {
//!     #[strum(serialize = "200")]
//!     Ok,
//! }
//!
//! let labels = vec![Label::from("GET"), Label::symbol(Status::Ok)];
//! assert_eq!(resolve(&labels), vec!["GET".to_string(), "200".to_string()]);
//! ```

use std::{borrow::Cow, fmt};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Label {
    Raw(String),
    Symbol(Cow<'static, str>),
}

impl Label {
    pub fn symbol<S: Into<&'static str>>(symbol: S) -> Self {
        Label::Symbol(Cow::Borrowed(symbol.into()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Label::Raw(value) => value.as_str(),
            Label::Symbol(value) => value.as_ref(),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Label {
    fn from(value: &str) -> Self {
        Label::Raw(value.to_string())
    }
}

impl From<String> for Label {
    fn from(value: String) -> Self {
        Label::Raw(value)
    }
}

impl From<u16> for Label {
    fn from(value: u16) -> Self {
        Label::Raw(value.to_string())
    }
}

impl From<actix_web::http::Method> for Label {
    fn from(value: actix_web::http::Method) -> Self {
        Label::Raw(value.as_str().to_string())
    }
}

impl From<actix_web::http::StatusCode> for Label {
    fn from(value: actix_web::http::StatusCode) -> Self {
        Label::Raw(value.as_u16().to_string())
    }
}

/// Flatten `labels` into their string values, keeping order and duplicates.
pub fn resolve(labels: &[Label]) -> Vec<String> {
    labels.iter().map(|label| label.as_str().to_string()).collect()
}
