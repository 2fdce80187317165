//! Error faults and optional debug detail for error bodies.
//!
//! A [`Fault`] pairs an error with the source location where it was raised.
//! Conversions into `Fault` are `#[track_caller]`, so `?` records the line
//! of the `?` itself.

use std::error::Error;
use std::fmt;
use std::panic::Location;

use serde::Serialize;

/// An error together with where it was raised.
#[derive(Debug)]
pub struct Fault<E> {
    error: E,
    location: &'static Location<'static>,
}

impl<E> Fault<E> {
    #[track_caller]
    pub fn new(error: E) -> Self {
        Self {
            error,
            location: Location::caller(),
        }
    }

    pub fn error(&self) -> &E {
        &self.error
    }
}

impl<E> From<E> for Fault<E> {
    #[track_caller]
    fn from(error: E) -> Self {
        Fault::new(error)
    }
}

impl<E: fmt::Display> fmt::Display for Fault<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at {})", self.error, self.location)
    }
}

impl<E: Error + 'static> Fault<E> {
    /// Debug detail for this fault.
    pub fn diagnostic(&self) -> Diagnostic {
        let mut trace = Vec::new();
        let mut source = self.error.source();
        while let Some(cause) = source {
            trace.push(cause.to_string());
            source = cause.source();
        }

        Diagnostic {
            kind: variant_name(&self.error),
            message: self.error.to_string(),
            file: self.location.file(),
            line: self.location.line(),
            trace,
        }
    }
}

/// `Type::Variant` for enum errors, `Type` otherwise.
///
/// The variant is the leading identifier of the derived `Debug` output.
fn variant_name<E: fmt::Debug>(error: &E) -> String {
    let full = std::any::type_name::<E>();
    let path = full.split('<').next().unwrap_or(full);
    let ty = path.rsplit("::").next().unwrap_or(path);

    let debug = format!("{error:?}");
    let variant = debug
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .next()
        .unwrap_or_default();

    if variant.is_empty() || variant == ty {
        ty.to_string()
    } else {
        format!("{ty}::{variant}")
    }
}

/// Debug detail attached to error bodies when diagnostics are enabled.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Diagnostic {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub file: &'static str,
    pub line: u32,
    pub trace: Vec<String>,
}
