//! Error types for the voyage engine.

use crate::models::RouteStatus;
use thiserror::Error;

/// Failures computing a single origin/destination route.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteError {
    #[error("invalid {label} coordinate ({lat}, {lon})")]
    InvalidCoordinate {
        label: &'static str,
        lat: f64,
        lon: f64,
    },
}

/// Failures sequencing a multi-stop voyage.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MultiStopError {
    #[error("at least one stop is required")]
    NoStops,
    #[error("duplicate stop id: {0}")]
    DuplicateStop(String),
    #[error(transparent)]
    Route(#[from] RouteError),
}

/// Rejected route lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot move route from {from:?} to {to:?}")]
pub struct StatusError {
    pub from: RouteStatus,
    pub to: RouteStatus,
}
