//! Connector operation module
//!
//! This module provides:
//! - `DocumentFacade`, the auto-commit vs. transactional entry points
//! - HTTP routes exposing each connector action

pub mod facade;
pub mod routes;

pub use facade::DocumentFacade;
pub use routes::{ConnectorAppState, connector_routes};
