//! Read-only HTTP surface for inspecting notification delivery.
//!
//! Endpoints:
//! - `GET /health`
//! - `GET /notifications/{id}/delivery-status`

pub mod routes;
pub mod state;
