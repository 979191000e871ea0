//! Read-only inspection API over notification records.
//!
//! - GET /health
//! - GET /api/notifications/{id}

pub mod routes;
pub mod state;
