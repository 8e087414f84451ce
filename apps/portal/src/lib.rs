//! Career assessment portal.
//!
//! - `assessment`: the client-side step machine and the state it carries
//! - `backend`: typed client for the external analysis service
//! - `session`: private-cookie visitor sessions and their HTTP handlers
//! - `routes`: the axum router (session endpoint, health, backend pass-through)

pub mod assessment;
pub mod backend;
pub mod config;
pub mod errors;
pub mod routes;
pub mod session;
pub mod state;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;
