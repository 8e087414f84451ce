// Visitor sessions: a guest or authenticated identity plus assessment
// progress, persisted in a private cookie.

pub mod handlers;
pub mod models;
pub mod store;
