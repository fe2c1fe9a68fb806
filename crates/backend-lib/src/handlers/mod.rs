//! HTTP handlers: thin adapters between axum and the controllers.
pub mod account;
pub mod home;
