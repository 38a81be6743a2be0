//! Catalog/Order service: a stateless HTTP API over the document store,
//! gated by bearer-JWT auth.

pub mod auth;
pub mod error;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;

pub use error::ApiError;
pub use state::AppState;
pub use store::DocumentStore;
