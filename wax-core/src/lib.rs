//! Client-side data layer for the wax vinyl collection app.
//!
//! `api` holds the typed REST wrappers the rendering layer calls; `owners`
//! holds the owner-batching loader that backs the collection-sharing views.

pub mod api;
pub mod config;
pub mod owners;

pub use api::{ApiClient, ApiError};
pub use config::Config;
pub use owners::{OwnerScope, OwnersEvent, OwnersService};
