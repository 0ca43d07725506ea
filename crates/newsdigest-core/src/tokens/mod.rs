//! Credential persistence.

mod repository;

pub use repository::SqliteTokenStore;
