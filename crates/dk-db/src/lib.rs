//! dk-db - Store abstraction layer for Docket
//!
//! This crate provides the `DocumentStore` and `StoreConnector` traits and
//! their implementations for DuckDB and (with the `mongodb` feature) MongoDB.

pub mod connector;
pub mod duckdb;
pub mod error;
#[cfg(feature = "mongodb")]
pub mod mongo;
pub mod traits;

pub use connector::BackendConnector;
pub use duckdb::DuckDbStore;
pub use error::{DbError, DbResult};
#[cfg(feature = "mongodb")]
pub use mongo::MongoStore;
pub use traits::{DocumentStore, EvalResult, LedgerDocument, StoreConnector};
