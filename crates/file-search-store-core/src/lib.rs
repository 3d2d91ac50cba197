//! # File Search Store Core
//!
//! Transport-free building blocks for managing hosted file-search stores
//! and asking grounded questions against them.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | Stores, documents, metadata, operations, citations |
//! | [`generation`] | Wire types for grounded `generateContent` calls |
//! | [`api`] | The [`FileSearchApi`] trait and an in-memory implementation |
//! | [`poll`] | Long-running-operation poller |
//! | [`stores`] | Store lifecycle |
//! | [`documents`] | Upload, import, and document lifecycle |
//! | [`query`] | Query engine |
//! | [`citation`] | Citation reconstruction from grounding metadata |
//! | [`client`] | The [`FileSearchStoreClient`] facade |
//! | [`error`] | Error taxonomy |
//!
//! The crate performs no I/O of its own. A transport (such as the REST
//! client in the `file-search-store` crate) implements [`FileSearchApi`]
//! and is injected into [`FileSearchStoreClient::new`].

pub mod api;
pub mod citation;
pub mod client;
pub mod documents;
pub mod error;
pub mod generation;
pub mod models;
pub mod poll;
pub mod query;
pub mod stores;

pub use api::{FileSearchApi, OperationSource};
pub use client::{ClientOptions, FileSearchStoreClient};
pub use error::{Error, ErrorKind, Result};
