//! # Pictag Core
//!
//! Core library for the Pictag image catalog: domain types, the label
//! provider integrations, persistence and the catalog service that ties
//! them together.
//!
//! ## Architecture
//!
//! - [`domain`]: catalog entries, upload requests, extension and filename rules
//! - [`providers`]: the [`providers::LabelProvider`] port and its HTTP backends
//! - [`database`]: the [`database::ports::CatalogRepository`] port and the SQLite adapter
//! - [`application`]: the [`application::CatalogService`] use-cases
//!
//! The request layer (see `pictag-server`) only talks to
//! [`application::CatalogService`]; nothing in this crate calls back into it.

pub mod application;
pub mod database;
pub mod domain;
pub mod error;
pub mod providers;

pub use application::CatalogService;
pub use domain::{
    CatalogEntry, EntryId, EntrySummary, ImageSource, Labels, NewCatalogEntry,
    UploadReceipt, UploadRequest, UploadedFile,
};
pub use error::{CatalogError, Result, StoreError, ValidationError};
pub use providers::{
    LabelAcquisitionError, LabelClient, LabelProvider, ProviderBackend,
    ProviderCapabilities, ProviderError,
};
