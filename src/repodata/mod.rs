//! Repository metadata layer
//!
//! # Modules
//!
//! - [`types`]: repodata index parsing and record types
//! - [`source`]: the [`source::RepoDataSource`] trait
//! - [`http`]: HTTP implementation with an on-disk cache
//! - [`error`]: fetch error type

pub mod error;
pub mod http;
pub mod source;
pub mod types;
