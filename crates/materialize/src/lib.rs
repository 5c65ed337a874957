//! # elif-materialize: Model materialization for elif.rs
//!
//! Turns raw rows returned by a storage connector into model instances,
//! honoring a filter's field projection and attaching included relations
//! (single or collection, nested to any depth) from data already embedded
//! in the rows.
//!
//! Materializing one row runs three steps:
//!
//! 1. **Normalize** - merge the row with the connector's view of it and keep
//!    only declared properties and relations
//! 2. **Build** - resolve the concrete model (rows may pick a variant) and
//!    construct it through the model factory
//! 3. **Attach** - materialize each included relation's payload and install
//!    it on the instance
//!
//! This crate does not query storage, validate filters against a schema or
//! fetch related rows.

pub mod error;
pub mod config;
pub mod value;
pub mod filter;
pub mod metadata;
pub mod registry;
pub mod connector;
pub mod instance;
pub mod container;
pub mod factory;
pub mod normalize;
pub mod builder;
pub mod attach;
pub mod materializer;

// Re-export core traits and types
pub use error::*;
pub use config::*;
pub use value::*;
pub use filter::*;
pub use metadata::*;
pub use registry::*;
pub use connector::*;
pub use instance::*;
pub use container::*;
pub use factory::*;
pub use normalize::*;
pub use builder::*;
pub use materializer::*;
