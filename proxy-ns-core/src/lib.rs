//! proxy-ns core - error and identifier types
//!
//! This crate provides the types shared by the namespace sequence and the CLI.

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod types;

pub use error::{Error, Operation, Result};
pub use types::NamespaceName;
