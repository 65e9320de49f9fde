//! bard-core - Core types and traits for the bard toolkit
//!
//! This crate provides the foundational types, traits, and error handling
//! shared by the corpus, retrieval, translation and playwright crates.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::{BardError, Result};
pub use traits::*;
pub use types::*;
