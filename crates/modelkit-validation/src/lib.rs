#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # modelkit-validation
//!
//! Validation engine for part containers.
//!
//! The engine combines built-in structural checks, each container's own
//! rules, externally registered custom validations and extension property
//! validators into one ordered message list per container. An engine built
//! with a cache keeps results per container instance; the cache listens on
//! the documents' listener set and is evicted by their change events.

pub mod cache;
pub mod custom;
pub mod engine;
pub mod rules;

pub use cache::ValidationCache;
pub use custom::{CustomValidation, CustomValidationRegistry, FnValidation};
pub use engine::ValidationEngine;

use thiserror::Error;

/// Errors that can occur when configuring validation
#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation '{name}' is already registered for {kind}")]
    DuplicateValidation { kind: String, name: String },
}

impl Error {
    /// Build a duplicate-registration error.
    pub fn duplicate_validation(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::DuplicateValidation {
            kind: kind.into(),
            name: name.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
