//! Shared types and models for the Line Trace platform
//!
//! This crate contains the domain types shared between the backend services
//! and any future front-end components of the system.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
