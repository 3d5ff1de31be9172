//! Domain layer - workflow model, engine contract and guidance abstractions

pub mod error;
pub mod guidance;
pub mod workflow;

pub use error::DomainError;
