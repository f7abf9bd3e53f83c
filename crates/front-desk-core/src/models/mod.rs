//! Domain models for the front desk core.

mod appointment;
mod patient;
pub mod validation;

pub use appointment::*;
pub use patient::*;
pub use validation::ValidationError;
