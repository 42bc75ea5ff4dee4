// Common types shared across the application

pub mod phone;

pub use phone::{normalize_and_validate, PhoneNumber, ValidationError};
