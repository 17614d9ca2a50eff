//! Core business logic abstractions

pub mod cache;
pub mod config;
pub mod log;
pub mod manual;
pub mod rate;
pub mod validator;

// Re-export main types for cleaner imports
pub use cache::{CachedRate, RateCache};
pub use manual::ManualOverride;
pub use rate::{ExtractError, ExtractedToken, RateExtractor};
