// Utility functions
pub mod cache;
pub mod codec;
pub mod error;

pub use error::*;
