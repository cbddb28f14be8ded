pub mod assertion;
pub mod collection;
pub mod config;
pub mod error;
pub mod http;
pub mod logger;
pub mod output;
pub mod runner;
pub mod variable;

// Re-export commonly used types
pub use error::{Result, RqstrError};
