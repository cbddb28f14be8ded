pub mod loader;
pub mod types;

pub use loader::{ConfigLoader, OUTPUT_DIR_ENV};
pub use types::{ClientConfig, DEFAULT_OUTPUT_DIR, OutputConfig, Settings};
