pub mod loader;
pub mod types;

pub use loader::{COLLECTION_SUFFIXES, CollectionLoader, Format};
pub use types::{OutputSettings, RequestCollection, RequestSpec};
