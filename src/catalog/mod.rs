//! Function catalog: which state fields each remote function consumes.

pub mod loader;
pub mod types;

pub use loader::{default_catalog, ensure_catalog_file, load_catalog, CatalogHandle};
pub use types::{Catalog, FunctionDescriptor};
