pub mod loader;
pub mod schema;

pub use loader::{DataLoadError, SluiceData, load_sluice_data};
