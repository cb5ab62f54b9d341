//! dataset — CSV load of entity features and persistence of results.
//!
//! The load side produces the row-aligned (ids, features) pair the pipeline
//! runs on; the save side writes the merged result table (id, features,
//! reduced coordinates, label, posterior columns) consumed downstream.
//! Only the final clustering path persists results; the model-selection
//! search produces the diagnostic plot instead.

pub mod errors;
pub mod load;
pub mod save;

pub use self::errors::{DatasetError, DatasetResult};
pub use self::load::{load_dataset, Dataset};
pub use self::save::save_dataset;
