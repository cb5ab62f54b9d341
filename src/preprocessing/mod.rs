//! preprocessing — feature standardization and PCA reduction.
//!
//! The pipeline standardizes features ([`StandardScaler`]) and projects
//! them to a low-dimensional space ([`Pca`]) before handing the reduced
//! matrix to the clustering engine. Both steps are read-only over their
//! input and preserve row order, so the entity-id alignment established at
//! load time survives the reduction.

pub mod errors;
pub mod pca;
pub mod scaler;

pub use self::errors::{PreprocessingError, PreprocessingResult};
pub use self::pca::Pca;
pub use self::scaler::StandardScaler;
