pub mod collaborative;
pub mod content;
pub mod drift;
pub mod similarity;

pub use collaborative::{InteractionMatrix, MatrixStats, WeightingMode};
pub use content::{ContentConfig, ContentFilter, ContentScores};
pub use drift::{DriftConfig, DriftDetector};
