use thiserror::Error;

/// Errors raised by the core algorithms before any computation begins.
///
/// Degenerate-but-expected conditions (cold users, empty candidate sets,
/// undersized drift samples) are not errors; they are absorbed into result
/// fields so batch operations never abort on a single bad item.
#[derive(Debug, Error)]
pub enum EncoreError {
    #[error("vector length mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    #[error("non-finite value in {context}")]
    NonFiniteInput { context: &'static str },

    #[error("coordinate out of range: latitude {lat}, longitude {lon}")]
    InvalidCoordinate { lat: f64, lon: f64 },

    #[error("{name} weights sum to {sum}, expected 1.0")]
    InvalidWeights { name: &'static str, sum: f64 },

    #[error("top_k must be a positive integer")]
    InvalidTopK,

    #[error("{context} sample is empty")]
    EmptySample { context: &'static str },

    #[error("rating {value} outside the 0-5 range")]
    InvalidRating { value: f32 },

    #[error("recommendation context carries neither a user id nor preference seeds")]
    EmptyContext,

    #[error("strategy {strategy} requires {requirement}")]
    MissingContext {
        strategy: &'static str,
        requirement: &'static str,
    },
}
