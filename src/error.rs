use thiserror::Error;

/// Errors from constructing a Normal, Inverse-Chi-Squared prior
#[derive(Clone, Debug, Error, PartialEq)]
pub enum NichError {
    /// The prior mean is infinite or NaN
    #[error("mu must be finite but was {mu}")]
    MuNotFinite { mu: f64 },
    /// The prior pseudo-count is zero, negative, or not finite
    #[error("kappa must be positive and finite but was {kappa}")]
    KappaTooLow { kappa: f64 },
    /// The prior scale is zero, negative, or not finite
    #[error("sigmasq must be positive and finite but was {sigmasq}")]
    SigmaSqTooLow { sigmasq: f64 },
    /// The prior degrees of freedom are zero, negative, or not finite
    #[error("nu must be positive and finite but was {nu}")]
    NuTooLow { nu: f64 },
}

/// Errors from constructing a Dirichlet, Discrete prior
#[derive(Clone, Debug, Error, PartialEq)]
pub enum DdError {
    /// No categories were given
    #[error("a categorical prior needs at least one category")]
    EmptyDimension,
    /// More categories than the compile-time capacity
    #[error("dimension {dim} exceeds the maximum dimension {max_dim}")]
    DimensionTooLarge { dim: usize, max_dim: usize },
    /// A concentration is zero, negative, or not finite
    #[error("alpha at index {ix} must be positive and finite but was {alpha}")]
    AlphaTooLow { ix: usize, alpha: f64 },
}

/// Errors from constructing a Pitman-Yor clustering prior
#[derive(Clone, Debug, Error, PartialEq)]
pub enum PitmanYorError {
    /// The discount is outside [0, 1)
    #[error("d must be in [0, 1) but was {d}")]
    DiscountOutOfRange { d: f64 },
    /// The concentration is not greater than `-d`
    #[error("alpha must be greater than -d ({d}) but was {alpha}")]
    AlphaTooLow { alpha: f64, d: f64 },
}

/// Errors from constructing a low-entropy clustering prior
#[derive(Clone, Debug, Error, PartialEq)]
pub enum LowEntropyError {
    /// The dataset has no values
    #[error("dataset_size must be positive")]
    EmptyDataset,
}

/// Errors from loading a model configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The YAML could not be parsed into a `ModelConfig`
    #[error("failed to parse model config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// The configured Normal, Inverse-Chi-Squared prior is invalid
    #[error(transparent)]
    Nich(#[from] NichError),
    /// The configured Dirichlet, Discrete prior is invalid
    #[error(transparent)]
    Dd(#[from] DdError),
    /// Asked for one kind of model from a config describing another
    #[error("expected a {expected} model config, found {found}")]
    WrongModel {
        expected: &'static str,
        found: &'static str,
    },
}
