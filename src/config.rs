//! Debug checks and model configuration
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::{dd, nich};

const fn parse_debug_level(level: Option<&str>, default: u8) -> u8 {
    match level {
        Some(level) => {
            let bytes = level.as_bytes();
            if bytes.len() == 1 && bytes[0].is_ascii_digit() {
                bytes[0] - b'0'
            } else {
                default
            }
        }
        None => default,
    }
}

/// How many precondition checks run.
///
/// Set at build time with the `LACE_DEBUG_LEVEL` environment variable (a
/// single digit). Defaults to 2 in debug builds and 0 in release builds.
///
/// - 0: checks that guard against corrupting sufficient statistics
/// - 1: categorical value bounds
/// - 2: accumulator buffer lengths
/// - 3: checks that scan every group
pub const DEBUG_LEVEL: u8 = parse_debug_level(
    option_env!("LACE_DEBUG_LEVEL"),
    if cfg!(debug_assertions) { 2 } else { 0 },
);

/// Assert `$cond` if `DEBUG_LEVEL` is at least `$level`
#[macro_export]
macro_rules! lace_assert {
    ($level:expr, $cond:expr, $($arg:tt)+) => {{
        if $crate::config::DEBUG_LEVEL >= $level {
            assert!($cond, $($arg)+);
        }
    }};
}

/// Serializable description of a component model prior
///
/// In YAML the model kind is the single key of a map, as in the example
/// below.
///
/// # Example
///
/// ```
/// use lace_conjugate::config::ModelConfig;
///
/// let yaml = "
/// normal_inv_chi_sq:
///   mu: 0.0
///   kappa: 1.0
///   sigmasq: 2.0
///   nu: 3.0
/// ";
/// let shared = ModelConfig::from_yaml(yaml).unwrap().nich().unwrap();
/// assert_eq!(shared.sigmasq(), 2.0);
/// ```
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ModelConfig {
    NormalInvChiSq {
        mu: f64,
        kappa: f64,
        sigmasq: f64,
        nu: f64,
    },
    DirichletDiscrete {
        alphas: Vec<f64>,
    },
}

impl ModelConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config = serde_yaml::with::singleton_map::deserialize(
            serde_yaml::Deserializer::from_str(yaml),
        )?;
        Ok(config)
    }

    /// Write the config in the map form `from_yaml` reads
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        let mut buf = Vec::new();
        {
            let mut serializer = serde_yaml::Serializer::new(&mut buf);
            serde_yaml::with::singleton_map::serialize(self, &mut serializer)?;
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    fn name(&self) -> &'static str {
        match self {
            Self::NormalInvChiSq { .. } => "normal_inv_chi_sq",
            Self::DirichletDiscrete { .. } => "dirichlet_discrete",
        }
    }

    /// Validate and build a Normal, Inverse-Chi-Squared prior
    pub fn nich(&self) -> Result<nich::Shared, ConfigError> {
        match *self {
            Self::NormalInvChiSq {
                mu,
                kappa,
                sigmasq,
                nu,
            } => nich::Shared::new(mu, kappa, sigmasq, nu).map_err(Into::into),
            _ => Err(ConfigError::WrongModel {
                expected: "normal_inv_chi_sq",
                found: self.name(),
            }),
        }
    }

    /// Validate and build a Dirichlet, Discrete prior with capacity `N`
    pub fn dd<const N: usize>(&self) -> Result<dd::Shared<N>, ConfigError> {
        match self {
            Self::DirichletDiscrete { alphas } => {
                dd::Shared::new(alphas).map_err(Into::into)
            }
            _ => Err(ConfigError::WrongModel {
                expected: "dirichlet_discrete",
                found: self.name(),
            }),
        }
    }
}

impl From<&nich::Shared> for ModelConfig {
    fn from(shared: &nich::Shared) -> Self {
        Self::NormalInvChiSq {
            mu: shared.mu(),
            kappa: shared.kappa(),
            sigmasq: shared.sigmasq(),
            nu: shared.nu(),
        }
    }
}

impl<const N: usize> From<&dd::Shared<N>> for ModelConfig {
    fn from(shared: &dd::Shared<N>) -> Self {
        Self::DirichletDiscrete {
            alphas: shared.alphas().to_vec(),
        }
    }
}
